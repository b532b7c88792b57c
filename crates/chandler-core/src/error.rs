//! Error types for chandler-core.
//!
//! Only the scan bridge and configuration validation produce hard errors.
//! Malformed advertisements are an expected part of the radio environment
//! and are handled softly inside the pipeline (see
//! [`ParseError`](chandler_types::ParseError)); nothing in classification
//! can fail the process or stall later advertisements.

use thiserror::Error;

/// Errors that can occur when running the valve monitor.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error
/// variants in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Bluetooth Low Energy error from the platform stack.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// No Bluetooth adapter available.
    #[error("no Bluetooth adapter available")]
    NoAdapter,

    /// Invalid configuration provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type alias using chandler-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoAdapter;
        assert_eq!(err.to_string(), "no Bluetooth adapter available");

        let err = Error::invalid_config("presence timeout cannot be zero");
        assert!(err.to_string().contains("presence timeout"));
    }

    #[test]
    fn test_btleplug_error_conversion() {
        fn _assert_from_impl<T: From<btleplug::Error>>() {}
        _assert_from_impl::<Error>();
    }
}
