//! Error types for data parsing in chandler-types.

use thiserror::Error;

/// Errors that can occur when decoding valve advertisement payloads.
///
/// Decode failures are expected in the radio environment and are handled
/// softly by the core: a failed payload still counts as a sighting of the
/// device. This type deliberately excludes BLE transport errors (those
/// belong in chandler-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error
/// variants in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The payload is shorter than the minimum for the requested field.
    #[error("payload requires {expected} bytes, got {actual}")]
    InsufficientBytes {
        /// Minimum number of bytes required.
        expected: usize,
        /// Number of bytes actually present.
        actual: usize,
    },
}

/// Result type alias using chandler-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
