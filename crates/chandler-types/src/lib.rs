//! Platform-agnostic types for Chandler Legacy water treatment valves.
//!
//! This crate provides the shared vocabulary used by chandler-core to
//! classify valve advertisements: the board-generation model enum, the
//! presence state, the consolidated valve kind tables, and the protocol
//! constants describing the advertisement wire contract.
//!
//! # Features
//!
//! - Board generation classification from firmware versions
//! - Presence/availability state
//! - Valve kind code tables for standard and Clack valves
//! - Protocol constants for signature matching and payload decoding
//! - Error types for payload decoding
//!
//! # Example
//!
//! ```
//! use chandler_types::{ValveModel, format_firmware_version};
//!
//! let model = ValveModel::from_firmware_version(612);
//! assert_eq!(model, ValveModel::Evb034);
//! assert_eq!(format_firmware_version(612, false), "C6.12");
//! ```

pub mod error;
pub mod protocol;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    Availability, DEFAULT_FRIENDLY_NAME, MODEL_FIRMWARE_THRESHOLD, ValveKind, ValveModel,
    format_firmware_version, friendly_name, is_clack_name,
};
