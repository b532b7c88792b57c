//! BLE advertisement classification and presence tracking for Chandler
//! Legacy water treatment valves.
//!
//! Chandler valves broadcast their firmware version and live status in BLE
//! advertisements; no connection is needed to know which valves are nearby
//! and what they are. This crate ingests a stream of raw advertisements,
//! decides which ones come from supported valves, decodes the manufacturer
//! payload into structured metadata, and maintains a per-device presence
//! state an automation platform can read.
//!
//! # Features
//!
//! - **Signature matching**: identify valves by local-name prefix or
//!   manufacturer id, either signal alone sufficing
//! - **Payload decoding**: firmware version, board generation, valve
//!   status bits, error codes, and type tables, tolerant of unknown
//!   trailing bytes
//! - **Device registry**: per-address state with monotonic last-seen and
//!   metadata retained across malformed broadcasts
//! - **Presence tracking**: timeout-driven Available/Unavailable state
//!   machine decoupled from per-packet jitter
//! - **Change notifications**: broadcast events for discovery, metadata
//!   updates, and availability transitions
//! - **Scan bridge**: optional btleplug loop for standalone use
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chandler_core::monitor::{ValveMonitor, ValveMonitorOptions};
//! use chandler_core::scan::{ScanOptions, run_scanner};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let monitor = Arc::new(ValveMonitor::new(ValveMonitorOptions::default()));
//!     let sweeper = monitor.start();
//!
//!     let cancel = CancellationToken::new();
//!     let scanner = tokio::spawn(run_scanner(
//!         Arc::clone(&monitor),
//!         ScanOptions::default(),
//!         cancel.clone(),
//!     ));
//!
//!     let mut events = monitor.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//!
//!     cancel.cancel();
//!     monitor.shutdown().await;
//!     let _ = scanner.await;
//!     let _ = sweeper.await;
//!     Ok(())
//! }
//! ```

pub mod advertisement;
pub mod error;
pub mod events;
pub mod monitor;
pub mod presence;
pub mod registry;
pub mod scan;
pub mod signature;

// Core exports
pub use advertisement::{DecodedValveInfo, RawAdvertisement, ValveData, decode_valve_payload};
pub use error::{Error, Result};
pub use events::{EventDispatcher, EventReceiver, EventSender, ValveEvent, ValveId};
pub use monitor::{ValveMonitor, ValveMonitorOptions};
pub use presence::{DEFAULT_PRESENCE_TIMEOUT, DEFAULT_SWEEP_INTERVAL};
pub use registry::{DeviceRegistry, DeviceState, UpsertOutcome};
pub use scan::{ScanOptions, get_adapter, run_scanner};
pub use signature::ValveSignature;

// Re-export the shared types crate
pub use chandler_types::{
    Availability, ParseError, ParseResult, ValveKind, ValveModel, format_firmware_version,
    friendly_name, is_clack_name,
};
