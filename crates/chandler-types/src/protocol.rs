//! Protocol constants for Chandler Legacy valve advertisements.
//!
//! These values describe the advertisement wire contract shared by the
//! signature matcher and the payload decoder. They were taken from captured
//! valve broadcasts and should be confirmed against new firmware before
//! being changed.

/// Manufacturer identifier advertised by Chandler Legacy valves (CSI).
pub const CSI_MANUFACTURER_ID: u16 = 1850;

/// Bluetooth local-name prefixes advertised by Chandler Legacy valves.
///
/// Matching is case-insensitive; firmware in the field has been observed
/// emitting both `CS_` and `cs_` spellings.
pub const VALVE_NAME_PREFIXES: [&str; 3] = ["CS_", "C2_", "CL_"];

/// Byte offset of the firmware version word within the manufacturer payload.
pub const FIRMWARE_VERSION_OFFSET: usize = 0;

/// Width of the firmware version word in bytes (big-endian u16).
pub const FIRMWARE_VERSION_LEN: usize = 2;

/// Minimum manufacturer payload length that can yield a firmware version.
pub const MIN_FIRMWARE_PAYLOAD_BYTES: usize = FIRMWARE_VERSION_OFFSET + FIRMWARE_VERSION_LEN;

/// Minimum payload length carrying the per-model valve data block.
///
/// The block starts right after the firmware word: status, error, valve
/// time hours, valve time minutes, then two model-specific tail bytes.
pub const MIN_VALVE_DATA_BYTES: usize = 8;

/// Minimum Evb019 payload length when a connection counter is present.
pub const EVB019_COUNTER_PAYLOAD_BYTES: usize = 14;

/// Evb019 payload length whose tail carries a radio protocol byte.
pub const EVB019_RADIO_TAIL_PAYLOAD_BYTES: usize = 12;

/// Marker byte required at offset 7 of twin-valve payloads.
pub const TWIN_VALVE_MARKER: u8 = 100;

/// Firmware version range reported by twin valves.
pub const TWIN_VALVE_VERSIONS: core::ops::RangeInclusive<u32> = 100..=199;

/// Firmware version range reported by 400-series valves.
pub const SERIES_400_VERSIONS: core::ops::RangeInclusive<u32> = 400..=499;

/// Lowest firmware version whose advertisements carry a connection counter.
pub const CONNECTION_COUNTER_MIN_VERSION: u32 = 412;

/// Map a raw Evb019 valve error code to the consolidated error enumeration.
///
/// Evb019 firmware reports errors as a bit per condition; later firmware
/// reports the consolidated code directly. Unknown bits map to 0 (no error).
pub fn evb019_valve_error(raw: u8) -> u8 {
    match raw {
        1 => 2,
        2 => 3,
        4 => 4,
        8 => 5,
        16 => 6,
        32 => 7,
        _ => 0,
    }
}
