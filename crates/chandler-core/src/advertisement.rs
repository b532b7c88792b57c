//! Valve advertisement model and manufacturer payload decoding.
//!
//! Chandler Legacy valves broadcast their state in the manufacturer-specific
//! section of BLE advertisements; no connection is required to read it.
//! This module defines the ephemeral advertisement value handed to the
//! monitor by the scanning layer and the decoder that turns the opaque
//! manufacturer bytes into structured valve metadata.
//!
//! Payloads from firmware this crate does not know about may carry extra
//! trailing bytes; those are ignored rather than rejected so newer valves
//! keep classifying.

use std::collections::HashMap;
use std::time::Instant;

use bytes::Buf;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use chandler_types::protocol::{
    CONNECTION_COUNTER_MIN_VERSION, EVB019_COUNTER_PAYLOAD_BYTES, EVB019_RADIO_TAIL_PAYLOAD_BYTES,
    FIRMWARE_VERSION_OFFSET, MIN_FIRMWARE_PAYLOAD_BYTES, MIN_VALVE_DATA_BYTES,
    SERIES_400_VERSIONS, TWIN_VALVE_MARKER, TWIN_VALVE_VERSIONS, evb019_valve_error,
};
use chandler_types::{ParseError, ParseResult, ValveKind, ValveModel, is_clack_name};

/// A single BLE advertisement as delivered by the scanning subsystem.
///
/// Consumed once per broadcast event and never stored verbatim; the
/// registry keeps only the projection it needs.
#[derive(Debug, Clone)]
pub struct RawAdvertisement {
    /// Stable hardware identifier (MAC address on Linux/Windows, a
    /// platform UUID on macOS).
    pub address: String,
    /// Local name broadcast by the device, if any.
    pub local_name: Option<String>,
    /// Manufacturer-specific data keyed by manufacturer identifier.
    pub manufacturer_data: HashMap<u16, Vec<u8>>,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
    /// Monotonic observation timestamp, used for presence arithmetic.
    pub received_at: Instant,
    /// Wall-clock observation timestamp, exposed to the presentation layer.
    pub seen_at: OffsetDateTime,
}

impl RawAdvertisement {
    /// Create an advertisement observed now.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            local_name: None,
            manufacturer_data: HashMap::new(),
            rssi: None,
            received_at: Instant::now(),
            seen_at: OffsetDateTime::now_utc(),
        }
    }

    /// Set the advertised local name.
    pub fn local_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into());
        self
    }

    /// Add a manufacturer data entry.
    pub fn manufacturer_data(mut self, id: u16, payload: impl Into<Vec<u8>>) -> Self {
        self.manufacturer_data.insert(id, payload.into());
        self
    }

    /// Set the RSSI signal strength.
    pub fn rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Override the monotonic observation timestamp.
    pub fn received_at(mut self, at: Instant) -> Self {
        self.received_at = at;
        self
    }

    /// The payload associated with the given manufacturer identifier.
    pub fn manufacturer_payload(&self, id: u16) -> Option<&[u8]> {
        self.manufacturer_data.get(&id).map(Vec::as_slice)
    }
}

/// Per-model valve data block decoded from a manufacturer payload.
///
/// Only present when the payload is long enough to carry it; a payload
/// holding just the firmware word is still a successful decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveData {
    /// Raw valve status byte.
    pub status: u8,
    /// Whether the valve demands passcode authentication (Evb019 only).
    pub authentication_required: bool,
    /// Salt sensor reports low salt.
    pub low_salt: bool,
    /// Water is shut off.
    pub water_off: bool,
    /// Bypass is engaged.
    pub bypass_engaged: bool,
    /// Consolidated valve error code (0 = no error).
    pub error_code: u8,
    /// Valve clock, hours.
    pub time_hours: u8,
    /// Valve clock, minutes.
    pub time_minutes: u8,
    /// Raw valve type code, when the payload carries one.
    pub type_code: Option<u8>,
    /// Valve series version.
    pub series_version: Option<u8>,
    /// Connection counter (twin valves and firmware 412+).
    pub connection_counter: Option<u8>,
    /// Bootloader version.
    pub bootloader_version: Option<u8>,
    /// Radio protocol version.
    pub radio_protocol_version: Option<u8>,
}

/// Structured metadata decoded from a valve manufacturer payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedValveInfo {
    /// Firmware version decoded from the payload.
    pub firmware_version: u32,
    /// Board generation derived from the firmware version.
    pub model: ValveModel,
    /// Length of the raw payload this was decoded from.
    pub payload_len: usize,
    /// Firmware version falls in the twin-valve range (100..=199).
    pub twin_valve: bool,
    /// Firmware version falls in the 400-series range (400..=499).
    pub series_400: bool,
    /// Advertisements from this firmware carry a connection counter.
    pub has_connection_counter: bool,
    /// Extended valve data block, when the payload was long enough.
    pub valve_data: Option<ValveData>,
}

impl DecodedValveInfo {
    /// Consolidated valve kind, resolved against the advertised name.
    ///
    /// The raw type code shares values between the standard and Clack code
    /// tables, so the valve family has to come from the local name.
    pub fn valve_kind(&self, advertised_name: Option<&str>) -> Option<ValveKind> {
        let code = self.valve_data.as_ref()?.type_code?;
        Some(ValveKind::from_code(code, is_clack_name(advertised_name)))
    }
}

/// Decode a valve manufacturer payload.
///
/// Layout:
/// - bytes 0-1: Firmware version (u16 BE)
/// - byte 2: Valve status bits (assignment differs per model)
/// - byte 3: Valve error
/// - byte 4: Valve time hours
/// - byte 5: Valve time minutes
/// - bytes 6..: model-specific tail (see the per-model parsers)
///
/// Fails only when the payload cannot yield a complete firmware version;
/// a missing or truncated tail leaves `valve_data` unset instead. Trailing
/// bytes beyond the recognized fields are ignored.
pub fn decode_valve_payload(data: &[u8]) -> ParseResult<DecodedValveInfo> {
    if data.len() < MIN_FIRMWARE_PAYLOAD_BYTES {
        return Err(ParseError::InsufficientBytes {
            expected: MIN_FIRMWARE_PAYLOAD_BYTES,
            actual: data.len(),
        });
    }

    let mut buf = &data[FIRMWARE_VERSION_OFFSET..];
    let firmware_version = buf.get_u16() as u32;
    let model = ValveModel::from_firmware_version(firmware_version);

    let twin_valve = TWIN_VALVE_VERSIONS.contains(&firmware_version);
    let series_400 = SERIES_400_VERSIONS.contains(&firmware_version);
    let has_connection_counter = twin_valve || firmware_version >= CONNECTION_COUNTER_MIN_VERSION;

    let valve_data = match model {
        ValveModel::Evb034 => decode_evb034_data(data),
        ValveModel::Evb019 => decode_evb019_data(data, twin_valve, has_connection_counter),
    };

    Ok(DecodedValveInfo {
        firmware_version,
        model,
        payload_len: data.len(),
        twin_valve,
        series_400,
        has_connection_counter,
        valve_data,
    })
}

/// Split the status byte into its per-model flags.
///
/// Evb019 reserves bit 0 for the authentication flag and shifts the
/// sensor bits up by one; Evb034 starts the sensor bits at bit 0.
fn status_flags(status: u8, model: ValveModel) -> (bool, bool, bool, bool) {
    match model {
        ValveModel::Evb019 => (
            status & 0x01 != 0,
            status & 0x02 != 0,
            status & 0x04 != 0,
            status & 0x08 != 0,
        ),
        ValveModel::Evb034 => (
            false,
            status & 0x01 != 0,
            status & 0x02 != 0,
            status & 0x04 != 0,
        ),
    }
}

/// Decode the Evb034 valve data block.
///
/// Tail layout: byte 6 valve type, byte 7 series version.
fn decode_evb034_data(data: &[u8]) -> Option<ValveData> {
    if data.len() < MIN_VALVE_DATA_BYTES {
        return None;
    }

    let (authentication_required, low_salt, water_off, bypass_engaged) =
        status_flags(data[2], ValveModel::Evb034);

    Some(ValveData {
        status: data[2],
        authentication_required,
        low_salt,
        water_off,
        bypass_engaged,
        error_code: data[3],
        time_hours: data[4],
        time_minutes: data[5],
        type_code: Some(data[6]),
        series_version: Some(data[7]),
        connection_counter: None,
        bootloader_version: None,
        radio_protocol_version: None,
    })
}

/// Decode the Evb019 valve data block.
///
/// Tail layout with a connection counter (requires 14 bytes): byte 6
/// counter, byte 8 bootloader, byte 9 series, byte 10 radio protocol,
/// byte 11 valve type. Without one: byte 6 bootloader, byte 7 series,
/// then either radio protocol at 8 and valve type at 9 (12-byte payloads)
/// or valve type at 8. Twin valves additionally carry a fixed marker at
/// byte 7; payloads without it are treated as not carrying valve data.
fn decode_evb019_data(data: &[u8], twin_valve: bool, has_counter: bool) -> Option<ValveData> {
    if data.len() < MIN_VALVE_DATA_BYTES {
        return None;
    }
    if has_counter && data.len() < EVB019_COUNTER_PAYLOAD_BYTES {
        return None;
    }
    if twin_valve && data[7] != TWIN_VALVE_MARKER {
        return None;
    }

    let (authentication_required, low_salt, water_off, bypass_engaged) =
        status_flags(data[2], ValveModel::Evb019);

    let mut decoded = ValveData {
        status: data[2],
        authentication_required,
        low_salt,
        water_off,
        bypass_engaged,
        error_code: evb019_valve_error(data[3]),
        time_hours: data[4],
        time_minutes: data[5],
        type_code: None,
        series_version: None,
        connection_counter: None,
        bootloader_version: None,
        radio_protocol_version: None,
    };

    if has_counter {
        decoded.connection_counter = Some(data[6]);
        decoded.bootloader_version = Some(data[8]);
        decoded.series_version = Some(data[9]);
        decoded.radio_protocol_version = Some(data[10]);
        decoded.type_code = Some(data[11]);
    } else {
        decoded.bootloader_version = Some(data[6]);
        decoded.series_version = Some(data[7]);
        if data.len() == EVB019_RADIO_TAIL_PAYLOAD_BYTES {
            decoded.radio_protocol_version = Some(data[8]);
            decoded.type_code = Some(data[9]);
        } else {
            decoded.type_code = data.get(8).copied();
        }
    }

    Some(decoded)
}


/// Property-based tests for valve payload decoding.
///
/// Advertisement bytes come straight from the radio environment, so the
/// decoder must be safe on any input, including truncated and garbage
/// payloads.
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Decoding random payload bytes never panics.
        #[test]
        fn decode_never_panics(data: Vec<u8>) {
            let _ = decode_valve_payload(&data);
        }

        /// Any payload of at least two bytes yields a complete firmware
        /// version and a total model classification.
        #[test]
        fn decode_with_firmware_word_succeeds(data in proptest::collection::vec(any::<u8>(), 2..32)) {
            let info = decode_valve_payload(&data).unwrap();
            let expected = u16::from_be_bytes([data[0], data[1]]) as u32;
            prop_assert_eq!(info.firmware_version, expected);
            prop_assert_eq!(
                info.model == ValveModel::Evb019,
                expected < chandler_types::MODEL_FIRMWARE_THRESHOLD
            );
        }

        /// Payloads shorter than the firmware word always fail, never
        /// return a partial value.
        #[test]
        fn decode_short_payload_always_fails(data in proptest::collection::vec(any::<u8>(), 0..2)) {
            prop_assert!(decode_valve_payload(&data).is_err());
        }

        /// Evb019-range firmware with arbitrary tails never panics.
        #[test]
        fn decode_evb019_tails_never_panic(tail in proptest::collection::vec(any::<u8>(), 0..24)) {
            let mut data = vec![0x01, 0x3B];
            data.extend(tail);
            let _ = decode_valve_payload(&data);
        }
    }
}
