//! Core types for Chandler valve classification.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Firmware version at which the Evb034 control board generation begins.
pub const MODEL_FIRMWARE_THRESHOLD: u32 = 600;

/// Hardware generation of a valve control board.
///
/// The generation is not advertised directly; it is derived from the
/// firmware version carried in the manufacturer payload. The split decides
/// which payload layout and status bit assignments apply.
///
/// # Examples
///
/// ```
/// use chandler_types::ValveModel;
///
/// assert_eq!(ValveModel::from_firmware_version(599), ValveModel::Evb019);
/// assert_eq!(ValveModel::from_firmware_version(600), ValveModel::Evb034);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValveModel {
    /// Original control board, firmware versions below 600.
    Evb019,
    /// Current control board, firmware versions 600 and up.
    Evb034,
}

impl ValveModel {
    /// Classify a firmware version into its board generation.
    ///
    /// Total over the whole firmware domain: every version below
    /// [`MODEL_FIRMWARE_THRESHOLD`] is `Evb019`, everything else `Evb034`.
    #[must_use]
    pub fn from_firmware_version(version: u32) -> Self {
        if version < MODEL_FIRMWARE_THRESHOLD {
            ValveModel::Evb019
        } else {
            ValveModel::Evb034
        }
    }
}

impl fmt::Display for ValveModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValveModel::Evb019 => write!(f, "Evb019"),
            ValveModel::Evb034 => write!(f, "Evb034"),
        }
    }
}

/// Presence state of a tracked valve.
///
/// Driven by advertisement recency rather than individual packets: BLE
/// broadcasts are lossy, so a device stays `Available` until no matching
/// advertisement has been seen for the configured presence timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Availability {
    /// A matching advertisement was seen within the presence timeout.
    Available,
    /// No matching advertisement within the presence timeout.
    Unavailable,
}

impl Availability {
    /// Whether this state counts as present.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available => write!(f, "available"),
            Availability::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Consolidated valve application type.
///
/// Advertisements carry a raw type code whose meaning depends on the valve
/// family: Clack valves (local name `CL_*`) use a different code table from
/// standard Chandler valves. Codes outside either table map to `Unknown`
/// rather than failing, since new types appear with new firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[non_exhaustive]
pub enum ValveKind {
    MeteredSoftener,
    TimeClockSoftener,
    BackwashingFilter,
    UltraFilter,
    CenturionNitro,
    CenturionNitroSidekick,
    CenturionNitroSidekickV3,
    NitroPro,
    NitroProSidekick,
    NitroFilter,
    Sidekick,
    CommercialMeteredSoftener,
    CommercialBackwashingFilter,
    CommercialAeration,
    ClackAeration,
    Unknown,
}

impl ValveKind {
    /// Map a raw type code from a standard (non-Clack) valve.
    #[must_use]
    pub fn from_standard_code(code: u8) -> Self {
        match code {
            1 | 3 | 19 | 21 => ValveKind::MeteredSoftener,
            2 => ValveKind::TimeClockSoftener,
            4..=7 | 20 | 22 | 26 | 27 => ValveKind::BackwashingFilter,
            8 => ValveKind::UltraFilter,
            9 | 11 => ValveKind::CenturionNitro,
            10 | 12 => ValveKind::CenturionNitroSidekick,
            13 => ValveKind::NitroPro,
            14 | 15 => ValveKind::NitroProSidekick,
            16 => ValveKind::CenturionNitroSidekickV3,
            17 => ValveKind::CommercialMeteredSoftener,
            18 => ValveKind::CommercialBackwashingFilter,
            23 => ValveKind::NitroFilter,
            24 => ValveKind::Sidekick,
            25 => ValveKind::CommercialAeration,
            _ => ValveKind::Unknown,
        }
    }

    /// Map a raw type code from a Clack valve.
    #[must_use]
    pub fn from_clack_code(code: u8) -> Self {
        match code {
            1 | 4 | 6 | 8 => ValveKind::MeteredSoftener,
            2 | 5 | 7 | 9 => ValveKind::BackwashingFilter,
            3 => ValveKind::ClackAeration,
            _ => ValveKind::Unknown,
        }
    }

    /// Map a raw type code using the table for the given valve family.
    #[must_use]
    pub fn from_code(code: u8, clack: bool) -> Self {
        if clack {
            Self::from_clack_code(code)
        } else {
            Self::from_standard_code(code)
        }
    }
}

impl fmt::Display for ValveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValveKind::MeteredSoftener => "Metered Softener",
            ValveKind::TimeClockSoftener => "Time Clock Softener",
            ValveKind::BackwashingFilter => "Backwashing Filter",
            ValveKind::UltraFilter => "Ultra Filter",
            ValveKind::CenturionNitro => "Centurion Nitro",
            ValveKind::CenturionNitroSidekick => "Centurion Nitro Sidekick",
            ValveKind::CenturionNitroSidekickV3 => "Centurion Nitro Sidekick V3",
            ValveKind::NitroPro => "Nitro Pro",
            ValveKind::NitroProSidekick => "Nitro Pro Sidekick",
            ValveKind::NitroFilter => "Nitro Filter",
            ValveKind::Sidekick => "Sidekick",
            ValveKind::CommercialMeteredSoftener => "Commercial Metered Softener",
            ValveKind::CommercialBackwashingFilter => "Commercial Backwashing Filter",
            ValveKind::CommercialAeration => "Commercial Aeration",
            ValveKind::ClackAeration => "Clack Aeration",
            ValveKind::Unknown => "Unknown",
        };
        write!(f, "{}", name)
    }
}

/// Default human-readable name for a discovered valve.
pub const DEFAULT_FRIENDLY_NAME: &str = "Treatment Valve";

/// Local-name prefix identifying Clack valves (case-insensitive).
const CLACK_NAME_PREFIX: &str = "cl_";

/// Return `true` if the advertised local name indicates a Clack valve.
#[must_use]
pub fn is_clack_name(advertised_name: Option<&str>) -> bool {
    match advertised_name {
        Some(name) => name.trim().to_lowercase().starts_with(CLACK_NAME_PREFIX),
        None => false,
    }
}

/// Return a human-readable valve name for an advertised local name.
///
/// Known advertised names map to the application they ship with; anything
/// else, including a missing name, falls back to [`DEFAULT_FRIENDLY_NAME`].
#[must_use]
pub fn friendly_name(advertised_name: Option<&str>) -> &'static str {
    let Some(name) = advertised_name else {
        return DEFAULT_FRIENDLY_NAME;
    };

    match name.trim().to_lowercase().as_str() {
        "c2_1a" | "c2_ff" | "c2_1b" | "c2_04" | "cs_bw_filter" => "Backwashing Filter",
        "c2_01" | "cs_meter_soft" => "Metered Softener",
        _ => DEFAULT_FRIENDLY_NAME,
    }
}

/// Render a firmware version the way the vendor's mobile app displays it.
///
/// Twin valves (versions 100..=199) show a `D` prefix, Clack valves `L`,
/// everything else `C`, followed by `major.minor` with a two-digit minor.
///
/// # Examples
///
/// ```
/// use chandler_types::format_firmware_version;
///
/// assert_eq!(format_firmware_version(600, false), "C6.00");
/// assert_eq!(format_firmware_version(145, false), "D1.45");
/// assert_eq!(format_firmware_version(327, true), "L3.27");
/// ```
#[must_use]
pub fn format_firmware_version(version: u32, clack: bool) -> String {
    let prefix = if (100..=199).contains(&version) {
        "D"
    } else if clack {
        "L"
    } else {
        "C"
    };
    format!("{}{}.{:02}", prefix, version / 100, version % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_threshold() {
        assert_eq!(ValveModel::from_firmware_version(0), ValveModel::Evb019);
        assert_eq!(ValveModel::from_firmware_version(599), ValveModel::Evb019);
        assert_eq!(ValveModel::from_firmware_version(600), ValveModel::Evb034);
        assert_eq!(ValveModel::from_firmware_version(601), ValveModel::Evb034);
        assert_eq!(ValveModel::from_firmware_version(u32::MAX), ValveModel::Evb034);
    }

    #[test]
    fn test_model_display() {
        assert_eq!(ValveModel::Evb019.to_string(), "Evb019");
        assert_eq!(ValveModel::Evb034.to_string(), "Evb034");
    }

    #[test]
    fn test_availability() {
        assert!(Availability::Available.is_available());
        assert!(!Availability::Unavailable.is_available());
        assert_eq!(Availability::Available.to_string(), "available");
        assert_eq!(Availability::Unavailable.to_string(), "unavailable");
    }

    #[test]
    fn test_valve_kind_standard_codes() {
        assert_eq!(ValveKind::from_standard_code(1), ValveKind::MeteredSoftener);
        assert_eq!(ValveKind::from_standard_code(2), ValveKind::TimeClockSoftener);
        assert_eq!(ValveKind::from_standard_code(20), ValveKind::BackwashingFilter);
        assert_eq!(ValveKind::from_standard_code(16), ValveKind::CenturionNitroSidekickV3);
        assert_eq!(ValveKind::from_standard_code(25), ValveKind::CommercialAeration);
        assert_eq!(ValveKind::from_standard_code(0), ValveKind::Unknown);
        assert_eq!(ValveKind::from_standard_code(255), ValveKind::Unknown);
    }

    #[test]
    fn test_valve_kind_clack_codes() {
        assert_eq!(ValveKind::from_clack_code(1), ValveKind::MeteredSoftener);
        assert_eq!(ValveKind::from_clack_code(3), ValveKind::ClackAeration);
        assert_eq!(ValveKind::from_clack_code(9), ValveKind::BackwashingFilter);
        assert_eq!(ValveKind::from_clack_code(10), ValveKind::Unknown);
    }

    #[test]
    fn test_valve_kind_family_dispatch() {
        // Code 3 means aeration on Clack valves, softener on standard valves
        assert_eq!(ValveKind::from_code(3, true), ValveKind::ClackAeration);
        assert_eq!(ValveKind::from_code(3, false), ValveKind::MeteredSoftener);
    }

    #[test]
    fn test_is_clack_name() {
        assert!(is_clack_name(Some("CL_01")));
        assert!(is_clack_name(Some("cl_04")));
        assert!(is_clack_name(Some("  CL_06  ")));
        assert!(!is_clack_name(Some("CS_Meter_Soft")));
        assert!(!is_clack_name(Some("")));
        assert!(!is_clack_name(None));
    }

    #[test]
    fn test_friendly_name() {
        assert_eq!(friendly_name(Some("C2_01")), "Metered Softener");
        assert_eq!(friendly_name(Some("cs_bw_filter")), "Backwashing Filter");
        assert_eq!(friendly_name(Some("C2_FF")), "Backwashing Filter");
        assert_eq!(friendly_name(Some("CS_Something")), DEFAULT_FRIENDLY_NAME);
        assert_eq!(friendly_name(Some("")), DEFAULT_FRIENDLY_NAME);
        assert_eq!(friendly_name(None), DEFAULT_FRIENDLY_NAME);
    }

    #[test]
    fn test_format_firmware_version() {
        assert_eq!(format_firmware_version(600, false), "C6.00");
        assert_eq!(format_firmware_version(601, false), "C6.01");
        assert_eq!(format_firmware_version(258, false), "C2.58");
        // Twin valve range always renders D, Clack or not
        assert_eq!(format_firmware_version(145, false), "D1.45");
        assert_eq!(format_firmware_version(145, true), "D1.45");
        assert_eq!(format_firmware_version(327, true), "L3.27");
        assert_eq!(format_firmware_version(5, false), "C0.05");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialization() {
        assert_eq!(
            serde_json::to_string(&ValveModel::Evb034).unwrap(),
            "\"Evb034\""
        );
        assert_eq!(
            serde_json::to_string(&Availability::Unavailable).unwrap(),
            "\"Unavailable\""
        );
        assert_eq!(
            serde_json::to_string(&ValveKind::MeteredSoftener).unwrap(),
            "\"MeteredSoftener\""
        );

        let model: ValveModel = serde_json::from_str("\"Evb019\"").unwrap();
        assert_eq!(model, ValveModel::Evb019);
    }
}
