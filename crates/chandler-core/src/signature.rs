//! Signature matching for valve advertisements.
//!
//! The signature decides, before any decoding, whether an advertisement
//! originates from a supported valve family. Two independent signals are
//! accepted: the advertised local name starting with a known prefix, or a
//! manufacturer data entry under the known manufacturer identifier. Valves
//! in the field have been observed exposing either one alone, so a single
//! signal is sufficient.

use serde::{Deserialize, Serialize};

use chandler_types::protocol::{CSI_MANUFACTURER_ID, VALVE_NAME_PREFIXES};

use crate::advertisement::RawAdvertisement;

/// Recognition rules identifying a supported valve family.
///
/// Immutable for the lifetime of a discovery session. The defaults match
/// Chandler Legacy valves; both fields can be overridden from the setup
/// flow to track a different deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValveSignature {
    /// Accepted local-name prefixes, matched case-insensitively.
    pub name_prefixes: Vec<String>,
    /// Accepted manufacturer identifier.
    pub manufacturer_id: u16,
}

impl Default for ValveSignature {
    fn default() -> Self {
        Self {
            name_prefixes: VALVE_NAME_PREFIXES.iter().map(|p| p.to_string()).collect(),
            manufacturer_id: CSI_MANUFACTURER_ID,
        }
    }
}

impl ValveSignature {
    /// Create a signature with explicit prefixes and manufacturer id.
    pub fn new(name_prefixes: Vec<String>, manufacturer_id: u16) -> Self {
        Self {
            name_prefixes,
            manufacturer_id,
        }
    }

    /// Return `true` if the advertisement satisfies this signature.
    ///
    /// Pure predicate with no side effects. Missing fields are treated as
    /// not satisfying their condition, never as an error, so any
    /// advertisement shape is safe to test.
    pub fn matches(&self, advertisement: &RawAdvertisement) -> bool {
        self.matches_name(advertisement.local_name.as_deref())
            || advertisement
                .manufacturer_data
                .contains_key(&self.manufacturer_id)
    }

    /// Return `true` if the local name starts with an accepted prefix.
    pub fn matches_name(&self, name: Option<&str>) -> bool {
        let Some(name) = name else {
            return false;
        };
        if name.is_empty() {
            return false;
        }

        let lowered = name.to_lowercase();
        self.name_prefixes
            .iter()
            .any(|prefix| lowered.starts_with(&prefix.to_lowercase()))
    }
}
