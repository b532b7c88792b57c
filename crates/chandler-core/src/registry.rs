//! Per-device state owned by a discovery session.
//!
//! The registry is the only shared mutable resource in the pipeline. One
//! logical writer stream (classified advertisements) mutates it, while the
//! presentation layer reads snapshots concurrently, so every access goes
//! through an async `RwLock`. Entries are created on first sighting and
//! removed only at teardown; staleness flips availability but never evicts
//! the last known metadata.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::debug;

use chandler_types::{
    Availability, ValveKind, ValveModel, format_firmware_version, friendly_name, is_clack_name,
};

use crate::advertisement::{DecodedValveInfo, RawAdvertisement, ValveData};
use crate::presence::is_stale;

/// Durable projection of everything known about one valve.
///
/// Metadata fields hold the most recent successfully decoded values; a
/// malformed or truncated broadcast updates liveness without touching them.
#[derive(Debug, Clone)]
pub struct DeviceState {
    /// Stable hardware address.
    pub address: String,
    /// Most recent advertised local name.
    pub local_name: Option<String>,
    /// Most recent RSSI signal strength.
    pub rssi: Option<i16>,
    /// Last successfully decoded firmware version.
    pub firmware_version: Option<u32>,
    /// Board generation derived from the firmware version.
    pub model: Option<ValveModel>,
    /// Consolidated valve kind, when a type code has been seen.
    pub valve_kind: Option<ValveKind>,
    /// Last successfully decoded valve data block.
    pub valve_data: Option<ValveData>,
    /// Current presence state.
    pub availability: Availability,
    /// Monotonic timestamp of the newest advertisement seen.
    pub last_seen: Instant,
    /// Wall-clock counterpart of `last_seen` for the presentation layer.
    pub last_seen_at: OffsetDateTime,
    /// Monotonic timestamp of the last availability transition.
    pub availability_changed: Instant,
}

impl DeviceState {
    fn from_sighting(adv: &RawAdvertisement) -> Self {
        Self {
            address: adv.address.clone(),
            local_name: adv.local_name.clone(),
            rssi: adv.rssi,
            firmware_version: None,
            model: None,
            valve_kind: None,
            valve_data: None,
            availability: Availability::Available,
            last_seen: adv.received_at,
            last_seen_at: adv.seen_at,
            availability_changed: adv.received_at,
        }
    }

    /// Human-readable device identifier for presentation.
    pub fn display_name(&self) -> &'static str {
        friendly_name(self.local_name.as_deref())
    }

    /// Firmware version rendered the way the vendor app displays it.
    pub fn formatted_firmware(&self) -> Option<String> {
        self.firmware_version
            .map(|v| format_firmware_version(v, is_clack_name(self.local_name.as_deref())))
    }

    /// Whether the device currently counts as present.
    pub fn is_available(&self) -> bool {
        self.availability.is_available()
    }
}

/// What an upsert changed, for event emission by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// The address was seen for the first time this session.
    pub created: bool,
    /// The device transitioned from Unavailable back to Available.
    pub revived: bool,
    /// Decoded firmware or model differ from the previous known values.
    pub metadata_changed: bool,
}

/// Registry of all valves sighted during one discovery session.
///
/// Constructed empty at discovery start and torn down explicitly with
/// [`clear`](Self::clear); there is no background eviction.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, DeviceState>>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signature-matched advertisement for its device.
    ///
    /// `decoded` carries the payload decode result: `Some` updates the
    /// metadata fields, `None` (decode failure or no payload) updates only
    /// liveness. Either way the advertisement revives availability, since
    /// a garbled broadcast still proves the device is in range. The
    /// last-seen timestamp never moves backwards; duplicate or reordered
    /// deliveries keep the newest one.
    pub async fn apply(
        &self,
        adv: &RawAdvertisement,
        decoded: Option<&DecodedValveInfo>,
    ) -> UpsertOutcome {
        let mut devices = self.devices.write().await;

        let mut outcome = UpsertOutcome::default();
        let state = devices.entry(adv.address.clone()).or_insert_with(|| {
            outcome.created = true;
            DeviceState::from_sighting(adv)
        });

        if !outcome.created {
            if state.availability == Availability::Unavailable {
                state.availability = Availability::Available;
                state.availability_changed = adv.received_at;
                outcome.revived = true;
            }

            if adv.received_at > state.last_seen {
                state.last_seen = adv.received_at;
                state.last_seen_at = adv.seen_at;
            } else {
                debug!(
                    address = %adv.address,
                    "out-of-order advertisement, keeping newer last-seen"
                );
            }

            if adv.local_name.is_some() {
                state.local_name = adv.local_name.clone();
            }
            if adv.rssi.is_some() {
                state.rssi = adv.rssi;
            }
        }

        if let Some(info) = decoded {
            if !outcome.created {
                outcome.metadata_changed = state.firmware_version != Some(info.firmware_version)
                    || state.model != Some(info.model);
            }
            state.firmware_version = Some(info.firmware_version);
            state.model = Some(info.model);
            if let Some(kind) = info.valve_kind(state.local_name.as_deref()) {
                state.valve_kind = Some(kind);
            }
            if info.valve_data.is_some() {
                state.valve_data = info.valve_data.clone();
            }
        }

        outcome
    }

    /// Snapshot of one device's state.
    pub async fn get(&self, address: &str) -> Option<DeviceState> {
        self.devices.read().await.get(address).cloned()
    }

    /// Snapshots of every tracked device, in no particular order.
    pub async fn all(&self) -> Vec<DeviceState> {
        self.devices.read().await.values().cloned().collect()
    }

    /// Addresses of every tracked device.
    pub async fn addresses(&self) -> Vec<String> {
        self.devices.read().await.keys().cloned().collect()
    }

    /// Number of tracked devices.
    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    /// Whether the registry tracks no devices.
    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    /// Flip devices whose last sighting is older than `timeout` to
    /// Unavailable, returning a snapshot of each device that changed.
    ///
    /// Idempotent: a device already Unavailable is not flipped again, so a
    /// stale device produces exactly one transition per lapse. The check
    /// runs under the write lock, so an upsert racing with the sweep either
    /// refreshes last-seen before the check (no flip) or revives the device
    /// right after it; fresh evidence always wins.
    pub async fn mark_stale(&self, now: Instant, timeout: Duration) -> Vec<DeviceState> {
        let mut devices = self.devices.write().await;
        let mut flipped = Vec::new();

        for state in devices.values_mut() {
            if state.availability == Availability::Available
                && is_stale(state.last_seen, now, timeout)
            {
                state.availability = Availability::Unavailable;
                state.availability_changed = now;
                flipped.push(state.clone());
            }
        }

        flipped
    }

    /// Drop every tracked device. Called once at discovery teardown.
    pub async fn clear(&self) {
        let mut devices = self.devices.write().await;
        if !devices.is_empty() {
            debug!(count = devices.len(), "clearing device registry");
        }
        devices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advertisement::decode_valve_payload;

    fn decoded(payload: &[u8]) -> DecodedValveInfo {
        decode_valve_payload(payload).unwrap()
    }

    #[tokio::test]
    async fn test_first_sighting_creates_available_state() {
        let registry = DeviceRegistry::new();
        let adv = RawAdvertisement::new("AA:BB:CC:DD:EE:FF")
            .local_name("CS_Meter_Soft")
            .rssi(-60);

        let outcome = registry.apply(&adv, Some(&decoded(&[0x02, 0x58]))).await;
        assert!(outcome.created);
        assert!(!outcome.revived);
        assert!(!outcome.metadata_changed);

        let state = registry.get("AA:BB:CC:DD:EE:FF").await.unwrap();
        assert_eq!(state.availability, Availability::Available);
        assert_eq!(state.firmware_version, Some(600));
        assert_eq!(state.model, Some(ValveModel::Evb034));
        assert_eq!(state.rssi, Some(-60));
        assert_eq!(state.display_name(), "Metered Softener");
        assert_eq!(state.formatted_firmware().as_deref(), Some("C6.00"));
    }

    #[tokio::test]
    async fn test_upsert_idempotent_for_identical_metadata() {
        let registry = DeviceRegistry::new();
        let t0 = Instant::now();

        let first = RawAdvertisement::new("A").received_at(t0);
        registry.apply(&first, Some(&decoded(&[0x02, 0x58]))).await;

        let t1 = t0 + Duration::from_secs(5);
        let second = RawAdvertisement::new("A").received_at(t1);
        let outcome = registry.apply(&second, Some(&decoded(&[0x02, 0x58]))).await;

        assert!(!outcome.created);
        assert!(!outcome.metadata_changed);

        let state = registry.get("A").await.unwrap();
        assert_eq!(state.firmware_version, Some(600));
        assert_eq!(state.last_seen, t1);
    }

    #[tokio::test]
    async fn test_last_seen_is_monotonic() {
        let registry = DeviceRegistry::new();
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_secs(10);

        registry
            .apply(&RawAdvertisement::new("A").received_at(t1), None)
            .await;
        // Reordered delivery of an older broadcast
        registry
            .apply(&RawAdvertisement::new("A").received_at(t0), None)
            .await;

        let state = registry.get("A").await.unwrap();
        assert_eq!(state.last_seen, t1);
    }

    #[tokio::test]
    async fn test_decode_failure_retains_metadata() {
        let registry = DeviceRegistry::new();
        let t0 = Instant::now();

        let good = RawAdvertisement::new("A").received_at(t0);
        registry.apply(&good, Some(&decoded(&[0x02, 0x58]))).await;

        // The next broadcast is garbled: liveness only
        let t1 = t0 + Duration::from_secs(3);
        let bad = RawAdvertisement::new("A").received_at(t1);
        let outcome = registry.apply(&bad, None).await;
        assert!(!outcome.metadata_changed);

        let state = registry.get("A").await.unwrap();
        assert_eq!(state.firmware_version, Some(600));
        assert_eq!(state.model, Some(ValveModel::Evb034));
        assert_eq!(state.last_seen, t1);
        assert_eq!(state.availability, Availability::Available);
    }

    #[tokio::test]
    async fn test_metadata_change_is_reported() {
        let registry = DeviceRegistry::new();

        registry
            .apply(&RawAdvertisement::new("A"), Some(&decoded(&[0x02, 0x57])))
            .await;
        let outcome = registry
            .apply(&RawAdvertisement::new("A"), Some(&decoded(&[0x02, 0x58])))
            .await;

        // 599 -> 600 crosses the model threshold
        assert!(outcome.metadata_changed);
        let state = registry.get("A").await.unwrap();
        assert_eq!(state.firmware_version, Some(600));
        assert_eq!(state.model, Some(ValveModel::Evb034));
    }

    #[tokio::test]
    async fn test_mark_stale_flips_exactly_once() {
        let registry = DeviceRegistry::new();
        let timeout = Duration::from_secs(60);
        let t0 = Instant::now();

        registry
            .apply(&RawAdvertisement::new("A").received_at(t0), None)
            .await;

        // Within the window: no transition
        let flipped = registry.mark_stale(t0 + Duration::from_secs(30), timeout).await;
        assert!(flipped.is_empty());

        // Past the window: exactly one transition
        let later = t0 + Duration::from_secs(61);
        let flipped = registry.mark_stale(later, timeout).await;
        assert_eq!(flipped.len(), 1);
        assert_eq!(flipped[0].availability, Availability::Unavailable);

        // Re-checking while still stale produces nothing
        let flipped = registry.mark_stale(later + Duration::from_secs(60), timeout).await;
        assert!(flipped.is_empty());
    }

    #[tokio::test]
    async fn test_revival_after_staleness() {
        let registry = DeviceRegistry::new();
        let timeout = Duration::from_secs(60);
        let t0 = Instant::now();

        registry
            .apply(&RawAdvertisement::new("A").received_at(t0), None)
            .await;
        registry.mark_stale(t0 + Duration::from_secs(120), timeout).await;
        assert_eq!(
            registry.get("A").await.unwrap().availability,
            Availability::Unavailable
        );

        // Any matching advertisement revives, decode success not required
        let revival = RawAdvertisement::new("A").received_at(t0 + Duration::from_secs(130));
        let outcome = registry.apply(&revival, None).await;
        assert!(outcome.revived);
        assert_eq!(
            registry.get("A").await.unwrap().availability,
            Availability::Available
        );
    }

    #[tokio::test]
    async fn test_staleness_never_evicts() {
        let registry = DeviceRegistry::new();
        let t0 = Instant::now();

        registry
            .apply(
                &RawAdvertisement::new("A").received_at(t0),
                Some(&decoded(&[0x02, 0x58])),
            )
            .await;
        registry
            .mark_stale(t0 + Duration::from_secs(3600), Duration::from_secs(60))
            .await;

        // Still tracked, metadata intact
        let state = registry.get("A").await.unwrap();
        assert_eq!(state.firmware_version, Some(600));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let registry = DeviceRegistry::new();
        registry.apply(&RawAdvertisement::new("A"), None).await;
        registry.apply(&RawAdvertisement::new("B"), None).await;
        assert_eq!(registry.len().await, 2);

        registry.clear().await;
        assert!(registry.is_empty().await);
        assert!(registry.get("A").await.is_none());
    }

    #[tokio::test]
    async fn test_all_returns_snapshots() {
        let registry = DeviceRegistry::new();
        registry.apply(&RawAdvertisement::new("A"), None).await;
        registry.apply(&RawAdvertisement::new("B"), None).await;

        let mut addresses: Vec<String> =
            registry.all().await.into_iter().map(|s| s.address).collect();
        addresses.sort();
        assert_eq!(addresses, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_valve_kind_follows_family() {
        let registry = DeviceRegistry::new();
        // Type code 3 at offset 6, Clack name: aeration
        let adv = RawAdvertisement::new("A").local_name("CL_01");
        registry
            .apply(&adv, Some(&decoded(&[0x02, 0x58, 0, 0, 0, 0, 3, 1])))
            .await;

        let state = registry.get("A").await.unwrap();
        assert_eq!(state.valve_kind, Some(ValveKind::ClackAeration));
        assert!(state.valve_data.is_some());
    }
}
