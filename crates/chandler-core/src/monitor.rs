//! Valve monitoring over BLE advertisements.
//!
//! [`ValveMonitor`] ties the pipeline together: signature matching, payload
//! decoding, registry upserts, availability sweeping, and change
//! notifications. It owns the per-session state and exposes one ingestion
//! entry point the scanning layer calls once per advertisement.
//!
//! # Example
//!
//! ```ignore
//! use chandler_core::monitor::{ValveMonitor, ValveMonitorOptions};
//!
//! let monitor = std::sync::Arc::new(ValveMonitor::new(ValveMonitorOptions::default()));
//! let sweeper = monitor.start();
//!
//! let mut rx = monitor.subscribe();
//! while let Ok(event) = rx.recv().await {
//!     println!("{:?}", event);
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use chandler_types::Availability;

use crate::advertisement::{RawAdvertisement, decode_valve_payload};
use crate::error::{Error, Result};
use crate::events::{EventDispatcher, EventReceiver, ValveEvent, ValveId};
use crate::presence::{DEFAULT_PRESENCE_TIMEOUT, DEFAULT_SWEEP_INTERVAL, spawn_sweeper};
use crate::registry::DeviceRegistry;
use crate::signature::ValveSignature;

/// Options for valve monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValveMonitorOptions {
    /// Recognition rules for supported valves.
    pub signature: ValveSignature,
    /// Duration without a matching advertisement before a valve is marked
    /// Unavailable.
    pub presence_timeout: Duration,
    /// Interval between availability sweeps.
    pub sweep_interval: Duration,
    /// Event channel capacity.
    pub channel_capacity: usize,
    /// Per-device passcode overrides from the setup flow, keyed by address.
    ///
    /// Carried for the command path, which is not part of this crate; the
    /// monitor itself never authenticates.
    #[serde(default)]
    pub passcode_overrides: HashMap<String, String>,
}

impl Default for ValveMonitorOptions {
    fn default() -> Self {
        Self {
            signature: ValveSignature::default(),
            presence_timeout: DEFAULT_PRESENCE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            channel_capacity: 100,
            passcode_overrides: HashMap::new(),
        }
    }
}

impl ValveMonitorOptions {
    /// Create new options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the valve signature.
    pub fn signature(mut self, signature: ValveSignature) -> Self {
        self.signature = signature;
        self
    }

    /// Set the presence timeout.
    pub fn presence_timeout(mut self, timeout: Duration) -> Self {
        self.presence_timeout = timeout;
        self
    }

    /// Set the interval between availability sweeps.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set a passcode override for one device.
    pub fn passcode_override(
        mut self,
        address: impl Into<String>,
        passcode: impl Into<String>,
    ) -> Self {
        self.passcode_overrides.insert(address.into(), passcode.into());
        self
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        if self.presence_timeout.is_zero() {
            return Err(Error::invalid_config("presence timeout cannot be zero"));
        }
        if self.sweep_interval.is_zero() {
            return Err(Error::invalid_config("sweep interval cannot be zero"));
        }
        if self.channel_capacity == 0 {
            return Err(Error::invalid_config("channel capacity cannot be zero"));
        }
        if self.signature.name_prefixes.iter().any(|p| p.is_empty()) {
            return Err(Error::invalid_config(
                "empty name prefix would match every device",
            ));
        }
        Ok(())
    }
}

/// Tracks valves for one discovery session.
///
/// The monitor is the only writer of its registry; advertisement events
/// may still arrive concurrently from different devices, and every
/// mutation path serializes on the registry lock. Reads (snapshots,
/// subscriptions) are safe at any time from other tasks.
pub struct ValveMonitor {
    options: ValveMonitorOptions,
    registry: Arc<DeviceRegistry>,
    events: EventDispatcher,
    cancel: CancellationToken,
}

impl ValveMonitor {
    /// Create a monitor with the given options.
    pub fn new(options: ValveMonitorOptions) -> Self {
        let events = EventDispatcher::new(options.channel_capacity);
        Self {
            options,
            registry: Arc::new(DeviceRegistry::new()),
            events,
            cancel: CancellationToken::new(),
        }
    }

    /// The options this monitor was created with.
    pub fn options(&self) -> &ValveMonitorOptions {
        &self.options
    }

    /// Shared handle to the device registry for snapshot reads.
    pub fn registry(&self) -> Arc<DeviceRegistry> {
        Arc::clone(&self.registry)
    }

    /// Subscribe to change notifications.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// Passcode override configured for a device, if any.
    pub fn passcode_for(&self, address: &str) -> Option<&str> {
        self.options.passcode_overrides.get(address).map(String::as_str)
    }

    /// Process one advertisement from the scanning layer.
    ///
    /// Bounded and non-blocking apart from the registry lock. Every
    /// failure mode is soft: a non-matching advertisement is dropped, a
    /// payload that does not decode still counts as a sighting, and
    /// nothing here can fail the caller.
    pub async fn ingest(&self, advertisement: RawAdvertisement) {
        if self.cancel.is_cancelled() {
            debug!(
                address = %advertisement.address,
                "dropping advertisement received after shutdown"
            );
            return;
        }

        if !self.options.signature.matches(&advertisement) {
            debug!(
                address = %advertisement.address,
                name = advertisement.local_name.as_deref().unwrap_or(""),
                "advertisement does not match valve signature"
            );
            return;
        }

        let decoded = match advertisement.manufacturer_payload(self.options.signature.manufacturer_id)
        {
            Some(payload) => match decode_valve_payload(payload) {
                Ok(info) => {
                    debug!(
                        address = %advertisement.address,
                        rssi = ?advertisement.rssi,
                        firmware = info.firmware_version,
                        model = %info.model,
                        "valve seen"
                    );
                    Some(info)
                }
                Err(err) => {
                    debug!(
                        address = %advertisement.address,
                        error = %err,
                        "manufacturer payload did not decode, counting sighting only"
                    );
                    None
                }
            },
            None => {
                debug!(
                    address = %advertisement.address,
                    "matched by name without manufacturer payload"
                );
                None
            }
        };

        let outcome = self.registry.apply(&advertisement, decoded.as_ref()).await;

        let device = ValveId {
            address: advertisement.address.clone(),
            name: advertisement.local_name.clone(),
        };

        if outcome.created {
            info!(address = %device.address, "valve discovered");
            self.events.send(ValveEvent::Discovered {
                device,
                rssi: advertisement.rssi,
            });
            return;
        }

        if outcome.revived {
            self.events.send(ValveEvent::AvailabilityChanged {
                device: device.clone(),
                availability: Availability::Available,
            });
        }

        if outcome.metadata_changed
            && let Some(info) = decoded
        {
            self.events.send(ValveEvent::MetadataUpdated {
                device,
                firmware_version: info.firmware_version,
                model: info.model,
            });
        }
    }

    /// Start the availability sweeper.
    ///
    /// Spawns a background task that runs until [`shutdown`](Self::shutdown)
    /// is called. Call once per monitor.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        info!(
            timeout = ?self.options.presence_timeout,
            "starting valve monitor"
        );
        spawn_sweeper(
            Arc::clone(&self.registry),
            self.events.clone(),
            self.options.presence_timeout,
            self.options.sweep_interval,
            self.cancel.clone(),
        )
    }

    /// Tear the session down.
    ///
    /// Cancellation is immediate: advertisements arriving after this point
    /// are dropped rather than drained, and the registry is released.
    pub async fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        info!("shutting down valve monitor");
        self.cancel.cancel();
        self.registry.clear().await;
    }

    /// Whether the monitor has been shut down.
    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
