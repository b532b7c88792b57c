//! Timeout-driven availability tracking.
//!
//! Valves advertise on an irregular, vendor-controlled interval and the
//! radio layer drops packets freely, so presence cannot follow individual
//! broadcasts without flapping. Instead a device stays Available until no
//! matching advertisement has been seen for the configured timeout; any
//! later matching advertisement revives it immediately, whether or not its
//! payload decodes.
//!
//! The sweep side of the state machine lives here: a periodic task that
//! asks the registry to flip stale devices and broadcasts the resulting
//! transitions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use chandler_types::Availability;

use crate::events::{EventDispatcher, ValveEvent, ValveId};
use crate::registry::DeviceRegistry;

/// Default duration without a matching advertisement before a valve is
/// marked Unavailable.
pub const DEFAULT_PRESENCE_TIMEOUT: Duration = Duration::from_secs(300);

/// Default interval between availability sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Whether a device last seen at `last_seen` counts as stale at `now`.
///
/// A device is stale strictly after the timeout elapses; at exactly the
/// timeout boundary it is still present.
pub fn is_stale(last_seen: Instant, now: Instant, timeout: Duration) -> bool {
    now.saturating_duration_since(last_seen) > timeout
}

/// Spawn the periodic availability sweep.
///
/// Runs until the cancellation token fires. Each tick flips devices whose
/// last sighting is older than `timeout` and broadcasts one
/// [`ValveEvent::AvailabilityChanged`] per transition; ticks that flip
/// nothing emit nothing.
pub fn spawn_sweeper(
    registry: Arc<DeviceRegistry>,
    events: EventDispatcher,
    timeout: Duration,
    sweep_interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(sweep_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("availability sweeper cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let flipped = registry.mark_stale(Instant::now(), timeout).await;
                    for state in flipped {
                        debug!(address = %state.address, "valve presence timed out");
                        events.send(ValveEvent::AvailabilityChanged {
                            device: ValveId {
                                address: state.address,
                                name: state.local_name,
                            },
                            availability: Availability::Unavailable,
                        });
                    }
                }
            }
        }
    })
}
