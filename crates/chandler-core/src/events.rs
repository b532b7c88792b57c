//! Change notifications for the presentation layer.
//!
//! The monitor broadcasts an event whenever a valve is first sighted, its
//! decoded metadata changes, or its availability flips. Consumers subscribe
//! through a broadcast channel; a slow consumer only loses its own backlog,
//! never stalls classification.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use chandler_types::{Availability, ValveModel};

/// Identity of a valve as carried in events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValveId {
    /// Stable hardware address.
    pub address: String,
    /// Advertised local name if known.
    pub name: Option<String>,
}

impl ValveId {
    /// Create a valve id from an address alone.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
        }
    }

    /// Create a valve id with an advertised name.
    pub fn with_name(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: Some(name.into()),
        }
    }
}

/// Events emitted while tracking valves.
///
/// All events are serializable for logging and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum ValveEvent {
    /// A valve was sighted for the first time this session.
    Discovered {
        device: ValveId,
        rssi: Option<i16>,
    },
    /// Decoded metadata changed for a tracked valve.
    MetadataUpdated {
        device: ValveId,
        firmware_version: u32,
        model: ValveModel,
    },
    /// A tracked valve crossed the presence boundary.
    AvailabilityChanged {
        device: ValveId,
        availability: Availability,
    },
}

/// Sender for valve events.
pub type EventSender = broadcast::Sender<ValveEvent>;

/// Receiver for valve events.
pub type EventReceiver = broadcast::Receiver<ValveEvent>;

/// Dispatcher fanning valve events out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a dispatcher with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event, ignoring the absence of subscribers.
    pub fn send(&self, event: ValveEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of active subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
