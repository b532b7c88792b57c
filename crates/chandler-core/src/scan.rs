//! Bluetooth scan bridge.
//!
//! The monitor itself never touches the radio; it consumes
//! [`RawAdvertisement`] values from whatever scanning subsystem hosts it.
//! This module is the built-in host for standalone use: a passive btleplug
//! scan loop that converts peripheral properties into advertisements and
//! feeds them to a [`ValveMonitor`].

use std::sync::Arc;
use std::time::Duration;

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::advertisement::RawAdvertisement;
use crate::error::{Error, Result};
use crate::monitor::ValveMonitor;

/// Options for the scan loop.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// How long each scan window stays open.
    pub scan_duration: Duration,
    /// Delay between scan windows.
    pub scan_interval: Duration,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            scan_duration: Duration::from_secs(5),
            scan_interval: Duration::from_secs(1),
        }
    }
}

impl ScanOptions {
    /// Create new options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan window duration.
    pub fn scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    /// Set the delay between scan windows.
    pub fn scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }
}

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters.into_iter().next().ok_or(Error::NoAdapter)
}

/// Run the scan loop, feeding advertisements into the monitor.
///
/// Runs until the cancellation token fires. Individual scan cycles that
/// fail (adapter glitches, transient BLE errors) are logged and retried on
/// the next cycle rather than aborting the loop.
pub async fn run_scanner(
    monitor: Arc<ValveMonitor>,
    options: ScanOptions,
    cancel: CancellationToken,
) -> Result<()> {
    monitor.options().validate()?;

    let adapter = get_adapter().await?;
    info!("starting valve scan loop");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("valve scan loop cancelled");
                break;
            }
            result = scan_cycle(&adapter, &monitor, &options) => {
                if let Err(e) = result {
                    warn!("scan cycle failed: {}", e);
                }
                sleep(options.scan_interval).await;
            }
        }
    }

    Ok(())
}

/// Perform a single scan window and ingest what it saw.
async fn scan_cycle(
    adapter: &Adapter,
    monitor: &ValveMonitor,
    options: &ScanOptions,
) -> Result<()> {
    adapter.start_scan(ScanFilter::default()).await?;
    sleep(options.scan_duration).await;
    adapter.stop_scan().await?;

    let peripherals = adapter.peripherals().await?;
    debug!(count = peripherals.len(), "scan window closed");

    for peripheral in peripherals {
        if let Ok(Some(props)) = peripheral.properties().await {
            let mut adv = RawAdvertisement::new(props.address.to_string());
            if let Some(name) = props.local_name {
                adv = adv.local_name(name);
            }
            if let Some(rssi) = props.rssi {
                adv = adv.rssi(rssi);
            }
            for (id, payload) in props.manufacturer_data {
                adv = adv.manufacturer_data(id, payload);
            }

            monitor.ingest(adv).await;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_options_default() {
        let options = ScanOptions::default();
        assert_eq!(options.scan_duration, Duration::from_secs(5));
        assert_eq!(options.scan_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_scan_options_builder() {
        let options = ScanOptions::new()
            .scan_duration(Duration::from_secs(10))
            .scan_interval(Duration::from_millis(500));

        assert_eq!(options.scan_duration, Duration::from_secs(10));
        assert_eq!(options.scan_interval, Duration::from_millis(500));
    }
}
