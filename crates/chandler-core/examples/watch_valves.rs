//! Example: Watching for Chandler Valves
//!
//! This example runs the passive scan loop and prints every valve event:
//! discovery, metadata updates, and availability transitions.
//!
//! Run with: `cargo run --example watch_valves`

use std::sync::Arc;
use std::time::Duration;

use chandler_core::monitor::{ValveMonitor, ValveMonitorOptions};
use chandler_core::scan::{ScanOptions, run_scanner};
use chandler_core::{ValveEvent, format_firmware_version};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let options = ValveMonitorOptions::default().presence_timeout(Duration::from_secs(120));
    let monitor = Arc::new(ValveMonitor::new(options));
    let sweeper = monitor.start();

    let cancel = CancellationToken::new();
    let scanner = tokio::spawn(run_scanner(
        Arc::clone(&monitor),
        ScanOptions::default(),
        cancel.clone(),
    ));

    println!("Watching for Chandler valves. Press Ctrl-C to stop.");
    println!();

    let mut events = monitor.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(ValveEvent::Discovered { device, rssi }) => {
                    let rssi = rssi.map(|r| format!("{} dBm", r)).unwrap_or_else(|| "N/A".to_string());
                    println!("Discovered {} (RSSI: {})", device.address, rssi);
                    if let Some(state) = monitor.registry().get(&device.address).await {
                        println!("  Name: {}", state.display_name());
                        if let Some(fw) = state.formatted_firmware() {
                            println!("  Firmware: {}", fw);
                        }
                        if let Some(model) = state.model {
                            println!("  Model: {}", model);
                        }
                    }
                }
                Ok(ValveEvent::MetadataUpdated { device, firmware_version, model }) => {
                    println!(
                        "{}: firmware {} ({})",
                        device.address,
                        format_firmware_version(firmware_version, false),
                        model
                    );
                }
                Ok(ValveEvent::AvailabilityChanged { device, availability }) => {
                    println!("{}: now {}", device.address, availability);
                }
                Ok(_) => {}
                Err(_) => break,
            },
        }
    }

    cancel.cancel();
    monitor.shutdown().await;
    let _ = scanner.await;
    let _ = sweeper.await;
    Ok(())
}
