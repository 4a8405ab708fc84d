//! List every radio the enabled hosts can see, then stream briefly from the
//! first available one.
//!
//! cargo run --example list_devices --features rtlsdr,airspy,airspyhf

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use portsdr::{PortSdr, SdrTransfer};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_target(false)
        .init();

    let portsdr = PortSdr::new();
    info!("PortSDR {}", PortSdr::version());

    for host in portsdr.hosts() {
        info!("Host: {}", host.name());
        for device in host.devices() {
            info!(
                "  [{}] {} serial={} unavailable={}",
                device.index, device.name, device.serial, device.unavailable
            );
        }
    }

    let Some(device) = portsdr.first_available_device() else {
        info!("No available device");
        return Ok(());
    };

    let mut stream = device
        .create_stream()
        .with_context(|| format!("Failed to open {}", device.name))?;

    let rates = stream.sample_rates();
    if let Some(&rate) = rates.first() {
        stream.set_sample_rate(rate)?;
    }
    stream.set_center_frequency(100_000_000)?;

    for gain in stream.gain_stages() {
        info!(
            "  gain stage {}: {:?}..={:?} step {:?}",
            gain.stage,
            gain.range.min(),
            gain.range.max(),
            gain.range.step()
        );
    }

    let samples = Arc::new(AtomicU64::new(0));
    let counter = samples.clone();
    stream.set_callback(Box::new(move |transfer: &SdrTransfer<'_>| {
        counter.fetch_add(transfer.frame_size as u64, Ordering::Relaxed);
    }));

    stream.start()?;
    thread::sleep(Duration::from_secs(1));
    stream.stop()?;

    let stats = stream.stats();
    info!(
        "Received {} samples in {} buffers ({} dropped)",
        samples.load(Ordering::Relaxed),
        stats.buffers,
        stats.dropped_samples
    );
    Ok(())
}
