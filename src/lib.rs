//! # ibwatch
//!
//! A live terminal dashboard for InfiniBand link throughput, read from the
//! kernel's per-port sysfs counters.
//!
//! ## Features
//!
//! - RX/TX bandwidth and packet-rate history charts, scaled to the link rate
//! - Correct handling of 64-bit counter wraparound and word-unit data counters
//! - Single-device view or a grid of every ACTIVE device
//! - Raw counter and GID table views
//! - Optional CSV log of per-tick rates
//!
//! ## Example
//!
//! ```rust,no_run
//! use ibwatch::cli::Args;
//! use ibwatch::run;
//!
//! let args = Args {
//!     devices: vec!["mlx5_0".to_string()],
//!     interval: Some(0.5),
//!     ..Default::default()
//! };
//!
//! run(args).expect("Failed to run ibwatch");
//! ```

pub mod chart;
pub mod cli;
pub mod config;
pub mod device;
pub mod display;
pub mod error;
pub mod history;
pub mod input;
pub mod layout;
pub mod logger;
pub mod logging;
pub mod monitor;
pub mod panels;
pub mod platform;
pub mod session;
pub mod stats;
pub mod units;
pub mod validation;

use anyhow::{Context, Result};
use cli::Args;
use device::{CounterSource, DeviceId};
use std::time::Duration;
use tracing::{info, warn};

/// Main entry point for the ibwatch application.
///
/// Resolves configuration (command line over `~/.ibwatch` over defaults),
/// then lists devices, runs the one-shot test mode, or starts the dashboard.
pub fn run(args: Args) -> Result<()> {
    args.validate()?;

    let mut config = config::Config::load()?;
    config.apply_args(&args);

    let source = platform::create_source(&config.sysfs_root)?;

    if args.list {
        return list_devices(source.as_ref());
    }

    let names = select_devices(source.as_ref(), &config)?;
    let ids: Vec<DeviceId> = names
        .iter()
        .map(|name| DeviceId::new(name.as_str(), config.port))
        .collect();

    if args.test {
        return test_devices(source.as_ref(), ids, &config);
    }

    let monitors = monitor::MonitorSet::open(source.as_ref(), ids, config.stale_after)
        .context("Failed to open InfiniBand device")?;
    info!(devices = ?names, interval = config.interval, "monitoring started");

    let logger = args.csv.as_deref().and_then(|path| {
        match logger::RateLogger::open(path, args.csv_append, args.csv_headers, names.clone()) {
            Ok(logger) => Some(logger),
            Err(e) => {
                eprintln!("Failed to open CSV file {}: {e}", path.display());
                warn!(path = %path.display(), error = %e, "CSV logging disabled");
                None
            }
        }
    });

    let options = display::DisplayOptions {
        interval: config.interval_duration(),
        duration: (args.duration > 0.0).then(|| Duration::from_secs_f64(args.duration)),
        palette: chart::Palette::new(config.background),
    };

    display::run_ui(
        source.as_ref(),
        monitors,
        session::Session::new(config.units),
        options,
        logger,
    )
}

fn list_devices(source: &dyn CounterSource) -> Result<()> {
    let devices = source.list_devices()?;

    if devices.is_empty() {
        println!("No ACTIVE InfiniBand devices found");
    }
    for device in devices {
        println!("{device}");
    }

    Ok(())
}

/// Devices named in the configuration, or every ACTIVE device.
fn select_devices(source: &dyn CounterSource, config: &config::Config) -> Result<Vec<String>> {
    if !config.devices.is_empty() {
        return Ok(config.devices.clone());
    }

    let devices = source.list_devices()?;
    if devices.is_empty() {
        anyhow::bail!(
            "No ACTIVE InfiniBand devices found under {} (use -d to name one)",
            config.sysfs_root.display()
        );
    }
    Ok(devices)
}

fn test_devices(source: &dyn CounterSource, ids: Vec<DeviceId>, config: &config::Config) -> Result<()> {
    let mut monitors = monitor::MonitorSet::open(source, ids, config.stale_after)
        .context("Failed to open InfiniBand device")?;

    for device in monitors.devices() {
        println!("Testing device: {}", device.id());
        println!("  Link layer:  {}", device.link_layer().unwrap_or("unknown"));
        println!("  Rate:        {}", device.link_rate().unwrap_or("unknown"));
        println!(
            "  Data units:  {}",
            if device.handles().words_mode { "4-byte words" } else { "bytes" }
        );
        for reading in panels::RawCounters::collect(source, device).all() {
            println!("  {}", reading.line());
        }
        println!();
    }

    std::thread::sleep(config.interval_duration());
    monitors.tick(source, monitor::TickControl::default());

    for device in monitors.devices() {
        let rate = device.last_sample();
        println!("Rates for {} over {:.3} s:", device.id(), config.interval);
        println!(
            "  RX: {}  {}",
            units::human_rate(rate.rx_bytes_per_sec, config.units),
            units::human_pps(rate.rx_packets_per_sec)
        );
        println!(
            "  TX: {}  {}",
            units::human_rate(rate.tx_bytes_per_sec, config.units),
            units::human_pps(rate.tx_packets_per_sec)
        );
        if device.consecutive_failures() > 0 {
            println!("  (read failed, previous rates shown)");
        }
    }

    Ok(())
}
