use crate::error::{IbwatchError, Result};
use crate::validation;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "ibwatch",
    about = "Live InfiniBand bandwidth and packet-rate monitor"
)]
#[command(version, long_about = None)]
pub struct Args {
    /// InfiniBand devices to monitor, comma separated (default: all ACTIVE devices)
    #[arg(short = 'd', long = "device", value_delimiter = ',')]
    pub devices: Vec<String>,

    /// Port number
    #[arg(short = 'p', long = "port")]
    pub port: Option<u32>,

    /// Refresh interval in seconds (supports sub-second values)
    #[arg(short = 'i', long = "interval")]
    pub interval: Option<f64>,

    /// Display bandwidth as bits/s or bytes/s
    #[arg(short = 'u', long = "units", value_enum, ignore_case = true)]
    pub units: Option<DisplayUnit>,

    /// CSV output path (logs bytes/sec and packets/sec)
    #[arg(long = "csv")]
    pub csv: Option<PathBuf>,

    /// Append to the CSV file instead of truncating it
    #[arg(long = "csv-append")]
    pub csv_append: bool,

    /// Write the CSV header row even when appending
    #[arg(long = "csv-headers")]
    pub csv_headers: bool,

    /// Stop after this many seconds (0 = run until quit)
    #[arg(long = "duration", default_value = "0")]
    pub duration: f64,

    /// Panel background
    #[arg(long = "bg", value_enum, ignore_case = true)]
    pub background: Option<Background>,

    /// Root of the InfiniBand device class tree
    #[arg(long = "sysfs-root")]
    pub sysfs_root: Option<PathBuf>,

    /// Consecutive failed reads before a device is shown as stale (0 = never)
    #[arg(long = "stale-after")]
    pub stale_after: Option<u32>,

    /// List ACTIVE InfiniBand devices and exit
    #[arg(short, long)]
    pub list: bool,

    /// Test mode - print counters and one rate sample per device and exit (bypass TUI)
    #[arg(long)]
    pub test: bool,

    /// Write diagnostic logs to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Rejects argument combinations that cannot produce a working session.
    pub fn validate(&self) -> Result<()> {
        for device in &self.devices {
            validation::validate_device_name(device)?;
        }

        if let Some(port) = self.port {
            validation::validate_port(port)?;
        }

        if let Some(interval) = self.interval {
            validation::validate_interval(interval)?;
        }

        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(IbwatchError::Config(
                "Duration must be a non-negative number of seconds".to_string(),
            ));
        }

        if let Some(ref path) = self.csv {
            validation::validate_file_path(&path.to_string_lossy())?;
        }

        if let Some(ref path) = self.log_file {
            validation::validate_file_path(&path.to_string_lossy())?;
        }

        Ok(())
    }
}

#[derive(
    clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnit {
    #[default]
    Bits,
    Bytes,
}

impl DisplayUnit {
    #[must_use]
    pub fn toggle(self) -> Self {
        match self {
            Self::Bits => Self::Bytes,
            Self::Bytes => Self::Bits,
        }
    }

    /// Multiplier applied to a bytes/sec value before display.
    #[must_use]
    pub fn factor(self) -> f64 {
        match self {
            Self::Bits => 8.0,
            Self::Bytes => 1.0,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bits => "bits",
            Self::Bytes => "bytes",
        }
    }
}

#[derive(
    clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    #[default]
    Black,
    Terminal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device_list() {
        let args = Args::try_parse_from(["ibwatch", "-d", "mlx5_0,mlx5_1", "-d", "mlx5_2"])
            .unwrap();
        assert_eq!(args.devices, vec!["mlx5_0", "mlx5_1", "mlx5_2"]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_units_are_case_insensitive() {
        let args = Args::try_parse_from(["ibwatch", "-u", "BYTES"]).unwrap();
        assert_eq!(args.units, Some(DisplayUnit::Bytes));
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let args = Args::try_parse_from(["ibwatch", "-i", "0"]).unwrap();
        assert!(args.validate().is_err());

        let args = Args::try_parse_from(["ibwatch", "-i", "0.2"]).unwrap();
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_port_zero_rejected() {
        let args = Args::try_parse_from(["ibwatch", "-p", "0"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_negative_duration_rejected() {
        let args = Args::try_parse_from(["ibwatch", "--duration=-1"]).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_unit_toggle() {
        assert_eq!(DisplayUnit::Bits.toggle(), DisplayUnit::Bytes);
        assert_eq!(DisplayUnit::Bytes.toggle(), DisplayUnit::Bits);
        assert_eq!(DisplayUnit::Bits.factor(), 8.0);
    }
}
