use crate::cli::{Args, Background, DisplayUnit};
use crate::error::IbwatchError;
use crate::monitor::DEFAULT_STALE_AFTER;
use crate::platform::DEFAULT_SYSFS_ROOT;
use crate::validation;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the settings file in the home directory.
pub const CONFIG_FILE_NAME: &str = ".ibwatch";

fn default_interval() -> f64 {
    1.0
}

fn default_port() -> u32 {
    1
}

fn default_stale_after() -> u32 {
    DEFAULT_STALE_AFTER
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from(DEFAULT_SYSFS_ROOT)
}

/// Persisted defaults. Explicit command-line values take precedence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Seconds between samples
    #[serde(rename = "Interval", default = "default_interval")]
    pub interval: f64,

    #[serde(rename = "Units", default)]
    pub units: DisplayUnit,

    #[serde(rename = "Port", default = "default_port")]
    pub port: u32,

    /// Devices to monitor; empty means every ACTIVE device
    #[serde(rename = "Devices", default)]
    pub devices: Vec<String>,

    #[serde(rename = "Background", default)]
    pub background: Background,

    #[serde(rename = "StaleAfter", default = "default_stale_after")]
    pub stale_after: u32,

    #[serde(rename = "SysfsRoot", default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            units: DisplayUnit::default(),
            port: default_port(),
            devices: Vec::new(),
            background: Background::default(),
            stale_after: default_stale_after(),
            sysfs_root: default_sysfs_root(),
        }
    }
}

impl Config {
    /// Loads `~/.ibwatch`, or the defaults when it does not exist.
    pub fn load() -> anyhow::Result<Self> {
        match dirs::home_dir() {
            Some(home) => Self::load_from(&home.join(CONFIG_FILE_NAME)),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            IbwatchError::Config(format!("{}: {}", path.display(), e.message()))
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> crate::error::Result<()> {
        validation::validate_interval(self.interval)?;
        validation::validate_port(self.port)?;
        for device in &self.devices {
            validation::validate_device_name(device)?;
        }
        Ok(())
    }

    /// Overrides file values with the ones given on the command line.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(interval) = args.interval {
            self.interval = interval;
        }
        if let Some(units) = args.units {
            self.units = units;
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if !args.devices.is_empty() {
            self.devices = args.devices.clone();
        }
        if let Some(background) = args.background {
            self.background = background;
        }
        if let Some(stale_after) = args.stale_after {
            self.stale_after = stale_after;
        }
        if let Some(ref root) = args.sysfs_root {
            self.sysfs_root = root.clone();
        }
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs_f64(self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.interval, 1.0);
        assert_eq!(config.port, 1);
        assert_eq!(config.units, DisplayUnit::Bits);
        assert_eq!(config.background, Background::Black);
        assert_eq!(config.stale_after, 5);
        assert_eq!(config.sysfs_root, PathBuf::from("/sys/class/infiniband"));
        assert_eq!(config.interval_duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".ibwatch");
        std::fs::write(&path, "Interval = 0.5\nUnits = \"bytes\"\nDevices = [\"mlx5_1\"]\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.interval, 0.5);
        assert_eq!(config.units, DisplayUnit::Bytes);
        assert_eq!(config.devices, vec!["mlx5_1"]);
        assert_eq!(config.port, 1);
        assert_eq!(config.stale_after, 5);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("nope")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_file_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".ibwatch");

        std::fs::write(&path, "Interval = 0.0\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        std::fs::write(&path, "Units = \"furlongs\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config = Config {
            interval: 2.0,
            port: 2,
            devices: vec!["mlx5_3".to_string()],
            ..Config::default()
        };
        let args = Args::try_parse_from(["ibwatch", "-i", "0.5", "-u", "BYTES", "--stale-after", "0"]).unwrap();
        config.apply_args(&args);

        assert_eq!(config.interval, 0.5);
        assert_eq!(config.units, DisplayUnit::Bytes);
        assert_eq!(config.port, 2);
        assert_eq!(config.devices, vec!["mlx5_3"]);
        assert_eq!(config.stale_after, 0);
    }
}
