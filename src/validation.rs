//! Input validation for ibwatch
//!
//! Device names end up as path components under the device class tree and
//! CSV/log paths are opened for writing, so both are checked before use.

use crate::error::{IbwatchError, Result};

/// Maximum allowed length for InfiniBand device names
const MAX_DEVICE_NAME_LEN: usize = 64;

/// Maximum allowed length for file paths
const MAX_PATH_LEN: usize = 4096;

/// Minimum allowed refresh interval in seconds
pub const MIN_INTERVAL_SECS: f64 = 0.05;

/// Maximum allowed refresh interval in seconds
pub const MAX_INTERVAL_SECS: f64 = 60.0;

/// Validates InfiniBand device names such as `mlx5_0` or `hfi1_0`.
///
/// # Examples
/// ```
/// use ibwatch::validation::validate_device_name;
///
/// assert!(validate_device_name("mlx5_0").is_ok());
/// assert!(validate_device_name("../mlx5_0").is_err());
/// ```
pub fn validate_device_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(IbwatchError::Parse(
            "Device name cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_DEVICE_NAME_LEN {
        return Err(IbwatchError::Parse(format!(
            "Device name too long (max {MAX_DEVICE_NAME_LEN} characters)"
        )));
    }

    if name.contains('\0') || name.chars().any(|c| c.is_control()) {
        return Err(IbwatchError::Parse(
            "Control characters not allowed in device name".to_string(),
        ));
    }

    if name.contains("..")
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(IbwatchError::Parse(
            "Invalid characters in device name".to_string(),
        ));
    }

    Ok(())
}

/// Validates paths for the CSV and diagnostic logs.
///
/// # Examples
/// ```
/// use ibwatch::validation::validate_file_path;
///
/// assert!(validate_file_path("/tmp/ib.csv").is_ok());
/// assert!(validate_file_path("../../../etc/passwd").is_err());
/// ```
pub fn validate_file_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(IbwatchError::Config(
            "File path cannot be empty".to_string(),
        ));
    }

    if path.len() > MAX_PATH_LEN {
        return Err(IbwatchError::Config(format!(
            "File path too long (max {MAX_PATH_LEN} characters)"
        )));
    }

    if path.contains('\0') || path.chars().any(|c| c.is_control()) {
        return Err(IbwatchError::Config(
            "Control characters not allowed in file path".to_string(),
        ));
    }

    if path.contains("..") {
        return Err(IbwatchError::Config("Path traversal detected".to_string()));
    }

    let sensitive_dirs = ["/etc", "/boot", "/proc", "/sys", "/dev", "/bin", "/sbin"];
    for sensitive_dir in &sensitive_dirs {
        if path == *sensitive_dir || path.starts_with(&format!("{sensitive_dir}/")) {
            return Err(IbwatchError::Config(
                "Access to sensitive directory denied".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates the refresh interval in seconds.
pub fn validate_interval(seconds: f64) -> Result<()> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(IbwatchError::Config(
            "Interval must be greater than 0".to_string(),
        ));
    }

    if seconds < MIN_INTERVAL_SECS {
        return Err(IbwatchError::Config(format!(
            "Interval too small (minimum {MIN_INTERVAL_SECS} s)"
        )));
    }

    if seconds > MAX_INTERVAL_SECS {
        return Err(IbwatchError::Config(format!(
            "Interval too large (maximum {MAX_INTERVAL_SECS} s)"
        )));
    }

    Ok(())
}

pub fn validate_port(port: u32) -> Result<()> {
    if port == 0 {
        return Err(IbwatchError::Config("Port must be greater than 0".to_string()));
    }
    Ok(())
}
