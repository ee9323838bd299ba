#[derive(Debug, thiserror::Error)]
pub enum IbwatchError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Missing expected counter files for {device}: {}", .missing.join(", "))]
    MissingCounters {
        device: String,
        missing: Vec<&'static str>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Platform error: {0}")]
    Platform(String),
}

pub type Result<T> = std::result::Result<T, IbwatchError>;
