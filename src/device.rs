use crate::error::{IbwatchError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};

/// A device/port pair, e.g. `mlx5_0` port 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId {
    pub name: String,
    pub port: u32,
}

impl DeviceId {
    pub fn new(name: impl Into<String>, port: u32) -> Self {
        Self {
            name: name.into(),
            port,
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} port {}", self.name, self.port)
    }
}

/// Opaque reference to one readable counter or attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CounterHandle {
    path: PathBuf,
}

impl CounterHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the counter, e.g. `port_xmit_data`.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Which raw-counter pane an optional counter is listed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterGroup {
    Rx,
    Tx,
    Other,
}

/// Diagnostic counters that are shown when present but never required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalCounter {
    RxErrors,
    RxRemotePhysicalErrors,
    RxSwitchRelayErrors,
    TxDiscards,
    TxWait,
    LocalPhyErrors,
    SymbolErrors,
    LinkErrorRecovery,
    LinkDowned,
    Vl15Dropped,
    ExcessiveBufferOverrun,
}

impl OptionalCounter {
    pub const ALL: [OptionalCounter; 11] = [
        Self::RxErrors,
        Self::RxRemotePhysicalErrors,
        Self::RxSwitchRelayErrors,
        Self::TxDiscards,
        Self::TxWait,
        Self::LocalPhyErrors,
        Self::SymbolErrors,
        Self::LinkErrorRecovery,
        Self::LinkDowned,
        Self::Vl15Dropped,
        Self::ExcessiveBufferOverrun,
    ];

    /// File names to probe, most canonical first.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Self::RxErrors => &["port_rcv_errors"],
            Self::RxRemotePhysicalErrors => &["port_rcv_remote_physical_errors"],
            Self::RxSwitchRelayErrors => &["port_rcv_switch_relay_errors"],
            Self::TxDiscards => &["port_xmit_discards"],
            Self::TxWait => &["port_xmit_wait"],
            Self::LocalPhyErrors => &["port_local_phy_errors", "port_local_physical_errors"],
            Self::SymbolErrors => &["symbol_error", "symbol_errors"],
            Self::LinkErrorRecovery => &["link_error_recovery"],
            Self::LinkDowned => &["link_downed"],
            Self::Vl15Dropped => &["VL15_dropped", "vl15_dropped"],
            Self::ExcessiveBufferOverrun => &["excessive_buffer_overrun_errors"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::RxErrors => "port_rcv_errors",
            Self::RxRemotePhysicalErrors => "rcv_remote_phy",
            Self::RxSwitchRelayErrors => "rcv_switch_relay",
            Self::TxDiscards => "xmit_discards",
            Self::TxWait => "xmit_wait",
            Self::LocalPhyErrors => "local_phy_errors",
            Self::SymbolErrors => "symbol_error",
            Self::LinkErrorRecovery => "link_err_recov",
            Self::LinkDowned => "link_downed",
            Self::Vl15Dropped => "vl15_dropped",
            Self::ExcessiveBufferOverrun => "excess_buf_over",
        }
    }

    pub fn group(self) -> CounterGroup {
        match self {
            Self::RxErrors | Self::RxRemotePhysicalErrors | Self::RxSwitchRelayErrors => {
                CounterGroup::Rx
            }
            Self::TxDiscards | Self::TxWait => CounterGroup::Tx,
            _ => CounterGroup::Other,
        }
    }
}

/// Everything a Counter Source resolved for one device/port.
#[derive(Debug, Clone)]
pub struct CounterHandles {
    pub tx_data: CounterHandle,
    pub rx_data: CounterHandle,
    pub tx_packets: CounterHandle,
    pub rx_packets: CounterHandle,
    /// Data counters count 4-byte words rather than bytes.
    pub words_mode: bool,
    pub optional: Vec<(OptionalCounter, CounterHandle)>,
    pub link_layer: Option<CounterHandle>,
    pub rate: Option<CounterHandle>,
}

impl CounterHandles {
    pub fn optional_in(&self, group: CounterGroup) -> impl Iterator<Item = &(OptionalCounter, CounterHandle)> {
        self.optional
            .iter()
            .filter(move |(counter, _)| counter.group() == group)
    }
}

/// One point-in-time capture of the four base counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterSnapshot {
    pub tx_data: u64,
    pub rx_data: u64,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub words_mode: bool,
    pub captured_at: Instant,
    pub wall_time: SystemTime,
}

impl CounterSnapshot {
    pub fn new(tx_data: u64, rx_data: u64, tx_packets: u64, rx_packets: u64, words_mode: bool) -> Self {
        Self {
            tx_data,
            rx_data,
            tx_packets,
            rx_packets,
            words_mode,
            captured_at: Instant::now(),
            wall_time: SystemTime::now(),
        }
    }

    #[must_use]
    pub fn captured(mut self, at: Instant) -> Self {
        self.captured_at = at;
        self
    }
}

/// One non-zero entry of a port's GID table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GidEntry {
    pub index: u32,
    pub gid: String,
    pub gid_type: String,
    pub ndev: String,
}

/// Source of raw link counters for a device.
pub trait CounterSource: Send + Sync {
    /// Devices whose first port is administratively ACTIVE.
    fn list_devices(&self) -> Result<Vec<String>>;
    fn resolve(&self, device: &DeviceId) -> Result<CounterHandles>;
    fn read_value(&self, handle: &CounterHandle) -> Result<u64>;
    fn read_text(&self, handle: &CounterHandle) -> Result<String>;
    fn gid_table(&self, device: &DeviceId) -> Result<Vec<GidEntry>>;
}

/// Reads the four required counters; any failure fails the whole snapshot.
pub fn read_snapshot(source: &dyn CounterSource, handles: &CounterHandles) -> Result<CounterSnapshot> {
    let tx_data = source.read_value(&handles.tx_data)?;
    let rx_data = source.read_value(&handles.rx_data)?;
    let tx_packets = source.read_value(&handles.tx_packets)?;
    let rx_packets = source.read_value(&handles.rx_packets)?;

    Ok(CounterSnapshot::new(
        tx_data,
        rx_data,
        tx_packets,
        rx_packets,
        handles.words_mode,
    ))
}

/// Parses counter file contents: the first whitespace-separated token as u64.
pub fn parse_counter(text: &str) -> Result<u64> {
    let token = text
        .split_whitespace()
        .next()
        .ok_or_else(|| IbwatchError::Parse("empty counter value".to_string()))?;

    token
        .parse()
        .map_err(|e| IbwatchError::Parse(format!("invalid counter value {token:?}: {e}")))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter("12345\n").unwrap(), 12345);
        assert_eq!(parse_counter("  18446744073709551615 ").unwrap(), u64::MAX);
        assert_eq!(parse_counter("42 extra").unwrap(), 42);
        assert!(parse_counter("").is_err());
        assert!(parse_counter("-1").is_err());
        assert!(parse_counter("abc").is_err());
    }

    #[test]
    fn test_optional_counter_groups() {
        assert_eq!(OptionalCounter::RxErrors.group(), CounterGroup::Rx);
        assert_eq!(OptionalCounter::TxWait.group(), CounterGroup::Tx);
        assert_eq!(OptionalCounter::LinkDowned.group(), CounterGroup::Other);
        assert!(OptionalCounter::ALL
            .iter()
            .all(|c| !c.candidates().is_empty()));
    }

    #[test]
    fn test_handle_name() {
        let handle = CounterHandle::new("/sys/class/infiniband/mlx5_0/ports/1/counters/port_xmit_data");
        assert_eq!(handle.name(), "port_xmit_data");
    }
}
