use crate::{
    device::{
        parse_counter, CounterHandle, CounterHandles, CounterSource, DeviceId, GidEntry,
        OptionalCounter,
    },
    error::{IbwatchError, Result},
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const TX_DATA_CANDIDATES: &[&str] = &["port_xmit_data", "tx_bytes"];
const RX_DATA_CANDIDATES: &[&str] = &["port_rcv_data", "rx_bytes"];
const TX_PACKETS_CANDIDATES: &[&str] = &["port_xmit_packets", "port_xmit_pkts", "tx_packets"];
const RX_PACKETS_CANDIDATES: &[&str] = &["port_rcv_packets", "port_rcv_pkts", "rx_packets"];

/// GID table slots probed per port.
const MAX_GIDS: u32 = 256;

/// Counter Source backed by the Linux InfiniBand device class tree.
pub struct SysfsSource {
    root: PathBuf,
}

impl SysfsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn port_base(&self, device: &DeviceId) -> PathBuf {
        self.root
            .join(&device.name)
            .join("ports")
            .join(device.port.to_string())
    }

    fn first_existing(base: &Path, names: &[&str]) -> Option<CounterHandle> {
        names
            .iter()
            .map(|name| base.join(name))
            .find(|path| path.exists())
            .map(CounterHandle::new)
    }

    fn read_first_line(path: &Path) -> Result<String> {
        let content = fs::read_to_string(path)?;
        Ok(content.lines().next().unwrap_or_default().trim().to_string())
    }

    fn is_active(&self, name: &str) -> bool {
        let state = self.root.join(name).join("ports").join("1").join("state");
        fs::read_to_string(state)
            .map(|s| s.contains("ACTIVE"))
            .unwrap_or(false)
    }
}

fn gid_is_zero(gid: &str) -> bool {
    gid.chars().filter(|c| *c != ':').all(|c| c == '0')
}

impl CounterSource for SysfsSource {
    fn list_devices(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            debug!(root = %self.root.display(), "device class tree not present");
            return Ok(Vec::new());
        }

        let mut devices = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if self.is_active(&name) {
                devices.push(name);
            }
        }

        devices.sort();
        Ok(devices)
    }

    fn resolve(&self, device: &DeviceId) -> Result<CounterHandles> {
        let port_base = self.port_base(device);
        let counters_base = port_base.join("counters");
        if !counters_base.is_dir() {
            return Err(IbwatchError::DeviceNotFound(format!(
                "counters path not found: {}",
                counters_base.display()
            )));
        }

        let tx_data = Self::first_existing(&counters_base, TX_DATA_CANDIDATES);
        let rx_data = Self::first_existing(&counters_base, RX_DATA_CANDIDATES);
        let tx_packets = Self::first_existing(&counters_base, TX_PACKETS_CANDIDATES);
        let rx_packets = Self::first_existing(&counters_base, RX_PACKETS_CANDIDATES);

        let (Some(tx_data), Some(rx_data), Some(tx_packets), Some(rx_packets)) =
            (&tx_data, &rx_data, &tx_packets, &rx_packets)
        else {
            let missing = [
                ("tx_data", tx_data.is_none()),
                ("rx_data", rx_data.is_none()),
                ("tx_pkts", tx_packets.is_none()),
                ("rx_pkts", rx_packets.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();

            return Err(IbwatchError::MissingCounters {
                device: device.to_string(),
                missing,
            });
        };

        // port_*_data count 4-byte words
        let words_mode = tx_data.name() == "port_xmit_data" || rx_data.name() == "port_rcv_data";

        let optional = OptionalCounter::ALL
            .iter()
            .filter_map(|counter| {
                Self::first_existing(&counters_base, counter.candidates())
                    .map(|handle| (*counter, handle))
            })
            .collect::<Vec<_>>();

        debug!(
            device = %device,
            words_mode,
            optional = optional.len(),
            "resolved counters"
        );

        Ok(CounterHandles {
            tx_data: tx_data.clone(),
            rx_data: rx_data.clone(),
            tx_packets: tx_packets.clone(),
            rx_packets: rx_packets.clone(),
            words_mode,
            optional,
            link_layer: Self::first_existing(&port_base, &["link_layer"]),
            rate: Self::first_existing(&port_base, &["rate"]),
        })
    }

    fn read_value(&self, handle: &CounterHandle) -> Result<u64> {
        let content = fs::read_to_string(handle.path())?;
        parse_counter(&content)
    }

    fn read_text(&self, handle: &CounterHandle) -> Result<String> {
        Self::read_first_line(handle.path())
    }

    fn gid_table(&self, device: &DeviceId) -> Result<Vec<GidEntry>> {
        let port_base = self.port_base(device);
        let gids = port_base.join("gids");
        let types = port_base.join("gid_attrs").join("types");
        let ndevs = port_base.join("gid_attrs").join("ndevs");

        let mut entries = Vec::new();
        for index in 0..MAX_GIDS {
            let Ok(gid) = Self::read_first_line(&gids.join(index.to_string())) else {
                continue;
            };
            if gid.is_empty() || gid_is_zero(&gid) {
                continue;
            }

            entries.push(GidEntry {
                index,
                gid,
                gid_type: Self::read_first_line(&types.join(index.to_string())).unwrap_or_default(),
                ndev: Self::read_first_line(&ndevs.join(index.to_string())).unwrap_or_default(),
            });
        }

        Ok(entries)
    }
}
