//! Per-device sampling state and the set of monitored devices.

use crate::{
    device::{
        read_snapshot, CounterHandle, CounterHandles, CounterSnapshot, CounterSource, DeviceId,
    },
    error::Result,
    history::HistorySeries,
    stats::{RateSample, SampleEngine, SampleOutcome},
    units::parse_rate_gbps,
};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Consecutive failed reads before a device is reported as stale.
pub const DEFAULT_STALE_AFTER: u32 = 5;

/// What the tick loop allows the monitor set to do this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickControl {
    pub paused: bool,
    pub fast_switch: bool,
}

impl TickControl {
    pub fn should_sample(self) -> bool {
        !self.paused && !self.fast_switch
    }
}

/// One successful sample, as handed to the CSV sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRecord {
    pub device_index: usize,
    pub rate: RateSample,
    pub wall_time: SystemTime,
}

/// Everything tracked for one monitored device/port.
#[derive(Debug)]
pub struct DeviceState {
    id: DeviceId,
    handles: CounterHandles,
    engine: SampleEngine,
    link_layer: Option<String>,
    link_rate: Option<String>,
    link_rate_gbps: f64,
    rx_history: HistorySeries,
    tx_history: HistorySeries,
    consecutive_failures: u32,
    stale: bool,
}

impl DeviceState {
    /// Resolves the device and takes the priming snapshot.
    ///
    /// Both failures are fatal configuration errors for the caller.
    pub fn open(source: &dyn CounterSource, id: DeviceId) -> Result<Self> {
        let handles = source.resolve(&id)?;
        let initial = read_snapshot(source, &handles)?;

        let read_attr = |handle: &Option<CounterHandle>| {
            handle
                .as_ref()
                .and_then(|h| source.read_text(h).ok())
                .filter(|text| !text.is_empty())
        };
        let link_layer = read_attr(&handles.link_layer);
        let link_rate = read_attr(&handles.rate);
        let link_rate_gbps = parse_rate_gbps(link_rate.as_deref());

        debug!(device = %id, link_rate_gbps, "device opened");

        Ok(Self {
            id,
            handles,
            engine: SampleEngine::new(initial),
            link_layer,
            link_rate,
            link_rate_gbps,
            rx_history: HistorySeries::default(),
            tx_history: HistorySeries::default(),
            consecutive_failures: 0,
            stale: false,
        })
    }

    /// Attempts one read. Returns the new sample on success.
    pub fn sample(&mut self, source: &dyn CounterSource, stale_after: u32) -> Option<RateSample> {
        match self.engine.advance(read_snapshot(source, &self.handles)) {
            SampleOutcome::Updated(rate) => {
                if self.stale {
                    info!(device = %self.id, "counters readable again");
                }
                self.consecutive_failures = 0;
                self.stale = false;
                self.rx_history.append(rate.rx_bytes_per_sec);
                self.tx_history.append(rate.tx_bytes_per_sec);
                Some(rate)
            }
            SampleOutcome::Frozen(_) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                if stale_after > 0 && !self.stale && self.consecutive_failures >= stale_after {
                    warn!(
                        device = %self.id,
                        failures = self.consecutive_failures,
                        "counters unreadable, marking stale"
                    );
                    self.stale = true;
                }
                None
            }
        }
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn handles(&self) -> &CounterHandles {
        &self.handles
    }

    pub fn last_sample(&self) -> RateSample {
        self.engine.last_sample()
    }

    pub fn last_snapshot(&self) -> &CounterSnapshot {
        self.engine.last_snapshot()
    }

    pub fn last_wall_time(&self) -> SystemTime {
        self.engine.last_snapshot().wall_time
    }

    pub fn link_layer(&self) -> Option<&str> {
        self.link_layer.as_deref()
    }

    pub fn link_rate(&self) -> Option<&str> {
        self.link_rate.as_deref()
    }

    /// Parsed link rate in Gb/s, 0 when unknown.
    pub fn link_rate_gbps(&self) -> f64 {
        self.link_rate_gbps
    }

    pub fn rx_history(&self) -> &HistorySeries {
        &self.rx_history
    }

    pub fn tx_history(&self) -> &HistorySeries {
        &self.tx_history
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

/// All monitored devices, advanced together once per tick.
#[derive(Debug)]
pub struct MonitorSet {
    devices: Vec<DeviceState>,
    stale_after: u32,
}

impl MonitorSet {
    /// Opens every device in order; the first failure aborts.
    pub fn open(source: &dyn CounterSource, ids: Vec<DeviceId>, stale_after: u32) -> Result<Self> {
        let devices = ids
            .into_iter()
            .map(|id| DeviceState::open(source, id))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            devices,
            stale_after,
        })
    }

    /// Samples every device in sequence unless the tick is paused or is a
    /// view-switch redraw. Returns the successful samples.
    pub fn tick(&mut self, source: &dyn CounterSource, control: TickControl) -> Vec<SampleRecord> {
        if !control.should_sample() {
            return Vec::new();
        }

        let stale_after = self.stale_after;
        self.devices
            .iter_mut()
            .enumerate()
            .filter_map(|(device_index, device)| {
                device.sample(source, stale_after).map(|rate| SampleRecord {
                    device_index,
                    rate,
                    wall_time: device.last_wall_time(),
                })
            })
            .collect()
    }

    pub fn devices(&self) -> &[DeviceState] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn stale_after(&self) -> u32 {
        self.stale_after
    }
}
