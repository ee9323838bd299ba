use crate::device::CounterSnapshot;
use crate::error::Result;
use tracing::debug;

/// Lower bound for the elapsed time between two snapshots, in seconds.
pub const MIN_ELAPSED_SECS: f64 = 1e-9;

/// Per-direction rates derived from two consecutive snapshots.
///
/// All four values are non-negative: counter wraparound is corrected,
/// never reported as a negative rate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateSample {
    pub rx_bytes_per_sec: f64,
    pub tx_bytes_per_sec: f64,
    pub rx_packets_per_sec: f64,
    pub tx_packets_per_sec: f64,
}

impl RateSample {
    /// Computes rates from `prev` to `cur` over `elapsed_secs`.
    ///
    /// Each counter wraps independently at 2^64. Byte deltas are scaled by 4
    /// when the data counters are in words; packet deltas never are.
    pub fn between(prev: &CounterSnapshot, cur: &CounterSnapshot, elapsed_secs: f64) -> Self {
        let elapsed = if elapsed_secs.is_finite() {
            elapsed_secs.max(MIN_ELAPSED_SECS)
        } else {
            MIN_ELAPSED_SECS
        };
        let byte_scale = if cur.words_mode { 4.0 } else { 1.0 };

        let tx_bytes = counter_delta(prev.tx_data, cur.tx_data) as f64 * byte_scale;
        let rx_bytes = counter_delta(prev.rx_data, cur.rx_data) as f64 * byte_scale;
        let tx_packets = counter_delta(prev.tx_packets, cur.tx_packets) as f64;
        let rx_packets = counter_delta(prev.rx_packets, cur.rx_packets) as f64;

        Self {
            rx_bytes_per_sec: rx_bytes / elapsed,
            tx_bytes_per_sec: tx_bytes / elapsed,
            rx_packets_per_sec: rx_packets / elapsed,
            tx_packets_per_sec: tx_packets / elapsed,
        }
    }
}

/// Difference between two readings of a monotonically increasing 64-bit
/// counter. A smaller `current` means the counter wrapped past 2^64, giving
/// `current + (2^64 - previous)`.
pub fn counter_delta(previous: u64, current: u64) -> u64 {
    if current >= previous {
        current - previous
    } else {
        current.wrapping_sub(previous)
    }
}

/// Result of feeding one read attempt into the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// A fresh sample was computed.
    Updated(RateSample),
    /// The read failed; the previous sample is carried forward unchanged.
    Frozen(RateSample),
}

/// Turns a stream of snapshots into rate samples for one device.
#[derive(Debug, Clone)]
pub struct SampleEngine {
    previous: CounterSnapshot,
    last: RateSample,
}

impl SampleEngine {
    pub fn new(initial: CounterSnapshot) -> Self {
        Self {
            previous: initial,
            last: RateSample::default(),
        }
    }

    /// Advances with the outcome of one read attempt.
    pub fn advance(&mut self, reading: Result<CounterSnapshot>) -> SampleOutcome {
        match reading {
            Ok(current) => {
                let elapsed = current
                    .captured_at
                    .saturating_duration_since(self.previous.captured_at)
                    .as_secs_f64();
                self.last = RateSample::between(&self.previous, &current, elapsed);
                self.previous = current;
                SampleOutcome::Updated(self.last)
            }
            Err(e) => {
                debug!(error = %e, "counter read failed, holding previous rates");
                SampleOutcome::Frozen(self.last)
            }
        }
    }

    pub fn last_sample(&self) -> RateSample {
        self.last
    }

    pub fn last_snapshot(&self) -> &CounterSnapshot {
        &self.previous
    }
}
