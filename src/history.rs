use std::collections::VecDeque;

/// Number of samples retained per series.
pub const HISTORY_CAPACITY: usize = 4096;

/// Bounded, oldest-first time series of one metric.
///
/// Backed by a ring buffer: once full, each append evicts the oldest value
/// in O(1).
#[derive(Debug, Clone)]
pub struct HistorySeries {
    values: VecDeque<f64>,
    capacity: usize,
}

impl Default for HistorySeries {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl HistorySeries {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// The last `min(n, len)` values, oldest first.
    pub fn window(&self, n: usize) -> Vec<f64> {
        let start = self.values.len().saturating_sub(n);
        self.values.range(start..).copied().collect()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// At least two samples are needed before a chart can be drawn.
    pub fn is_plottable(&self) -> bool {
        self.values.len() >= 2
    }
}
