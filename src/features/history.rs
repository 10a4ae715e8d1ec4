//! Bounded trend buffers for the rolling features.

use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Per-window RTT mean and throughput, oldest evicted first.
/// Only the window processor mutates it.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    capacity: usize,
    rtt: VecDeque<f64>,
    throughput: VecDeque<f64>,
}

impl Default for RollingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl RollingHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            rtt: VecDeque::with_capacity(capacity),
            throughput: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, rtt_mean: f64, throughput_bps: f64) {
        push_bounded(&mut self.rtt, rtt_mean, self.capacity);
        push_bounded(&mut self.throughput, throughput_bps, self.capacity);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.rtt.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rtt.is_empty()
    }

    pub fn last_rtt(&self) -> Option<f64> {
        self.rtt.back().copied()
    }

    /// RTT means in arrival order.
    pub fn rtt_series(&self) -> Vec<f64> {
        self.rtt.iter().copied().collect()
    }

    /// Throughputs in arrival order.
    pub fn throughput_series(&self) -> Vec<f64> {
        self.throughput.iter().copied().collect()
    }
}

fn push_bounded(buf: &mut VecDeque<f64>, value: f64, capacity: usize) {
    if buf.len() == capacity {
        buf.pop_front();
    }
    buf.push_back(value);
}
