//! Windowed traffic features: accumulation, rotation, rolling history and
//! the per-window feature vector.

mod history;
mod pipeline;
pub mod stats;
mod window;

pub use history::{RollingHistory, DEFAULT_HISTORY_CAPACITY};
pub use pipeline::FeatureDeriver;
pub use window::{WindowAccumulator, WindowRotator, WindowSnapshot};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input order expected by the trained detector.
pub const DETECTOR_FEATURES: [&str; 8] = [
    "flow_throughput_bps",
    "ratio_ect1",
    "ratio_ce",
    "flag_cwr",
    "ratio_cwr",
    "tcp_win_mean",
    "iat_mean",
    "pkt_len_mean",
];

/// Features of one non-empty window.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Window close time
    pub timestamp: DateTime<Utc>,
    pub throughput_bps: f64,
    pub goodput_bps: f64,
    pub packet_rate_pps: f64,
    pub retransmission_rate: f64,
    /// Std of inter-arrival gaps (ms)
    pub jitter_ms: f64,
    /// Mean inter-arrival gap (s)
    pub iat_mean: f64,
    pub packet_size_mean: f64,
    pub packet_size_std: f64,
    pub burstiness: f64,
    pub rtt_mean: f64,
    pub rtt_std: f64,
    pub rtt_gradient: f64,
    pub ce_count: u64,
    pub ce_mark_rate: f64,
    pub ect1_count: u64,
    pub cwr_count: u64,
    pub ratio_ect1: f64,
    pub ratio_ce: f64,
    pub ratio_cwr: f64,
    pub tcp_win_mean: f64,
    pub rolling_mean_rtt: f64,
    pub rolling_slope_rtt: f64,
    pub l4s_queue_delay_ms: f64,
    pub classic_queue_delay_ms: f64,
}

impl FeatureVector {
    /// Detector inputs, ordered as [`DETECTOR_FEATURES`].
    pub fn detector_inputs(&self) -> [f64; 8] {
        [
            self.throughput_bps,
            self.ratio_ect1,
            self.ratio_ce,
            self.cwr_count as f64,
            self.ratio_cwr,
            self.tcp_win_mean,
            self.iat_mean,
            self.packet_size_mean,
        ]
    }
}
