//! Window snapshot → feature vector.

use super::stats::{linear_slope, mean, sorted_gaps, std_dev};
use super::{FeatureVector, RollingHistory, WindowSnapshot};
use crate::queue::{QueueStats, CLASSIC_QUEUE_DELAY_MS, L4S_QUEUE_DELAY_MS};

/// Minimum RTT history length before a slope is fitted.
const SLOPE_MIN_POINTS: usize = 4;

pub struct FeatureDeriver {
    interval_secs: f64,
}

impl FeatureDeriver {
    pub fn new(interval_secs: f64) -> Self {
        Self { interval_secs }
    }

    pub fn interval_secs(&self) -> f64 {
        self.interval_secs
    }

    /// Derive the window's features and fold its RTT mean and throughput
    /// into `history`. Empty windows yield nothing and leave history alone.
    pub fn derive(
        &self,
        snapshot: &WindowSnapshot,
        history: &mut RollingHistory,
        queue: &QueueStats,
    ) -> Option<FeatureVector> {
        if snapshot.is_empty() {
            return None;
        }
        let secs = self.interval_secs;
        let packets = snapshot.packet_count as f64;

        let throughput_bps = snapshot.total_bytes as f64 * 8.0 / secs;
        let goodput_bps = snapshot.useful_bytes as f64 * 8.0 / secs;

        let gaps = sorted_gaps(&snapshot.arrival_times);
        let sizes: Vec<f64> = snapshot.packet_sizes.iter().map(|&s| s as f64).collect();
        let windows: Vec<f64> = snapshot.window_sizes.iter().map(|&w| w as f64).collect();

        let rtt_mean = mean(&snapshot.rtt_samples);
        let rtt_std = std_dev(&snapshot.rtt_samples);

        // Compared against the history as it stood before this window.
        let rtt_gradient = history.last_rtt().map(|prev| rtt_mean - prev).unwrap_or(0.0);

        history.push(rtt_mean, throughput_bps);

        let rtt_series = history.rtt_series();
        let rolling_mean_rtt = mean(&rtt_series);
        let rolling_slope_rtt = if rtt_series.len() >= SLOPE_MIN_POINTS {
            linear_slope(&rtt_series)
        } else {
            0.0
        };
        let throughput_mean = mean(&history.throughput_series());
        let burstiness = if throughput_mean > 0.0 {
            throughput_bps / throughput_mean
        } else {
            0.0
        };

        Some(FeatureVector {
            timestamp: snapshot.closed_at,
            throughput_bps,
            goodput_bps,
            packet_rate_pps: packets / secs,
            retransmission_rate: snapshot.retransmissions as f64 / packets,
            jitter_ms: std_dev(&gaps) * 1000.0,
            iat_mean: mean(&gaps),
            packet_size_mean: mean(&sizes),
            packet_size_std: std_dev(&sizes),
            burstiness,
            rtt_mean,
            rtt_std,
            rtt_gradient,
            ce_count: snapshot.ce_marks,
            ce_mark_rate: snapshot.ce_marks as f64 / secs,
            ect1_count: snapshot.ect1_marks,
            cwr_count: snapshot.cwr_flags,
            ratio_ect1: snapshot.ect1_marks as f64 / packets,
            ratio_ce: snapshot.ce_marks as f64 / packets,
            ratio_cwr: snapshot.cwr_flags as f64 / packets,
            tcp_win_mean: mean(&windows),
            rolling_mean_rtt,
            rolling_slope_rtt,
            l4s_queue_delay_ms: queue.get(L4S_QUEUE_DELAY_MS),
            classic_queue_delay_ms: queue.get(CLASSIC_QUEUE_DELAY_MS),
        })
    }
}
