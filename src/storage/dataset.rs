//! Append-only labeled dataset (CSV). One row per non-empty window; the
//! header is written once, when the file is created or found empty.

use crate::error::Result;
use crate::features::FeatureVector;
use crate::labeling::Label;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Flat dataset row. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    pub timestamp: DateTime<Utc>,
    pub label: u8,
    pub throughput_bps: f64,
    pub goodput_bps: f64,
    pub packet_rate_pps: f64,
    pub retransmission_rate: f64,
    pub jitter_ms: f64,
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

impl DatasetRow {
    pub fn new(label: Label, f: &FeatureVector) -> Self {
        Self {
            timestamp: f.timestamp,
            label: label.as_u8(),
            throughput_bps: f.throughput_bps,
            goodput_bps: f.goodput_bps,
            packet_rate_pps: f.packet_rate_pps,
            retransmission_rate: f.retransmission_rate,
            jitter_ms: f.jitter_ms,
            iat_mean: f.iat_mean,
            packet_size_mean: f.packet_size_mean,
            packet_size_std: f.packet_size_std,
            burstiness: f.burstiness,
            rtt_mean: f.rtt_mean,
            rtt_std: f.rtt_std,
            rtt_gradient: f.rtt_gradient,
            ce_count: f.ce_count,
            ce_mark_rate: f.ce_mark_rate,
            ect1_count: f.ect1_count,
            cwr_count: f.cwr_count,
            ratio_ect1: f.ratio_ect1,
            ratio_ce: f.ratio_ce,
            ratio_cwr: f.ratio_cwr,
            tcp_win_mean: f.tcp_win_mean,
            rolling_mean_rtt: f.rolling_mean_rtt,
            rolling_slope_rtt: f.rolling_slope_rtt,
            l4s_queue_delay_ms: f.l4s_queue_delay_ms,
            classic_queue_delay_ms: f.classic_queue_delay_ms,
        }
    }

    pub fn label(&self) -> Option<Label> {
        Label::from_u8(self.label)
    }

    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            timestamp: self.timestamp,
            throughput_bps: self.throughput_bps,
            goodput_bps: self.goodput_bps,
            packet_rate_pps: self.packet_rate_pps,
            retransmission_rate: self.retransmission_rate,
            jitter_ms: self.jitter_ms,
            iat_mean: self.iat_mean,
            packet_size_mean: self.packet_size_mean,
            packet_size_std: self.packet_size_std,
            burstiness: self.burstiness,
            rtt_mean: self.rtt_mean,
            rtt_std: self.rtt_std,
            rtt_gradient: self.rtt_gradient,
            ce_count: self.ce_count,
            ce_mark_rate: self.ce_mark_rate,
            ect1_count: self.ect1_count,
            cwr_count: self.cwr_count,
            ratio_ect1: self.ratio_ect1,
            ratio_ce: self.ratio_ce,
            ratio_cwr: self.ratio_cwr,
            tcp_win_mean: self.tcp_win_mean,
            rolling_mean_rtt: self.rolling_mean_rtt,
            rolling_slope_rtt: self.rolling_slope_rtt,
            l4s_queue_delay_ms: self.l4s_queue_delay_ms,
            classic_queue_delay_ms: self.classic_queue_delay_ms,
        }
    }
}

pub struct DatasetWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: u64,
}

impl DatasetWriter {
    /// Open `path` for appending, creating it (and its parent) if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    /// Append one row and flush it to disk.
    pub fn append(&mut self, label: Label, features: &FeatureVector) -> Result<()> {
        self.writer.serialize(DatasetRow::new(label, features))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written by this writer (not counting rows already in the file).
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read a dataset back, e.g. for training or inspection.
pub fn read_dataset(path: &Path) -> Result<Vec<DatasetRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<DatasetRow>, _>>()?;
    Ok(rows)
}
