//! Queue occupancy / delay figures reported by the traffic-shaping side.
//!
//! The figures come from an external collaborator as key/value pairs. How
//! it extracts them from the qdisc is its own business; a key it does not
//! report reads as 0, and a failed read never holds up a window.

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

pub const L4S_QUEUE_DELAY_MS: &str = "l4s_queue_delay_ms";
pub const CLASSIC_QUEUE_DELAY_MS: &str = "classic_queue_delay_ms";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueStats {
    values: BTreeMap<String, f64>,
}

impl QueueStats {
    pub fn get(&self, key: &str) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse `key value` or `key=value` lines; blank lines, `#` comments and
    /// non-numeric values are skipped.
    pub fn parse(text: &str) -> Self {
        let mut stats = QueueStats::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = match line.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => match line.split_once(char::is_whitespace) {
                    Some((k, v)) => (k.trim(), v.trim()),
                    None => continue,
                },
            };
            if let Ok(v) = value.parse::<f64>() {
                if v.is_finite() {
                    stats.insert(key, v);
                }
            }
        }
        stats
    }
}

/// Supplies one sample of queue statistics per window.
pub trait QueueStatsSource: Send {
    fn sample(&self) -> QueueStats;
}

/// No shaping collaborator: every figure reads as 0.
#[derive(Debug, Default)]
pub struct NoQueueStats;

impl QueueStatsSource for NoQueueStats {
    fn sample(&self) -> QueueStats {
        QueueStats::default()
    }
}

/// Reads the latest figures from a file the collaborator rewrites.
#[derive(Debug)]
pub struct FileQueueStats {
    path: PathBuf,
}

impl FileQueueStats {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl QueueStatsSource for FileQueueStats {
    fn sample(&self) -> QueueStats {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => QueueStats::parse(&text),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "queue stats unavailable");
                QueueStats::default()
            }
        }
    }
}

pub fn source_from_config(config: &crate::config::QueueConfig) -> Box<dyn QueueStatsSource> {
    match &config.stats_path {
        Some(path) => Box::new(FileQueueStats::new(path.clone())),
        None => Box::new(NoQueueStats),
    }
}
