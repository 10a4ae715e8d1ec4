//! Runtime configuration. Loaded once at startup from a JSON file.

use crate::collectors::CaptureLayout;
use crate::error::{IdsError, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which role the pipeline plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Label windows from attacker attribution and append them to the dataset.
    Collect,
    /// Classify windows with a trained model and emit alerts.
    Detect,
}

impl std::str::FromStr for Mode {
    type Err = IdsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "collect" | "collector" => Ok(Mode::Collect),
            "detect" | "detector" => Ok(Mode::Detect),
            other => Err(IdsError::Config(format!("unknown mode '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdsConfig {
    pub mode: Mode,
    /// Working directory for the alert journal
    pub data_dir: PathBuf,
    pub capture: CaptureConfig,
    pub window: WindowConfig,
    pub labeling: LabelingConfig,
    pub model: ModelConfig,
    pub sink: SinkConfig,
    pub queue: QueueConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSourceKind {
    /// Spawn tshark on `interface`
    Tshark,
    /// Read records piped in by an external capture process
    Stdin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub source: CaptureSourceKind,
    /// Bottleneck (WAN-side) interface where the queue builds up
    pub interface: String,
    pub tshark_path: PathBuf,
    /// Field layout of incoming records; defaults to the mode's layout
    pub layout: Option<CaptureLayout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Aggregation window length (seconds)
    pub interval_secs: f64,
    /// Entries kept per rolling history series
    pub history_capacity: usize,
    /// How long the final window may take to flush on shutdown
    pub shutdown_grace_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelingConfig {
    /// Sources whose bytes mark a window as attack traffic
    pub attacker_addrs: Vec<IpAddr>,
    /// Attacker share of window bytes above which the label is 1 (strict)
    pub attack_byte_share: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Trained decision procedure (`.onnx` or `.json` tree export)
    pub path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub dataset_path: PathBuf,
    pub alert_format: AlertFormat,
    /// Keep a SQLite journal of every verdict under `data_dir`
    pub alert_journal: bool,
    /// Journal rows older than this are pruned at startup (0 keeps all)
    pub journal_retention_days: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Key/value file maintained by the traffic-shaping side
    pub stats_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Collect,
            data_dir: PathBuf::from(".l4s-ids"),
            capture: CaptureConfig::default(),
            window: WindowConfig::default(),
            labeling: LabelingConfig::default(),
            model: ModelConfig::default(),
            sink: SinkConfig::default(),
            queue: QueueConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: CaptureSourceKind::Tshark,
            interface: "enp0s16".to_string(),
            tshark_path: PathBuf::from("tshark"),
            layout: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1.0,
            history_capacity: 10,
            shutdown_grace_ms: 2000,
        }
    }
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            attacker_addrs: vec![IpAddr::V4(Ipv4Addr::new(192, 168, 54, 10))],
            attack_byte_share: 0.10,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("l4s_detection_model.onnx"),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("dataset_l4s_attack.csv"),
            alert_format: AlertFormat::Text,
            alert_journal: true,
            journal_retention_days: 30,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl WindowConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl IdsConfig {
    /// Load from JSON file if present; otherwise return defaults.
    /// A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str::<IdsConfig>(&data)
                .map_err(|e| IdsError::Config(format!("{}: {}", path.display(), e)))?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let w = &self.window;
        let interval = Duration::try_from_secs_f64(w.interval_secs).ok();
        if !w.interval_secs.is_finite() || interval.map_or(true, |d| d.is_zero()) {
            return Err(IdsError::Config(format!(
                "window.interval_secs must be a positive duration, got {}",
                w.interval_secs
            )));
        }
        if w.history_capacity == 0 {
            return Err(IdsError::Config("window.history_capacity must be at least 1".into()));
        }
        let share = self.labeling.attack_byte_share;
        if !(share > 0.0 && share <= 1.0) {
            return Err(IdsError::Config(format!(
                "labeling.attack_byte_share must be in (0, 1], got {}",
                share
            )));
        }
        Ok(())
    }

    /// Field layout the capture source produces for this mode.
    pub fn capture_layout(&self) -> CaptureLayout {
        self.capture.layout.unwrap_or(match self.mode {
            Mode::Collect => CaptureLayout::Collector,
            Mode::Detect => CaptureLayout::Detector,
        })
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("alerts.db")
    }
}
