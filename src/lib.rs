//! L4S IDS: windowed traffic feature extraction for L4S congestion-signal
//! abuse, in two roles sharing one pipeline.
//!
//! Modular structure:
//! - [`collectors`] — Capture source (tshark / stdin) and per-packet record parsing
//! - [`features`] — Window accumulation, rotation, rolling history and feature derivation
//! - [`labeling`] — Attacker-share window labels (collector role)
//! - [`model`] — Trained classifier (ONNX or JSON decision tree, detector role)
//! - [`storage`] — Labeled dataset, alert lines and the verdict journal
//! - [`queue`] — Optional queue-delay figures from the shaping side
//! - [`pipeline`] — Interval clock, per-window processing and shutdown
//! - [`logging`] — Structured logging

pub mod config;
pub mod collectors;
pub mod error;
pub mod features;
pub mod labeling;
pub mod model;
pub mod storage;
pub mod queue;
pub mod pipeline;
pub mod logging;

pub use config::{IdsConfig, Mode};
pub use collectors::{CaptureSource, ObservationAdapter, PacketObservation};
pub use error::{IdsError, Result};
pub use features::{FeatureDeriver, FeatureVector, RollingHistory, WindowRotator, WindowSnapshot};
pub use labeling::{Label, LabelAssigner};
pub use model::{load_classifier, Classifier};
pub use pipeline::{Pipeline, RunSummary};
pub use logging::StructuredLogger;
