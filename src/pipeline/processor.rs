//! Per-window processing: derive features, then label and persist
//! (collector) or classify and alert (detector).

use crate::error::Result;
use crate::features::{FeatureDeriver, FeatureVector, RollingHistory, WindowSnapshot};
use crate::labeling::{Label, LabelAssigner};
use crate::model::{ClassificationResult, Classifier};
use crate::queue::QueueStatsSource;
use crate::storage::{AlertSink, DatasetWriter};
use tracing::{info, warn};

pub enum Stage {
    Collect {
        labeler: LabelAssigner,
        dataset: DatasetWriter,
    },
    Detect {
        classifier: Box<dyn Classifier>,
        alerts: AlertSink,
    },
}

#[derive(Debug, Clone)]
pub enum WindowOutcome {
    /// Collector: row appended to the dataset.
    Labeled { label: Label, features: FeatureVector },
    /// Detector: verdict produced and alerted.
    Classified(ClassificationResult),
    /// Detector: the classifier failed on this window. Nothing was alerted.
    Unclassified { features: FeatureVector, reason: String },
}

pub struct WindowProcessor {
    deriver: FeatureDeriver,
    history: RollingHistory,
    stage: Stage,
    queue: Box<dyn QueueStatsSource>,
}

impl WindowProcessor {
    pub fn new(
        deriver: FeatureDeriver,
        history: RollingHistory,
        stage: Stage,
        queue: Box<dyn QueueStatsSource>,
    ) -> Self {
        Self {
            deriver,
            history,
            stage,
            queue,
        }
    }

    pub fn history(&self) -> &RollingHistory {
        &self.history
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// `Ok(None)` for an empty window. An `Err` means the sink failed and
    /// the window's output was lost; later windows are unaffected.
    pub fn process(&mut self, snapshot: &WindowSnapshot) -> Result<Option<WindowOutcome>> {
        if snapshot.is_empty() {
            return Ok(None);
        }
        let queue = self.queue.sample();
        let Some(features) = self.deriver.derive(snapshot, &mut self.history, &queue) else {
            return Ok(None);
        };

        match &mut self.stage {
            Stage::Collect { labeler, dataset } => {
                let label = labeler.assign(snapshot);
                dataset.append(label, &features)?;
                info!(
                    label = label.as_u8(),
                    rtt_ms = features.rtt_mean,
                    throughput_mbps = features.throughput_bps / 1e6,
                    packets = snapshot.packet_count,
                    "window labeled"
                );
                Ok(Some(WindowOutcome::Labeled { label, features }))
            }
            Stage::Detect { classifier, alerts } => match classifier.classify(&features) {
                Ok(label) => {
                    let result = ClassificationResult { label, features };
                    alerts.emit(&result)?;
                    Ok(Some(WindowOutcome::Classified(result)))
                }
                Err(e) => {
                    warn!(error = %e, "window left unclassified");
                    Ok(Some(WindowOutcome::Unclassified {
                        features,
                        reason: e.to_string(),
                    }))
                }
            },
        }
    }
}
