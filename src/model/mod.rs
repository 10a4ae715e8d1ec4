//! Trained decision procedure behind a narrow capability: one feature vector
//! in, one label out. The pipeline never sees the model's representation.

mod onnx;
mod tree;

pub use onnx::OnnxClassifier;
pub use tree::TreeClassifier;

use crate::error::{IdsError, Result};
use crate::features::FeatureVector;
use crate::labeling::Label;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;

    /// Binary verdict for one window. An error leaves the window unclassified.
    fn classify(&self, features: &FeatureVector) -> Result<Label>;
}

/// Verdict plus the window it was produced from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Label,
    pub features: FeatureVector,
}

/// Load the artifact at `path`, picking the format by extension.
/// There is no fallback: a detector must not run without its model.
pub fn load_classifier(path: &Path) -> Result<Box<dyn Classifier>> {
    if !path.is_file() {
        return Err(IdsError::ModelLoad {
            path: path.to_path_buf(),
            reason: "file not found".to_string(),
        });
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let classifier: Box<dyn Classifier> = match ext.as_str() {
        "json" => Box::new(TreeClassifier::load(path)?),
        _ => Box::new(OnnxClassifier::load(path)?),
    };
    info!(path = %path.display(), kind = classifier.name(), "model loaded");
    Ok(classifier)
}

/// Detector inputs with a finiteness check shared by every implementation.
pub(crate) fn checked_inputs(features: &FeatureVector) -> Result<[f64; 8]> {
    let inputs = features.detector_inputs();
    if let Some(pos) = inputs.iter().position(|v| !v.is_finite()) {
        return Err(IdsError::Classify(format!(
            "non-finite input {}",
            crate::features::DETECTOR_FEATURES[pos]
        )));
    }
    Ok(inputs)
}
