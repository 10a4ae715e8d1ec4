//! ONNX Runtime inference. Input: `[1, 8]` f32 in detector feature order.
//! Output: an int64 label tensor (skl2onnx classifiers) or an f32 score,
//! where a score of 0.5 or more is an attack.

use super::{checked_inputs, Classifier};
use crate::error::{IdsError, Result};
use crate::features::{FeatureVector, DETECTOR_FEATURES};
use crate::labeling::Label;
use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

pub struct OnnxClassifier {
    session: Mutex<Session>,
    output_name: String,
    source: PathBuf,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self> {
        let fail = |reason: String| IdsError::ModelLoad { path: path.to_path_buf(), reason };

        let session = Session::builder()
            .map_err(|e| fail(format!("session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| fail(format!("optimization level: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| fail(e.to_string()))?;

        if session.inputs.is_empty() {
            return Err(fail("model declares no inputs".into()));
        }
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| fail("model declares no outputs".into()))?;

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            source: path.to_path_buf(),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn classify(&self, features: &FeatureVector) -> Result<Label> {
        let inputs = checked_inputs(features)?;
        let row: Vec<f32> = inputs.iter().map(|&v| v as f32).collect();
        let arr = Array2::from_shape_vec((1, DETECTOR_FEATURES.len()), row)
            .map_err(|e| IdsError::Classify(format!("input shape: {}", e)))?;
        let tensor = Value::from_array(arr).map_err(|e| IdsError::Classify(format!("tensor: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| IdsError::Classify(format!("inference: {}", e)))?;
        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| IdsError::Classify(format!("missing output {}", self.output_name)))?;

        if let Ok((_, labels)) = output.try_extract_tensor::<i64>() {
            return match labels.first().copied() {
                Some(1) => Ok(Label::Attack),
                Some(0) => Ok(Label::Benign),
                other => Err(IdsError::Classify(format!("unexpected label {:?}", other))),
            };
        }
        let (_, scores) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| IdsError::Classify(format!("output: {}", e)))?;
        match scores.first().copied() {
            Some(s) if s.is_finite() => Ok(if s >= 0.5 { Label::Attack } else { Label::Benign }),
            other => Err(IdsError::Classify(format!("unexpected score {:?}", other))),
        }
    }
}
