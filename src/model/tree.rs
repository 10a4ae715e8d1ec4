//! Decision tree exported as JSON from a fitted scikit-learn classifier:
//!
//! ```text
//! { "feature_names": [...], "classes": [0, 1],
//!   "children_left": [...], "children_right": [...],
//!   "feature": [...], "threshold": [...], "value": [...] }
//! ```
//!
//! The arrays are `clf.tree_.*` as lists. Leaves have both children at -1.
//! Splits send `x <= threshold` left, with `x` rounded to f32 as sklearn does.

use super::{checked_inputs, Classifier};
use crate::error::{IdsError, Result};
use crate::features::{FeatureVector, DETECTOR_FEATURES};
use crate::labeling::Label;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const TREE_LEAF: i64 = -1;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NodeValue {
    Flat(Vec<f64>),
    /// sklearn layout: `[n_outputs][n_classes]`
    Nested(Vec<Vec<f64>>),
}

impl NodeValue {
    fn class_weights(&self) -> Option<&[f64]> {
        match self {
            NodeValue::Flat(v) => Some(v.as_slice()),
            NodeValue::Nested(v) => v.first().map(|w| w.as_slice()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TreeExport {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    #[serde(default)]
    classes: Option<Vec<i64>>,
    children_left: Vec<i64>,
    children_right: Vec<i64>,
    feature: Vec<i64>,
    threshold: Vec<f64>,
    value: Vec<NodeValue>,
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Split { input: usize, threshold: f64, left: usize, right: usize },
    Leaf(Label),
}

#[derive(Debug)]
pub struct TreeClassifier {
    nodes: Vec<Node>,
    source: PathBuf,
}

impl TreeClassifier {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| load_error(path, e.to_string()))?;
        Self::from_json(&text, path)
    }

    pub fn from_json(text: &str, source: &Path) -> Result<Self> {
        let export: TreeExport =
            serde_json::from_str(text).map_err(|e| load_error(source, e.to_string()))?;
        let nodes = build_nodes(export).map_err(|reason| load_error(source, reason))?;
        Ok(Self { nodes, source: source.to_path_buf() })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    fn predict(&self, inputs: &[f64; 8]) -> Label {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(label) => return label,
                Node::Split { input, threshold, left, right } => {
                    let x = inputs[input] as f32 as f64;
                    idx = if x <= threshold { left } else { right };
                }
            }
        }
    }
}

impl Classifier for TreeClassifier {
    fn name(&self) -> &str {
        "decision-tree"
    }

    fn classify(&self, features: &FeatureVector) -> Result<Label> {
        let inputs = checked_inputs(features)?;
        Ok(self.predict(&inputs))
    }
}

fn load_error(path: &Path, reason: String) -> IdsError {
    IdsError::ModelLoad { path: path.to_path_buf(), reason }
}

fn build_nodes(export: TreeExport) -> std::result::Result<Vec<Node>, String> {
    let n = export.children_left.len();
    if n == 0 {
        return Err("tree has no nodes".into());
    }
    if [export.children_right.len(), export.feature.len(), export.threshold.len(), export.value.len()]
        .iter()
        .any(|&len| len != n)
    {
        return Err("tree arrays differ in length".into());
    }

    // Map the export's feature columns onto our input order.
    let columns: Vec<usize> = match &export.feature_names {
        Some(names) => names
            .iter()
            .map(|name| {
                DETECTOR_FEATURES
                    .iter()
                    .position(|f| *f == name.as_str())
                    .ok_or_else(|| format!("unknown feature '{}'", name))
            })
            .collect::<std::result::Result<_, _>>()?,
        None => (0..DETECTOR_FEATURES.len()).collect(),
    };

    let classes = export.classes.unwrap_or_else(|| vec![0, 1]);
    let labels: Vec<Label> = classes
        .iter()
        .map(|&c| {
            u8::try_from(c)
                .ok()
                .and_then(Label::from_u8)
                .ok_or_else(|| format!("unsupported class {}", c))
        })
        .collect::<std::result::Result<_, _>>()?;
    if labels.is_empty() {
        return Err("export lists no classes".into());
    }

    let mut nodes = Vec::with_capacity(n);
    for i in 0..n {
        let (left, right) = (export.children_left[i], export.children_right[i]);
        if left == TREE_LEAF && right == TREE_LEAF {
            let weights = export.value[i]
                .class_weights()
                .filter(|w| w.len() == labels.len())
                .ok_or_else(|| format!("node {} has malformed class weights", i))?;
            let best = weights
                .iter()
                .enumerate()
                .fold(0, |best, (k, w)| if *w > weights[best] { k } else { best });
            nodes.push(Node::Leaf(labels[best]));
            continue;
        }
        // sklearn numbers children after their parent; enforcing it rules out cycles.
        let child = |c: i64| {
            usize::try_from(c)
                .ok()
                .filter(|&c| c > i && c < n)
                .ok_or_else(|| format!("node {} has invalid child {}", i, c))
        };
        let input = usize::try_from(export.feature[i])
            .ok()
            .and_then(|f| columns.get(f).copied())
            .ok_or_else(|| format!("node {} splits on unknown feature {}", i, export.feature[i]))?;
        let threshold = export.threshold[i];
        if !threshold.is_finite() {
            return Err(format!("node {} has non-finite threshold", i));
        }
        nodes.push(Node::Split { input, threshold, left: child(left)?, right: child(right)? });
    }
    Ok(nodes)
}
