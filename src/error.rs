//! Crate-wide error type.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdsError {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("classification failed: {0}")]
    Classify(String),

    #[error("dataset write failed: {0}")]
    Dataset(#[from] csv::Error),

    #[error("alert journal error: {0}")]
    Journal(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("capture source ended")]
    CaptureEnded,
}

pub type Result<T> = std::result::Result<T, IdsError>;
