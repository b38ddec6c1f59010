//! Internal error types for model loading and classification.
//!
//! Neither error escapes the public prediction path: load failures become the
//! permanent fallback flag and classification failures degrade a single call
//! to the rule-based strategy.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Model artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed model artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid model bundle: {0}")]
    InvalidBundle(String),

    #[error("Invalid estimator: {0}")]
    InvalidModel(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("Feature dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Malformed model: {0}")]
    MalformedModel(String),

    #[error("Unknown label: {0}")]
    UnknownLabel(String),

    #[error("Non-finite value in {0}")]
    NonFinite(String),
}

pub type ClassificationResult<T> = Result<T, ClassificationError>;
