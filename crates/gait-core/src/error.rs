//! Error types for gait feature extraction.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to parse coordinate {index} ({value:?}): {reason}")]
    Parse {
        index: usize,
        value: String,
        reason: String,
    },

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
