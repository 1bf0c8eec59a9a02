use crate::models::forecaster::ForecasterKind;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{0} forecasters are not available in this build")]
    Unsupported(ForecasterKind),

    #[error("Forecaster must be fitted before predicting from a short context")]
    NotFitted,

    #[error("Invalid model input: {0}")]
    InvalidInput(String),

    #[error("Length mismatch: expected {expected} values, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Metrics need at least one value")]
    EmptyInput,

    #[error("I/O error for model file '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to encode model")]
    Encode(#[source] Box<bincode::error::EncodeError>),

    #[error("Failed to decode model from '{0}'")]
    Decode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed building metrics DataFrame: {0}")]
    Frame(#[from] PolarsError),
}
