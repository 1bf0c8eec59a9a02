use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepError {
    #[error("Missing required columns: {}", .0.join(", "))]
    Schema(Vec<String>),

    #[error("Invalid timestamps encountered during parsing (row {row}: '{value}')")]
    Parse { row: usize, value: String },

    #[error("Cannot resample an empty series")]
    EmptySeries,

    #[error("Series holds no observed consumption values to fill gaps from")]
    NoObservations,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read CSV file '{0}'")]
    CsvRead(PathBuf, #[source] PolarsError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrame(#[from] PolarsError),

    #[error("I/O error for '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing parquet file '{0}'")]
    ParquetWrite(PathBuf, #[source] PolarsError),

    #[error("Encoding error writing CSV file '{0}'")]
    CsvWrite(PathBuf, #[source] PolarsError),

    #[error("Failed to encode window tensors")]
    TensorEncode(#[source] Box<bincode::error::EncodeError>),

    #[error("Failed to decode window tensors from '{0}'")]
    TensorDecode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
