use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single HTTP exchange. Every variant is treated as transient
/// by the retry layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Response from {0} is not valid JSON")]
    Decode(String, #[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("{operation} failed after {attempts} attempts")]
    Fetch {
        operation: String,
        attempts: u32,
        #[source]
        source: TransportError,
    },

    #[error("Failed to open weather cache '{0}'")]
    CacheOpen(PathBuf, #[source] rusqlite::Error),

    #[error("Weather cache query failed on '{0}'")]
    CacheQuery(PathBuf, #[source] rusqlite::Error),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Cached payload for key '{key}' is not valid JSON")]
    CachePayload {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected weather payload: {0}")]
    MalformedPayload(String),

    #[error("Geocoding response could not be interpreted")]
    Geocode(#[source] serde_json::Error),

    #[error("Invalid weather query: {0}")]
    InvalidQuery(String),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
