//! Persistent store for raw weather payloads, keyed by query fingerprint.

use crate::utils::ensure_dir_exists;
use crate::weather::error::WeatherError;
use chrono::Utc;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tokio::task;

/// Key-value storage for weather payloads. Entries never expire; `set`
/// overwrites any previous value for the key.
pub trait WeatherStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, WeatherError>> + Send;

    fn set(&self, key: &str, payload: &Value) -> impl Future<Output = Result<(), WeatherError>> + Send;
}

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS cache (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    created_at REAL NOT NULL
)";

/// SQLite-backed [`WeatherStore`]. Every operation opens its own connection
/// on a blocking thread, so concurrent writers to one key race with the last
/// write winning.
#[derive(Debug, Clone)]
pub struct SqliteWeatherCache {
    path: PathBuf,
}

impl SqliteWeatherCache {
    /// Opens (creating if needed) the cache file and its parent directory.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, WeatherError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir_exists(parent)
                .await
                .map_err(|e| WeatherError::CacheDirCreation(parent.to_path_buf(), e))?;
        }
        let cache = Self { path };
        cache
            .with_connection(|conn| conn.execute(SCHEMA, []).map(|_| ()))
            .await?;
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When `key` was last written, in seconds since the Unix epoch.
    pub async fn created_at(&self, key: &str) -> Result<Option<f64>, WeatherError> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            conn.query_row(
                "SELECT created_at FROM cache WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
    }

    async fn with_connection<T, F>(&self, op: F) -> Result<T, WeatherError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let conn =
                Connection::open(&path).map_err(|e| WeatherError::CacheOpen(path.clone(), e))?;
            op(&conn).map_err(|e| WeatherError::CacheQuery(path, e))
        })
        .await?
    }
}

impl WeatherStore for SqliteWeatherCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, WeatherError> {
        let owned_key = key.to_string();
        let raw: Option<String> = self
            .with_connection(move |conn| {
                conn.query_row(
                    "SELECT value FROM cache WHERE key = ?1",
                    params![owned_key],
                    |row| row.get(0),
                )
                .optional()
            })
            .await?;

        raw.map(|text| {
            serde_json::from_str(&text).map_err(|source| WeatherError::CachePayload {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
    }

    async fn set(&self, key: &str, payload: &Value) -> Result<(), WeatherError> {
        let text = serde_json::to_string(payload).map_err(|source| WeatherError::CachePayload {
            key: key.to_string(),
            source,
        })?;
        let owned_key = key.to_string();
        let created_at = Utc::now().timestamp_micros() as f64 / 1e6;
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO cache (key, value, created_at) VALUES (?1, ?2, ?3)",
                params![owned_key, text, created_at],
            )
            .map(|_| ())
        })
        .await?;
        debug!("Stored weather payload under {}", key);
        Ok(())
    }
}

/// Process-local [`WeatherStore`], mainly for tests and one-off runs.
#[derive(Debug, Default)]
pub struct MemoryWeatherCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryWeatherCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entry_count(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl WeatherStore for MemoryWeatherCache {
    async fn get(&self, key: &str) -> Result<Option<Value>, WeatherError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, payload: &Value) -> Result<(), WeatherError> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), payload.clone());
        Ok(())
    }
}
