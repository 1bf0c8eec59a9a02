//! Open-Meteo client: geocoding, historical archive and forecast requests,
//! with a cache lookup before every data request and backoff on transport
//! failures.

use crate::weather::cache::{SqliteWeatherCache, WeatherStore};
use crate::weather::error::WeatherError;
use crate::weather::fingerprint::fingerprint;
use crate::weather::retry::RetryPolicy;
use crate::weather::transport::{HttpTransport, Transport};
use bon::bon;
use log::info;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Hourly variables requested when the caller names none.
pub const WEATHER_VARS: [&str; 5] = [
    "temperature_2m",
    "relative_humidity_2m",
    "wind_speed_10m",
    "precipitation",
    "cloud_cover",
];

pub const GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_FORECAST_DAYS: u32 = 3;

/// Provider endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OpenMeteoConfig {
    pub base_url: String,
    /// Base for `/archive` requests; `base_url` is used when unset.
    pub archive_url: Option<String>,
    pub geocoding_url: String,
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com/v1".to_string(),
            archive_url: Some("https://archive-api.open-meteo.com/v1".to_string()),
            geocoding_url: "https://geocoding-api.open-meteo.com/v1".to_string(),
        }
    }
}

/// First geocoding match for a place name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoLocation {
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: Option<String>,
    pub timezone: Option<String>,
}

/// Weather client generic over its payload store and HTTP transport.
///
/// # Examples
///
/// ```rust,no_run
/// # use energy_forecast::{OpenMeteoConfig, RetryPolicy, WeatherClient, WeatherError};
/// # async fn run() -> Result<(), WeatherError> {
/// let client = WeatherClient::open(
///     OpenMeteoConfig::default(),
///     "data/weather_cache.sqlite",
///     RetryPolicy::default(),
/// )
/// .await?;
///
/// let payload = client
///     .historical()
///     .latitude(47.4979)
///     .longitude(19.0402)
///     .start("2024-01-01")
///     .end("2024-01-07")
///     .call()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct WeatherClient<S = SqliteWeatherCache, T = HttpTransport> {
    config: OpenMeteoConfig,
    store: S,
    transport: T,
    retry: RetryPolicy,
}

impl WeatherClient {
    /// Client over an SQLite cache at `cache_path` and a default HTTP client.
    pub async fn open(
        config: OpenMeteoConfig,
        cache_path: impl Into<PathBuf>,
        retry: RetryPolicy,
    ) -> Result<Self, WeatherError> {
        let store = SqliteWeatherCache::open(cache_path).await?;
        Ok(Self::with_parts(config, store, HttpTransport::default(), retry))
    }
}

#[bon]
impl<S: WeatherStore, T: Transport> WeatherClient<S, T> {
    pub fn with_parts(config: OpenMeteoConfig, store: S, transport: T, retry: RetryPolicy) -> Self {
        Self {
            config,
            store,
            transport,
            retry,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolves a free-text location to its first geocoding match.
    ///
    /// Lookups are not cached. Returns `Ok(None)` when the provider has no
    /// match.
    pub async fn geocode(&self, location: &str) -> Result<Option<GeoLocation>, WeatherError> {
        let url = format!("{}/search", self.config.geocoding_url);
        let params = [("name", location.to_string())];
        let payload = self
            .retry
            .run("geocode", || {
                self.transport.get_json(&url, &params, GEOCODE_TIMEOUT)
            })
            .await?;

        let Some(first) = payload
            .get("results")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
        else {
            info!("No geocoding match for '{}'", location);
            return Ok(None);
        };
        serde_json::from_value(first.clone())
            .map(Some)
            .map_err(WeatherError::Geocode)
    }

    /// Fetches hourly archive data for `start..=end` (`YYYY-MM-DD`).
    ///
    /// # Arguments
    ///
    /// * `.latitude(f64)` / `.longitude(f64)`: **Required.** Coordinates in degrees.
    /// * `.start(..)` / `.end(..)`: **Required.** Inclusive date range.
    /// * `.variables(Vec<String>)`: Optional. Hourly variables; defaults to [`WEATHER_VARS`].
    ///
    /// # Errors
    ///
    /// * [`WeatherError::InvalidQuery`] for out-of-range coordinates.
    /// * [`WeatherError::Fetch`] once every attempt has failed.
    /// * Cache errors propagate without retry.
    #[builder]
    pub async fn historical(
        &self,
        latitude: f64,
        longitude: f64,
        #[builder(into)] start: String,
        #[builder(into)] end: String,
        variables: Option<Vec<String>>,
    ) -> Result<Value, WeatherError> {
        check_coordinates(latitude, longitude)?;
        let variables = resolve_variables(variables);
        let key = fingerprint(latitude, longitude, &start, &end, &variables, "historical");
        let base = self
            .config
            .archive_url
            .as_deref()
            .unwrap_or(&self.config.base_url);
        let url = format!("{base}/archive");
        let params = vec![
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("start_date", start),
            ("end_date", end),
            ("hourly", variables.join(",")),
            ("timezone", "auto".to_string()),
        ];
        self.cached_fetch("historical", &key, &url, &params).await
    }

    /// Fetches an hourly forecast for the next `days` days (default 3).
    #[builder]
    pub async fn forecast(
        &self,
        latitude: f64,
        longitude: f64,
        days: Option<u32>,
        variables: Option<Vec<String>>,
    ) -> Result<Value, WeatherError> {
        check_coordinates(latitude, longitude)?;
        let days = days.unwrap_or(DEFAULT_FORECAST_DAYS);
        if days == 0 {
            return Err(WeatherError::InvalidQuery(
                "forecast needs at least one day".to_string(),
            ));
        }
        let variables = resolve_variables(variables);
        let horizon = format!("next-{days}");
        let key = fingerprint(latitude, longitude, &horizon, &horizon, &variables, "forecast");
        let url = format!("{}/forecast", self.config.base_url);
        let params = vec![
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("forecast_days", days.to_string()),
            ("hourly", variables.join(",")),
            ("timezone", "auto".to_string()),
        ];
        self.cached_fetch("forecast", &key, &url, &params).await
    }

    async fn cached_fetch(
        &self,
        operation: &str,
        key: &str,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Value, WeatherError> {
        if let Some(cached) = self.store.get(key).await? {
            info!("Weather cache hit for {}", key);
            return Ok(cached);
        }

        info!("Weather cache miss for {}; requesting {}", key, url);
        let payload = self
            .retry
            .run(operation, || {
                self.transport.get_json(url, params, FETCH_TIMEOUT)
            })
            .await?;
        self.store.set(key, &payload).await?;
        Ok(payload)
    }
}

fn resolve_variables(variables: Option<Vec<String>>) -> Vec<String> {
    match variables {
        Some(vars) if !vars.is_empty() => vars,
        _ => WEATHER_VARS.iter().map(|v| v.to_string()).collect(),
    }
}

fn check_coordinates(latitude: f64, longitude: f64) -> Result<(), WeatherError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(WeatherError::InvalidQuery(format!(
            "coordinates out of range: ({latitude}, {longitude})"
        )));
    }
    Ok(())
}
