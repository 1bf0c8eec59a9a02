//! Application settings, loaded once from YAML and passed to constructors.

use crate::data::error::PrepError;
use crate::data::features::FeatureConfig;
use crate::data::loader::parse_timezone;
use crate::data::split::SplitConfig;
use crate::data::windows::WindowConfig;
use crate::types::interval::Interval;
use crate::utils::get_cache_dir;
use crate::weather::client::OpenMeteoConfig;
use crate::weather::retry::RetryPolicy;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Settings are not valid YAML")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid settings")]
    Invalid(#[from] PrepError),

    #[error("Invalid retry setting {name} = {value}")]
    Retry {
        name: &'static str,
        value: f64,
        #[source]
        source: std::time::TryFromFloatSecsError,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `sqlite:///path` URL or bare path of the profile database.
    pub db_url: String,
    pub weather_cache: PathBuf,
    /// IANA zone consumption timestamps are shown in; UTC when unset.
    pub timezone: Option<String>,
    pub open_meteo: OpenMeteoConfig,
    pub retry: RetrySettings,
    pub prep: PrepSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let weather_cache = get_cache_dir()
            .unwrap_or_else(|| PathBuf::from("data"))
            .join("weather_cache.sqlite");
        Self {
            db_url: "sqlite:///data/app.db".to_string(),
            weather_cache,
            timezone: None,
            open_meteo: OpenMeteoConfig::default(),
            retry: RetrySettings::default(),
            prep: PrepSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_secs: f64,
    pub max_delay_secs: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_secs: 1.0,
            max_delay_secs: 30.0,
        }
    }
}

impl RetrySettings {
    /// Converts the delays to a [`RetryPolicy`]. Negative, non-finite or
    /// out-of-range delays are rejected.
    pub fn policy(&self) -> Result<RetryPolicy, ConfigError> {
        Ok(RetryPolicy::builder()
            .max_attempts(self.max_attempts)
            .initial_delay(delay("initial_delay_secs", self.initial_delay_secs)?)
            .max_delay(delay("max_delay_secs", self.max_delay_secs)?)
            .build())
    }
}

fn delay(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|source| ConfigError::Retry {
        name,
        value,
        source,
    })
}

/// Parameters of the data-preparation pipeline.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct PrepSettings {
    pub interval: Interval,
    pub window: WindowConfig,
    pub split: SplitConfig,
    pub features: FeatureConfig,
}

impl Settings {
    /// Parses settings YAML. When the document has a top-level `default`
    /// section, only that section is read.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let document: serde_yaml::Value = serde_yaml::from_str(text)?;
        let section = match document.get("default") {
            Some(section) => section.clone(),
            None => document,
        };
        let settings: Settings = if section.is_null() {
            Settings::default()
        } else {
            serde_yaml::from_value(section)?
        };
        settings.validate()?;
        settings.retry.policy()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::from_yaml_str(&text)
    }

    /// Replaces `db_url` when an override is given.
    pub fn with_database_url(mut self, db_url: Option<String>) -> Self {
        if let Some(url) = db_url.filter(|u| !u.trim().is_empty()) {
            self.db_url = url;
        }
        self
    }

    pub fn timezone(&self) -> Result<Option<Tz>, PrepError> {
        self.timezone.as_deref().map(parse_timezone).transpose()
    }

    pub fn validate(&self) -> Result<(), PrepError> {
        self.prep.split.validate()?;
        if self.prep.window.window == 0 || self.prep.window.horizon == 0 {
            return Err(PrepError::Config(
                "window and horizon must be positive".to_string(),
            ));
        }
        self.timezone()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_section_is_used() -> Result<(), ConfigError> {
        let yaml = r#"
default:
  db_url: sqlite:///tmp/app.db
  weather_cache: /tmp/weather.sqlite
  timezone: Europe/Budapest
  open_meteo:
    base_url: http://localhost:8080/v1
  prep:
    interval: 15min
    window:
      window: 96
    split:
      train_frac: 0.8
      val_frac: 0.1
    features:
      lags: [1, 4]
production:
  db_url: sqlite:///srv/app.db
"#;
        let settings = Settings::from_yaml_str(yaml)?;

        assert_eq!(settings.db_url, "sqlite:///tmp/app.db");
        assert_eq!(settings.weather_cache, PathBuf::from("/tmp/weather.sqlite"));
        assert_eq!(settings.open_meteo.base_url, "http://localhost:8080/v1");
        assert_eq!(
            settings.open_meteo.geocoding_url,
            OpenMeteoConfig::default().geocoding_url
        );
        assert_eq!(settings.prep.interval, Interval::minutes(15)?);
        assert_eq!(settings.prep.window, WindowConfig { window: 96, horizon: 24 });
        assert_eq!(settings.prep.split, SplitConfig::new(0.8, 0.1)?);
        assert_eq!(settings.prep.features.lags, vec![1, 4]);
        assert_eq!(settings.prep.features.rolling_windows, vec![24, 168]);
        assert_eq!(settings.timezone()?, Some(chrono_tz::Europe::Budapest));
        Ok(())
    }

    #[test]
    fn test_flat_document_and_empty_document() -> Result<(), ConfigError> {
        let flat = Settings::from_yaml_str("db_url: app.db\n")?;
        assert_eq!(flat.db_url, "app.db");
        assert_eq!(flat.prep, PrepSettings::default());

        let empty = Settings::from_yaml_str("")?;
        assert_eq!(empty.retry.policy()?, RetryPolicy::default());
        Ok(())
    }

    #[test]
    fn test_database_url_override() {
        let settings = Settings::default()
            .with_database_url(Some("sqlite:///override.db".to_string()));
        assert_eq!(settings.db_url, "sqlite:///override.db");

        let unchanged = Settings::default().with_database_url(Some("  ".to_string()));
        assert_eq!(unchanged.db_url, Settings::default().db_url);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad_split = "prep:\n  split:\n    train_frac: 0.9\n    val_frac: 0.2\n";
        let bad_zone = "timezone: Mars/Olympus\n";
        let bad_interval = "prep:\n  interval: fortnightly\n";

        assert!(matches!(Settings::from_yaml_str(bad_split), Err(ConfigError::Invalid(_))));
        assert!(matches!(Settings::from_yaml_str(bad_zone), Err(ConfigError::Invalid(_))));
        assert!(matches!(Settings::from_yaml_str(bad_interval), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_unrepresentable_retry_delays_are_rejected() {
        for yaml in [
            "retry:\n  max_delay_secs: .inf\n",
            "retry:\n  initial_delay_secs: -1.0\n",
            "retry:\n  max_delay_secs: 1.0e300\n",
        ] {
            assert!(
                matches!(Settings::from_yaml_str(yaml), Err(ConfigError::Retry { .. })),
                "{yaml}"
            );
        }

        let retry = RetrySettings {
            initial_delay_secs: f64::NAN,
            ..RetrySettings::default()
        };
        assert!(matches!(
            retry.policy(),
            Err(ConfigError::Retry {
                name: "initial_delay_secs",
                ..
            })
        ));
    }
}
