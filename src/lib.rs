mod config;
mod data;
mod error;
mod models;
mod pipeline;
mod storage;
mod types;
mod utils;
mod weather;

pub use config::{ConfigError, PrepSettings, RetrySettings, Settings};
pub use error::EnergyError;
pub use pipeline::*;
pub use utils::get_cache_dir;

pub use types::interval::Interval;
pub use types::record::{ConsumptionRecord, UniformSeries};
pub use types::timestamp::{parse_naive, parse_utc, IntoUtcDateTime};

pub use data::demo::demo_consumption;
pub use data::error::PrepError;
pub use data::export::{
    feature_frame, load_windows, records_frame, save_windows, write_csv, write_parquet,
};
pub use data::features::*;
pub use data::loader::{load_consumption_csv, parse_timezone, records_from_frame, REQUIRED_COLUMNS};
pub use data::resample::resample;
pub use data::split::{time_based_split, SplitConfig, SplitTriple};
pub use data::windows::{build_transformer_windows, sliding_window, WindowConfig, WindowTensors};

pub use weather::cache::{MemoryWeatherCache, SqliteWeatherCache, WeatherStore};
pub use weather::client::*;
pub use weather::error::{TransportError, WeatherError};
pub use weather::fingerprint::fingerprint;
pub use weather::frame::{merge_weather, EnrichedRecord, HourlyWeather};
pub use weather::retry::RetryPolicy;
pub use weather::transport::{HttpTransport, Transport};

pub use storage::error::ProfileError;
pub use storage::profile::{Profile, ProfileStore, SqliteProfileStore};

pub use models::error::ModelError;
pub use models::evaluator::{evaluate_models, render_markdown, scores_frame, ModelScore};
pub use models::forecaster::{build_forecaster, Forecaster, ForecasterKind};
pub use models::metrics::{evaluate_series, mae, mape, peak_error, rmse, MetricReport};
pub use models::seasonal::SeasonalNaive;
