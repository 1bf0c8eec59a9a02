use crate::config::ConfigError;
use crate::data::error::PrepError;
use crate::models::error::ModelError;
use crate::storage::error::ProfileError;
use crate::weather::error::WeatherError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnergyError {
    #[error(transparent)]
    Prep(#[from] PrepError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Location not found: '{0}'")]
    LocationNotFound(String),
}
