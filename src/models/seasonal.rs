use crate::data::features::FeatureMatrix;
use crate::models::error::ModelError;
use crate::models::forecaster::{Forecaster, ForecasterKind};
use bincode::config::{Configuration, Fixint, LittleEndian};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Repeats the last `season` values of the context.
///
/// When the context is shorter than one season the forecast falls back to
/// the training mean recorded by [`Forecaster::fit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalNaive {
    season: usize,
    fallback: Option<f64>,
}

impl SeasonalNaive {
    pub fn new(season: usize) -> Result<Self, ModelError> {
        if season == 0 {
            return Err(ModelError::InvalidInput(
                "season length must be positive".to_string(),
            ));
        }
        Ok(Self {
            season,
            fallback: None,
        })
    }

    pub fn season(&self) -> usize {
        self.season
    }
}

impl Forecaster for SeasonalNaive {
    fn kind(&self) -> ForecasterKind {
        ForecasterKind::SeasonalNaive
    }

    fn fit(&mut self, features: &FeatureMatrix, targets: &[f64]) -> Result<(), ModelError> {
        if targets.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        if features.len() != targets.len() {
            return Err(ModelError::LengthMismatch {
                expected: features.len(),
                found: targets.len(),
            });
        }
        let mean = targets.iter().sum::<f64>() / targets.len() as f64;
        self.fallback = Some(mean);
        info!("Fitted seasonal naive (season {}) on {} rows", self.season, targets.len());
        Ok(())
    }

    fn predict(&self, context: &[f64], horizon: usize) -> Result<Vec<f64>, ModelError> {
        if horizon == 0 {
            return Err(ModelError::InvalidInput("horizon must be positive".to_string()));
        }
        if context.len() < self.season {
            let fallback = self.fallback.ok_or(ModelError::NotFitted)?;
            return Ok(vec![fallback; horizon]);
        }
        let last_season = &context[context.len() - self.season..];
        Ok(last_season.iter().copied().cycle().take(horizon).collect())
    }

    fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ModelError::Io(parent.to_path_buf(), e))?;
        }
        let bytes = bincode::serde::encode_to_vec(self, BINCODE_CONFIG)
            .map_err(|e| ModelError::Encode(Box::new(e)))?;
        std::fs::write(path, bytes).map_err(|e| ModelError::Io(path.to_path_buf(), e))
    }

    fn load(path: &Path) -> Result<Self, ModelError> {
        let bytes = std::fs::read(path).map_err(|e| ModelError::Io(path.to_path_buf(), e))?;
        let (model, _): (Self, usize) = bincode::serde::decode_from_slice(&bytes, BINCODE_CONFIG)
            .map_err(|e| ModelError::Decode(path.to_path_buf(), Box::new(e)))?;
        if model.season == 0 {
            return Err(ModelError::InvalidInput(format!(
                "'{}' holds a zero season length",
                path.display()
            )));
        }
        Ok(model)
    }
}
