//! The forecaster contract shared by every model family.

use crate::data::features::FeatureMatrix;
use crate::models::error::ModelError;
use crate::models::seasonal::SeasonalNaive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Model families known to the pipeline.
///
/// Only [`ForecasterKind::SeasonalNaive`] is implemented here; the other
/// families are trained by external tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecasterKind {
    SeasonalNaive,
    GradientBoosted,
    PatchTransformer,
    ZeroShot,
}

impl ForecasterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecasterKind::SeasonalNaive => "seasonal_naive",
            ForecasterKind::GradientBoosted => "gradient_boosted",
            ForecasterKind::PatchTransformer => "patch_transformer",
            ForecasterKind::ZeroShot => "zero_shot",
        }
    }
}

impl fmt::Display for ForecasterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecasterKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "seasonal_naive" | "naive" => Ok(ForecasterKind::SeasonalNaive),
            "gradient_boosted" | "lightgbm" => Ok(ForecasterKind::GradientBoosted),
            "patch_transformer" | "patchtst" => Ok(ForecasterKind::PatchTransformer),
            "zero_shot" | "ttm" => Ok(ForecasterKind::ZeroShot),
            other => Err(ModelError::InvalidInput(format!(
                "unknown forecaster kind '{other}'"
            ))),
        }
    }
}

/// A model that learns from the baseline matrix and predicts forward from
/// a context of recent values.
pub trait Forecaster {
    fn kind(&self) -> ForecasterKind;

    fn fit(&mut self, features: &FeatureMatrix, targets: &[f64]) -> Result<(), ModelError>;

    /// Predicts the `horizon` values following `context`.
    fn predict(&self, context: &[f64], horizon: usize) -> Result<Vec<f64>, ModelError>;

    fn save(&self, path: &Path) -> Result<(), ModelError>;

    fn load(path: &Path) -> Result<Self, ModelError>
    where
        Self: Sized;
}

/// Constructs an unfitted forecaster of `kind`.
///
/// # Errors
///
/// [`ModelError::Unsupported`] for families without an in-crate implementation.
pub fn build_forecaster(kind: ForecasterKind, season: usize) -> Result<Box<dyn Forecaster>, ModelError> {
    match kind {
        ForecasterKind::SeasonalNaive => Ok(Box::new(SeasonalNaive::new(season)?)),
        other => Err(ModelError::Unsupported(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_parse_back() -> Result<(), ModelError> {
        for kind in [
            ForecasterKind::SeasonalNaive,
            ForecasterKind::GradientBoosted,
            ForecasterKind::PatchTransformer,
            ForecasterKind::ZeroShot,
        ] {
            assert_eq!(kind.to_string().parse::<ForecasterKind>()?, kind);
        }
        assert_eq!("PatchTST".parse::<ForecasterKind>()?, ForecasterKind::PatchTransformer);
        assert!("arima".parse::<ForecasterKind>().is_err());
        Ok(())
    }

    #[test]
    fn test_only_seasonal_naive_is_buildable() {
        let naive = build_forecaster(ForecasterKind::SeasonalNaive, 24);
        assert!(naive.is_ok_and(|m| m.kind() == ForecasterKind::SeasonalNaive));
        assert!(matches!(
            build_forecaster(ForecasterKind::ZeroShot, 24),
            Err(ModelError::Unsupported(ForecasterKind::ZeroShot))
        ));
    }
}
