//! Point-forecast error metrics.

use crate::models::error::ModelError;
use serde::Serialize;

const MAPE_FLOOR: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricReport {
    pub mae: f64,
    pub rmse: f64,
    /// Percent.
    pub mape: f64,
    pub peak_error: f64,
}

pub fn mae(actual: &[f64], predicted: &[f64]) -> Result<f64, ModelError> {
    let errors = abs_errors(actual, predicted)?;
    Ok(errors.iter().sum::<f64>() / errors.len() as f64)
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> Result<f64, ModelError> {
    let errors = abs_errors(actual, predicted)?;
    let mse = errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64;
    Ok(mse.sqrt())
}

/// Mean absolute percentage error; actual values near zero are floored at
/// `1e-6` in the denominator.
pub fn mape(actual: &[f64], predicted: &[f64]) -> Result<f64, ModelError> {
    let errors = abs_errors(actual, predicted)?;
    let total: f64 = errors
        .iter()
        .zip(actual)
        .map(|(e, a)| e / a.abs().max(MAPE_FLOOR))
        .sum();
    Ok(total / errors.len() as f64 * 100.0)
}

/// Largest absolute error.
pub fn peak_error(actual: &[f64], predicted: &[f64]) -> Result<f64, ModelError> {
    let errors = abs_errors(actual, predicted)?;
    Ok(errors.into_iter().fold(0.0, f64::max))
}

pub fn evaluate_series(actual: &[f64], predicted: &[f64]) -> Result<MetricReport, ModelError> {
    Ok(MetricReport {
        mae: mae(actual, predicted)?,
        rmse: rmse(actual, predicted)?,
        mape: mape(actual, predicted)?,
        peak_error: peak_error(actual, predicted)?,
    })
}

fn abs_errors(actual: &[f64], predicted: &[f64]) -> Result<Vec<f64>, ModelError> {
    if actual.len() != predicted.len() {
        return Err(ModelError::LengthMismatch {
            expected: actual.len(),
            found: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(ModelError::EmptyInput);
    }
    Ok(actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .collect())
}
