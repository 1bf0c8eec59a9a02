//! Calendar, lag and rolling-window features for the gradient-boosted baseline.

use crate::data::error::PrepError;
use crate::types::record::UniformSeries;
use chrono::{DateTime, Datelike, Timelike};
use chrono_tz::Tz;
use log::info;
use serde::Deserialize;

pub const DEFAULT_LAGS: [usize; 6] = [1, 2, 3, 24, 48, 168];
pub const ROLLING_WINDOWS: [usize; 2] = [24, 168];

/// Lag offsets and rolling windows used to build the baseline matrix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub lags: Vec<usize>,
    pub rolling_windows: Vec<usize>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            lags: DEFAULT_LAGS.to_vec(),
            rolling_windows: ROLLING_WINDOWS.to_vec(),
        }
    }
}

/// A derived column; `None` marks a slot without enough history.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// A uniform series being extended with derived columns.
///
/// Each `add_*` step consumes the table and returns the extended one.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    timestamps: Vec<DateTime<Tz>>,
    consumption: Vec<f64>,
    columns: Vec<FeatureColumn>,
}

impl FeatureTable {
    pub fn from_series(series: &UniformSeries) -> Self {
        Self {
            timestamps: series.timestamps(),
            consumption: series.values(),
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Appends `hour`, `dayofweek` (Monday = 0) and `is_weekend`, read in
    /// the series' own timezone.
    pub fn add_time_features(mut self) -> Self {
        let hours = self
            .timestamps
            .iter()
            .map(|t| Some(f64::from(t.hour())))
            .collect();
        let weekdays: Vec<u32> = self
            .timestamps
            .iter()
            .map(|t| t.weekday().num_days_from_monday())
            .collect();
        let weekend = weekdays
            .iter()
            .map(|&d| Some(if d >= 5 { 1.0 } else { 0.0 }))
            .collect();

        self.push("hour", hours);
        self.push(
            "dayofweek",
            weekdays.into_iter().map(|d| Some(f64::from(d))).collect(),
        );
        self.push("is_weekend", weekend);
        self
    }

    /// Appends `lag_k[i] = consumption[i - k]` for every `k`.
    pub fn add_lag_features(mut self, lags: &[usize]) -> Self {
        for &lag in lags {
            let values = (0..self.len())
                .map(|i| i.checked_sub(lag).map(|j| self.consumption[j]))
                .collect();
            self.push(&format!("lag_{lag}"), values);
        }
        self
    }

    /// Appends trailing `roll_mean_w` and `roll_std_w` for every window `w`.
    ///
    /// Both are defined from the first row on: the window shrinks to the
    /// rows available, and the standard deviation of fewer than two points
    /// is reported as 0.
    pub fn add_rolling_features(mut self, windows: &[usize]) -> Result<Self, PrepError> {
        for &window in windows {
            if window == 0 {
                return Err(PrepError::Config(
                    "rolling window must be positive".to_string(),
                ));
            }
            let (means, stds): (Vec<_>, Vec<_>) = (0..self.len())
                .map(|i| {
                    let from = (i + 1).saturating_sub(window);
                    let (mean, std) = mean_and_std(&self.consumption[from..=i]);
                    (Some(mean), Some(std))
                })
                .unzip();
            self.push(&format!("roll_mean_{window}"), means);
            self.push(&format!("roll_std_{window}"), stds);
        }
        Ok(self)
    }

    /// Drops every row holding an undefined value.
    pub fn drop_incomplete(self) -> FeatureMatrix {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| self.columns.iter().all(|c| c.values[i].is_some()))
            .collect();

        let columns = self
            .columns
            .iter()
            .map(|c| c.name.clone())
            .collect::<Vec<_>>();
        let values = self
            .columns
            .iter()
            .map(|c| keep.iter().filter_map(|&i| c.values[i]).collect())
            .collect();

        FeatureMatrix {
            timestamps: keep.iter().map(|&i| self.timestamps[i]).collect(),
            consumption: keep.iter().map(|&i| self.consumption[i]).collect(),
            columns,
            values,
        }
    }

    fn push(&mut self, name: &str, values: Vec<Option<f64>>) {
        self.columns.push(FeatureColumn {
            name: name.to_string(),
            values,
        });
    }
}

/// Fully populated model input: one row per sample with complete history.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    timestamps: Vec<DateTime<Tz>>,
    consumption: Vec<f64>,
    columns: Vec<String>,
    // column-major, aligned with `columns`
    values: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Tz>] {
        &self.timestamps
    }

    /// The `consumption` column, i.e. the regression target.
    pub fn targets(&self) -> &[f64] {
        &self.consumption
    }

    /// Every column except `timestamp` and `consumption`, in build order.
    pub fn feature_columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| self.values[idx].as_slice())
    }

    /// Feature values of one sample, ordered like [`Self::feature_columns`].
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        (index < self.len()).then(|| self.values.iter().map(|col| col[index]).collect())
    }
}

/// Builds the baseline matrix: time, lag and rolling features, then drops
/// rows with incomplete lag history (the first `max(lags)` rows).
pub fn build_baseline_matrix(
    series: &UniformSeries,
    config: &FeatureConfig,
) -> Result<FeatureMatrix, PrepError> {
    let matrix = FeatureTable::from_series(series)
        .add_time_features()
        .add_lag_features(&config.lags)
        .add_rolling_features(&config.rolling_windows)?
        .drop_incomplete();
    info!(
        "Built baseline feature matrix with shape ({}, {})",
        matrix.len(),
        matrix.feature_columns().len() + 2
    );
    Ok(matrix)
}

fn mean_and_std(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    if window.len() < 2 {
        return (mean, 0.0);
    }
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, variance.sqrt())
}
