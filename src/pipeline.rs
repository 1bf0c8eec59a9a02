//! End-to-end preparation: resample, build model inputs, split, and write
//! the artifacts consumed by training and evaluation.

use crate::config::PrepSettings;
use crate::data::error::PrepError;
use crate::data::export::{feature_frame, records_frame, save_windows, write_csv, write_parquet};
use crate::data::features::{build_baseline_matrix, FeatureMatrix};
use crate::data::resample::resample;
use crate::data::split::{time_based_split, SplitConfig};
use crate::data::windows::{build_transformer_windows, WindowTensors};
use crate::types::record::{ConsumptionRecord, UniformSeries};
use chrono_tz::Tz;
use log::info;
use std::path::{Path, PathBuf};

pub const BASELINE_FILE: &str = "baseline.parquet";
pub const WINDOWS_FILE: &str = "windows.bin.gz";
pub const TRAIN_FILE: &str = "train.csv";
pub const VAL_FILE: &str = "val.csv";
pub const TEST_FILE: &str = "test.csv";

/// Everything derived from one consumption series.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDataset {
    pub series: UniformSeries,
    pub baseline: FeatureMatrix,
    pub windows: WindowTensors,
}

/// Where [`PreparedDataset::write_artifacts`] put each file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub baseline: PathBuf,
    pub windows: PathBuf,
    pub train: PathBuf,
    pub val: PathBuf,
    pub test: PathBuf,
}

/// Resamples `records` and builds the baseline matrix and window tensors.
pub fn prepare(
    records: &[ConsumptionRecord],
    settings: &PrepSettings,
    timezone: Option<Tz>,
) -> Result<PreparedDataset, PrepError> {
    let series = resample(records, timezone, settings.interval)?;
    let baseline = build_baseline_matrix(&series, &settings.features)?;
    let windows = build_transformer_windows(&series, settings.window)?;
    Ok(PreparedDataset {
        series,
        baseline,
        windows,
    })
}

impl PreparedDataset {
    /// Writes the baseline table, window tensors and the chronological
    /// train/val/test splits of the resampled series into `out_dir`.
    pub async fn write_artifacts(
        &self,
        out_dir: &Path,
        split: SplitConfig,
    ) -> Result<ArtifactPaths, PrepError> {
        let paths = ArtifactPaths {
            baseline: out_dir.join(BASELINE_FILE),
            windows: out_dir.join(WINDOWS_FILE),
            train: out_dir.join(TRAIN_FILE),
            val: out_dir.join(VAL_FILE),
            test: out_dir.join(TEST_FILE),
        };

        write_parquet(feature_frame(&self.baseline)?, &paths.baseline).await?;
        save_windows(&self.windows, &paths.windows).await?;

        let parts = time_based_split(self.series.records(), split)?;
        write_csv(records_frame(parts.train)?, &paths.train).await?;
        write_csv(records_frame(parts.val)?, &paths.val).await?;
        write_csv(records_frame(parts.test)?, &paths.test).await?;

        info!("Artifacts written to {}", out_dir.display());
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::export::load_windows;
    use crate::data::loader::load_consumption_csv;
    use crate::data::windows::WindowConfig;
    use chrono::{TimeDelta, TimeZone};
    use tempfile::tempdir;

    fn hourly_records(hours: usize) -> Vec<ConsumptionRecord> {
        let start = Tz::UTC.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..hours)
            // every fifth reading missing
            .filter(|h| h % 5 != 3)
            .map(|h| ConsumptionRecord::new(start + TimeDelta::hours(h as i64), 0.5 + (h % 24) as f64))
            .collect()
    }

    #[tokio::test]
    async fn test_prepare_and_write_artifacts() -> Result<(), PrepError> {
        let dir = tempdir().map_err(|e| PrepError::Io("tmp".into(), e))?;
        let settings = PrepSettings {
            window: WindowConfig {
                window: 48,
                horizon: 12,
            },
            ..PrepSettings::default()
        };

        let dataset = prepare(&hourly_records(240), &settings, None)?;
        assert_eq!(dataset.series.len(), 240);
        assert_eq!(dataset.baseline.len(), 240 - 168);
        assert_eq!(dataset.windows.n_samples(), 240 - 48 - 12 + 1);

        let paths = dataset
            .write_artifacts(dir.path(), SplitConfig::default())
            .await?;

        let train = load_consumption_csv(&paths.train, None)?;
        let val = load_consumption_csv(&paths.val, None)?;
        let test = load_consumption_csv(&paths.test, None)?;
        assert_eq!((train.len(), val.len(), test.len()), (168, 36, 36));
        assert_eq!(train[0], dataset.series.records()[0]);
        assert!(train.last().map(|r| r.timestamp) < val.first().map(|r| r.timestamp));

        assert_eq!(load_windows(&paths.windows).await?, dataset.windows);
        assert!(paths.baseline.is_file());
        Ok(())
    }
}
