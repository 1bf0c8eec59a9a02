//! Chronological train/validation/test partitioning.

use crate::data::error::PrepError;
use log::info;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub train_frac: f64,
    pub val_frac: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_frac: 0.7,
            val_frac: 0.15,
        }
    }
}

impl SplitConfig {
    pub fn new(train_frac: f64, val_frac: f64) -> Result<Self, PrepError> {
        let config = Self {
            train_frac,
            val_frac,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PrepError> {
        let fracs = [self.train_frac, self.val_frac];
        if fracs.iter().any(|f| !f.is_finite() || *f < 0.0) {
            return Err(PrepError::Config(format!(
                "split fractions must be finite and non-negative (train={}, val={})",
                self.train_frac, self.val_frac
            )));
        }
        if self.train_frac + self.val_frac >= 1.0 {
            return Err(PrepError::Config(format!(
                "train_frac + val_frac must be < 1 (got {})",
                self.train_frac + self.val_frac
            )));
        }
        Ok(())
    }
}

/// Three contiguous, ordered views into one series.
#[derive(Debug, PartialEq)]
pub struct SplitTriple<'a, T> {
    pub train: &'a [T],
    pub val: &'a [T],
    pub test: &'a [T],
}

impl<T> SplitTriple<'_, T> {
    pub fn lens(&self) -> (usize, usize, usize) {
        (self.train.len(), self.val.len(), self.test.len())
    }
}

/// Splits `rows` without shuffling: `[0, train_end)`, `[train_end, val_end)`
/// and `[val_end, n)`, with boundaries truncated towards zero.
///
/// # Examples
///
/// ```
/// use energy_forecast::{time_based_split, SplitConfig};
///
/// let rows: Vec<u32> = (0..10).collect();
/// let split = time_based_split(&rows, SplitConfig::default()).unwrap();
/// assert_eq!(split.lens(), (7, 1, 2));
/// ```
pub fn time_based_split<T>(rows: &[T], config: SplitConfig) -> Result<SplitTriple<'_, T>, PrepError> {
    config.validate()?;
    let n = rows.len();
    let train_end = ((n as f64 * config.train_frac) as usize).min(n);
    let val_end = (train_end + (n as f64 * config.val_frac) as usize).min(n);

    let (train, rest) = rows.split_at(train_end);
    let (val, test) = rest.split_at(val_end - train_end);
    info!(
        "Split data into train={}, val={}, test={}",
        train.len(),
        val.len(),
        test.len()
    );
    Ok(SplitTriple { train, val, test })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::ConsumptionRecord;
    use chrono::{TimeDelta, TimeZone};
    use chrono_tz::Tz;

    #[test]
    fn test_example_lengths() -> Result<(), PrepError> {
        let rows: Vec<usize> = (0..10).collect();
        let split = time_based_split(&rows, SplitConfig::new(0.7, 0.15)?)?;
        assert_eq!(split.lens(), (7, 1, 2));
        Ok(())
    }

    #[test]
    fn test_conservation_and_order() -> Result<(), PrepError> {
        let rows: Vec<usize> = (0..97).collect();
        for (train, val) in [(0.7, 0.15), (0.5, 0.49), (0.0, 0.0), (0.0, 0.99), (0.33, 0.33)] {
            let split = time_based_split(&rows, SplitConfig::new(train, val)?)?;
            let joined: Vec<usize> = split
                .train
                .iter()
                .chain(split.val)
                .chain(split.test)
                .copied()
                .collect();
            assert_eq!(joined, rows);
        }
        Ok(())
    }

    #[test]
    fn test_timestamps_stay_ordered_across_parts() -> Result<(), PrepError> {
        let start = Tz::UTC.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let records: Vec<ConsumptionRecord> = (0..40)
            .map(|i| ConsumptionRecord::new(start + TimeDelta::hours(i), i as f64))
            .collect();
        let split = time_based_split(&records, SplitConfig::default())?;

        let train_max = split.train.iter().map(|r| r.timestamp).max().unwrap();
        let val_min = split.val.iter().map(|r| r.timestamp).min().unwrap();
        let test_min = split.test.iter().map(|r| r.timestamp).min().unwrap();
        assert!(train_max < val_min);
        assert!(val_min < test_min);
        Ok(())
    }

    #[test]
    fn test_invalid_fractions_are_rejected() {
        assert!(matches!(SplitConfig::new(0.8, 0.2), Err(PrepError::Config(_))));
        assert!(matches!(SplitConfig::new(0.9, 0.5), Err(PrepError::Config(_))));
        assert!(matches!(SplitConfig::new(-0.1, 0.2), Err(PrepError::Config(_))));
        assert!(matches!(SplitConfig::new(f64::NAN, 0.2), Err(PrepError::Config(_))));

        let rows = [1, 2, 3];
        let config = SplitConfig {
            train_frac: 0.6,
            val_frac: 0.6,
        };
        assert!(matches!(time_based_split(&rows, config), Err(PrepError::Config(_))));
    }

    #[test]
    fn test_empty_input_splits_to_empty_parts() -> Result<(), PrepError> {
        let rows: [u8; 0] = [];
        let split = time_based_split(&rows, SplitConfig::default())?;
        assert_eq!(split.lens(), (0, 0, 0));
        Ok(())
    }
}
