//! Consumption records and the uniform series built from them.

use crate::types::interval::Interval;
use chrono::DateTime;
use chrono_tz::Tz;

/// A single metered consumption reading.
///
/// A missing reading is carried as `NaN` until the resampler fills it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumptionRecord {
    pub timestamp: DateTime<Tz>,
    pub consumption: f64,
}

impl ConsumptionRecord {
    pub fn new(timestamp: DateTime<Tz>, consumption: f64) -> Self {
        Self {
            timestamp,
            consumption,
        }
    }

    pub fn is_observed(&self) -> bool {
        !self.consumption.is_nan()
    }
}

/// A consumption series on an exact, gap-free cadence.
///
/// Only [`crate::resample`] produces one, so every instance satisfies
/// `len == (end - start) / interval + 1` and holds no missing values.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSeries {
    interval: Interval,
    records: Vec<ConsumptionRecord>,
}

impl UniformSeries {
    pub(crate) fn from_parts(interval: Interval, records: Vec<ConsumptionRecord>) -> Self {
        Self { interval, records }
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn records(&self) -> &[ConsumptionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ConsumptionRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn start(&self) -> Option<DateTime<Tz>> {
        self.records.first().map(|r| r.timestamp)
    }

    pub fn end(&self) -> Option<DateTime<Tz>> {
        self.records.last().map(|r| r.timestamp)
    }

    pub fn values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.consumption).collect()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Tz>> {
        self.records.iter().map(|r| r.timestamp).collect()
    }
}
