//! Fixed sampling cadence of a uniform series.

use crate::data::error::PrepError;
use chrono::TimeDelta;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

const MILLIS_PER_SECOND: i64 = 1_000;
const MILLIS_PER_MINUTE: i64 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: i64 = 24 * MILLIS_PER_HOUR;

/// A positive, whole-millisecond sampling interval.
///
/// Parsed from strings such as `"1h"`, `"15min"`, `"30s"` or `"1d"`.
///
/// # Examples
///
/// ```
/// use energy_forecast::Interval;
///
/// let quarter: Interval = "15min".parse().unwrap();
/// assert_eq!(quarter.as_millis(), 15 * 60 * 1000);
/// assert_eq!(quarter.to_string(), "15min");
/// assert_eq!(Interval::default().to_string(), "1h");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Interval {
    millis: i64,
}

impl Interval {
    pub const HOURLY: Interval = Interval {
        millis: MILLIS_PER_HOUR,
    };

    pub fn from_millis(millis: i64) -> Result<Self, PrepError> {
        if millis <= 0 {
            return Err(PrepError::Config(format!(
                "interval must be positive, got {millis}ms"
            )));
        }
        Ok(Self { millis })
    }

    pub fn hours(hours: i64) -> Result<Self, PrepError> {
        Self::from_millis(hours.saturating_mul(MILLIS_PER_HOUR))
    }

    pub fn minutes(minutes: i64) -> Result<Self, PrepError> {
        Self::from_millis(minutes.saturating_mul(MILLIS_PER_MINUTE))
    }

    pub fn as_millis(&self) -> i64 {
        self.millis
    }

    pub fn as_delta(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.millis)
    }
}

impl Default for Interval {
    fn default() -> Self {
        Self::HOURLY
    }
}

impl FromStr for Interval {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let split_at = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (count, unit) = trimmed.split_at(split_at);
        let count: i64 = if count.is_empty() {
            1
        } else {
            count
                .parse()
                .map_err(|_| PrepError::Config(format!("invalid interval '{s}'")))?
        };
        let unit_millis = match unit {
            "s" | "S" => MILLIS_PER_SECOND,
            "m" | "min" | "T" => MILLIS_PER_MINUTE,
            "h" | "H" => MILLIS_PER_HOUR,
            "d" | "D" => MILLIS_PER_DAY,
            _ => {
                return Err(PrepError::Config(format!(
                    "unknown interval unit in '{s}'"
                )))
            }
        };
        Self::from_millis(count.saturating_mul(unit_millis))
    }
}

impl TryFrom<String> for Interval {
    type Error = PrepError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.millis;
        if m % MILLIS_PER_DAY == 0 {
            write!(f, "{}d", m / MILLIS_PER_DAY)
        } else if m % MILLIS_PER_HOUR == 0 {
            write!(f, "{}h", m / MILLIS_PER_HOUR)
        } else if m % MILLIS_PER_MINUTE == 0 {
            write!(f, "{}min", m / MILLIS_PER_MINUTE)
        } else if m % MILLIS_PER_SECOND == 0 {
            write!(f, "{}s", m / MILLIS_PER_SECOND)
        } else {
            write!(f, "{m}ms")
        }
    }
}
