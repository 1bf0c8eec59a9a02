//! Hourly weather tables decoded from provider payloads, and the as-of join
//! onto consumption records.

use crate::types::record::ConsumptionRecord;
use crate::types::timestamp::{parse_naive, IntoUtcDateTime};
use crate::weather::error::WeatherError;
use chrono::{DateTime, TimeDelta, Utc};
use polars::prelude::*;
use serde_json::Value;
use std::collections::BTreeMap;

/// Column-oriented hourly weather keyed by UTC timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlyWeather {
    timestamps: Vec<DateTime<Utc>>,
    variables: BTreeMap<String, Vec<Option<f64>>>,
}

impl HourlyWeather {
    /// Decodes the `hourly` block of a payload.
    ///
    /// `hourly.time` holds local wall-clock strings (shifted to UTC by the
    /// payload's `utc_offset_seconds`) or unix seconds. Every other array in
    /// the block becomes a variable column. A payload without `hourly` gives
    /// an empty table.
    ///
    /// # Errors
    ///
    /// [`WeatherError::MalformedPayload`] on unparseable times, non-numeric
    /// values, arrays whose length differs from `time`, or times out of order.
    pub fn from_payload(payload: &Value) -> Result<Self, WeatherError> {
        let Some(hourly) = payload.get("hourly") else {
            return Ok(Self::default());
        };
        let hourly = hourly
            .as_object()
            .ok_or_else(|| WeatherError::MalformedPayload("`hourly` is not an object".into()))?;
        let offset = TimeDelta::seconds(
            payload
                .get("utc_offset_seconds")
                .and_then(Value::as_i64)
                .unwrap_or(0),
        );

        let timestamps = match hourly.get("time") {
            Some(times) => as_array(times, "time")?
                .iter()
                .map(|raw| parse_time(raw, offset))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };
        if timestamps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(WeatherError::MalformedPayload(
                "`hourly.time` is not strictly increasing".into(),
            ));
        }

        let mut variables = BTreeMap::new();
        for (name, column) in hourly.iter().filter(|(name, _)| name.as_str() != "time") {
            let values = as_array(column, name)?
                .iter()
                .map(|v| match v {
                    Value::Null => Ok(None),
                    other => other.as_f64().map(Some).ok_or_else(|| {
                        WeatherError::MalformedPayload(format!("non-numeric value in `{name}`: {other}"))
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            if values.len() != timestamps.len() {
                return Err(WeatherError::MalformedPayload(format!(
                    "`{name}` has {} values for {} timestamps",
                    values.len(),
                    timestamps.len()
                )));
            }
            variables.insert(name.clone(), values);
        }

        Ok(Self {
            timestamps,
            variables,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn variable(&self, name: &str) -> Option<&[Option<f64>]> {
        self.variables.get(name).map(Vec::as_slice)
    }

    /// Index of the row closest to `at`, if within `tolerance`. Ties go to
    /// the earlier row.
    pub fn nearest(&self, at: DateTime<Utc>, tolerance: TimeDelta) -> Option<usize> {
        let idx = self.timestamps.partition_point(|t| *t < at);
        let before = idx.checked_sub(1).map(|i| (i, at - self.timestamps[i]));
        let after = self.timestamps.get(idx).map(|t| (idx, *t - at));
        let best = match (before, after) {
            (Some(b), Some(a)) if a.1 < b.1 => a,
            (Some(b), _) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };
        (best.1 <= tolerance).then_some(best.0)
    }

    /// `timestamp` (UTC milliseconds) followed by the variables in name order.
    pub fn to_dataframe(&self) -> Result<DataFrame, PolarsError> {
        let millis: Vec<i64> = self
            .timestamps
            .iter()
            .map(|t| t.timestamp_millis())
            .collect();
        let mut columns: Vec<Column> = vec![Series::new("timestamp".into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .into()];
        for (name, values) in &self.variables {
            columns.push(Column::new(name.as_str().into(), values.as_slice()));
        }
        DataFrame::new(columns)
    }
}

/// A consumption reading joined with the weather observed nearest to it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub record: ConsumptionRecord,
    pub weather: BTreeMap<String, Option<f64>>,
}

/// As-of join of `records` onto `weather` by nearest timestamp.
///
/// Records without a weather row within `tolerance` keep every weather
/// variable as `None`. Output preserves the order of `records`.
pub fn merge_weather(
    records: &[ConsumptionRecord],
    weather: &HourlyWeather,
    tolerance: TimeDelta,
) -> Vec<EnrichedRecord> {
    records
        .iter()
        .map(|record| {
            let row = weather.nearest(record.timestamp.into_utc(), tolerance);
            let values = weather
                .variables
                .iter()
                .map(|(name, column)| (name.clone(), row.and_then(|i| column[i])))
                .collect();
            EnrichedRecord {
                record: *record,
                weather: values,
            }
        })
        .collect()
}

fn as_array<'a>(value: &'a Value, name: &str) -> Result<&'a Vec<Value>, WeatherError> {
    value
        .as_array()
        .ok_or_else(|| WeatherError::MalformedPayload(format!("`hourly.{name}` is not an array")))
}

fn parse_time(raw: &Value, offset: TimeDelta) -> Result<DateTime<Utc>, WeatherError> {
    let parsed = match raw {
        Value::String(text) => parse_naive(text).map(|naive| naive.into_utc() - offset),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    };
    parsed.ok_or_else(|| WeatherError::MalformedPayload(format!("invalid time value {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use serde_json::json;

    fn utc(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn sample() -> HourlyWeather {
        HourlyWeather::from_payload(&json!({
            "utc_offset_seconds": 3600,
            "hourly": {
                "time": ["2024-01-01T01:00", "2024-01-01T02:00", "2024-01-01T03:00"],
                "temperature_2m": [1.0, null, 3.0],
                "cloud_cover": [10, 20, 30]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_payload_is_shifted_to_utc() {
        let weather = sample();
        assert_eq!(weather.timestamps(), &[utc(0, 0), utc(1, 0), utc(2, 0)]);
        assert_eq!(
            weather.variable_names().collect::<Vec<_>>(),
            vec!["cloud_cover", "temperature_2m"]
        );
        assert_eq!(weather.variable("temperature_2m"), Some(&[Some(1.0), None, Some(3.0)][..]));
    }

    #[test]
    fn test_missing_hourly_block_is_empty() -> Result<(), WeatherError> {
        let weather = HourlyWeather::from_payload(&json!({"latitude": 47.5}))?;
        assert!(weather.is_empty());
        assert_eq!(weather.to_dataframe().map(|df| df.height()).ok(), Some(0));
        Ok(())
    }

    #[test]
    fn test_inconsistent_payloads_are_rejected() {
        let short = json!({"hourly": {"time": ["2024-01-01T00:00", "2024-01-01T01:00"], "x": [1.0]}});
        let bad_time = json!({"hourly": {"time": ["yesterday"], "x": [1.0]}});
        let text_value = json!({"hourly": {"time": ["2024-01-01T00:00"], "x": ["warm"]}});
        for payload in [short, bad_time, text_value] {
            assert!(matches!(
                HourlyWeather::from_payload(&payload),
                Err(WeatherError::MalformedPayload(_))
            ));
        }
    }

    #[test]
    fn test_nearest_respects_tolerance_and_ties() {
        let weather = sample();
        let hour = TimeDelta::hours(1);
        assert_eq!(weather.nearest(utc(0, 20), hour), Some(0));
        assert_eq!(weather.nearest(utc(0, 40), hour), Some(1));
        assert_eq!(weather.nearest(utc(1, 30), hour), Some(1));
        assert_eq!(weather.nearest(utc(3, 0), hour), Some(2));
        assert_eq!(weather.nearest(utc(3, 1), hour), None);
        assert_eq!(weather.nearest(utc(0, 0) - TimeDelta::minutes(61), hour), None);
    }

    #[test]
    fn test_merge_attaches_nearest_weather() {
        let weather = sample();
        let zone: Tz = "Europe/Budapest".parse().unwrap();
        let records = vec![
            ConsumptionRecord::new(utc(2, 10).with_timezone(&zone), 0.5),
            ConsumptionRecord::new(utc(6, 0).with_timezone(&zone), 0.7),
        ];

        let merged = merge_weather(&records, &weather, TimeDelta::hours(1));

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].record, records[0]);
        assert_eq!(merged[0].weather["temperature_2m"], Some(3.0));
        assert_eq!(merged[0].weather["cloud_cover"], Some(30.0));
        assert!(merged[1].weather.values().all(Option::is_none));
    }
}
