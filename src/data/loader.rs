//! Reads raw consumption exports into chronologically sorted records.

use crate::data::error::PrepError;
use crate::types::record::ConsumptionRecord;
use crate::types::timestamp::parse_utc;
use chrono_tz::Tz;
use log::{debug, info};
use polars::prelude::*;
use std::path::Path;

/// Columns every consumption export must carry. Others are ignored.
pub const REQUIRED_COLUMNS: [&str; 2] = ["timestamp", "consumption"];

/// Resolves an IANA zone name such as `"Europe/Budapest"`.
pub fn parse_timezone(name: &str) -> Result<Tz, PrepError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| PrepError::Config(format!("unknown timezone '{name}'")))
}

/// Loads a consumption CSV with `timestamp` and `consumption` columns.
///
/// Timestamps are parsed as UTC and, if `target_timezone` is given, shown in
/// that zone. The result is sorted ascending by timestamp. Consumption cells
/// that are empty or not numeric are kept as `NaN`.
///
/// # Errors
///
/// * [`PrepError::CsvRead`] if the file cannot be read as CSV.
/// * [`PrepError::Schema`] listing every missing required column.
/// * [`PrepError::Parse`] on the first unparseable timestamp.
pub fn load_consumption_csv(
    path: impl AsRef<Path>,
    target_timezone: Option<Tz>,
) -> Result<Vec<ConsumptionRecord>, PrepError> {
    let path = path.as_ref();
    info!("Loading consumption data from {}", path.display());

    // every column as text; numbers are cast leniently below
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| PrepError::CsvRead(path.to_path_buf(), e))?
        .finish()
        .map_err(|e| PrepError::CsvRead(path.to_path_buf(), e))?;

    records_from_frame(&df, target_timezone)
}

/// Extracts consumption records from an already loaded frame.
pub fn records_from_frame(
    df: &DataFrame,
    target_timezone: Option<Tz>,
) -> Result<Vec<ConsumptionRecord>, PrepError> {
    let names: Vec<&str> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !names.contains(*required))
        .map(|required| required.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PrepError::Schema(missing));
    }

    let timestamp_column = df.column("timestamp")?.cast(&DataType::String)?;
    let timestamps = timestamp_column.as_materialized_series().str()?;
    let consumption_column = df.column("consumption")?.cast(&DataType::Float64)?;
    let consumption = consumption_column.as_materialized_series().f64()?;

    let zone = target_timezone.unwrap_or(Tz::UTC);
    let mut records = Vec::with_capacity(df.height());
    for (row, (raw_ts, value)) in timestamps.into_iter().zip(consumption.into_iter()).enumerate() {
        let timestamp = raw_ts.and_then(parse_utc).ok_or_else(|| PrepError::Parse {
            row,
            value: raw_ts.unwrap_or_default().to_string(),
        })?;
        records.push(ConsumptionRecord::new(
            timestamp.with_timezone(&zone),
            value.unwrap_or(f64::NAN),
        ));
    }

    records.sort_by_key(|r| r.timestamp);
    debug!("Loaded {} consumption records", records.len());
    Ok(records)
}
