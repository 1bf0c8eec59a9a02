//! Places an irregular consumption series onto a fixed-interval grid.

use crate::data::error::PrepError;
use crate::types::interval::Interval;
use crate::types::record::{ConsumptionRecord, UniformSeries};
use chrono::TimeDelta;
use chrono_tz::Tz;
use log::{debug, info, warn};

/// Resamples `records` onto a gap-free grid at `interval`.
///
/// The grid runs from the earliest to the latest timestamp, both inclusive
/// when on-grid. Readings that sit exactly on a grid slot keep their value;
/// everything else on the grid is filled by linear interpolation between
/// the nearest observed neighbours. Slots before the first or after the last
/// observation take that observation's value.
///
/// When two readings share a timestamp the later one in input order wins.
/// Readings that fall between grid slots are ignored.
///
/// # Errors
///
/// * [`PrepError::EmptySeries`] when `records` is empty.
/// * [`PrepError::NoObservations`] when no reading carries a value.
pub fn resample(
    records: &[ConsumptionRecord],
    target_timezone: Option<Tz>,
    interval: Interval,
) -> Result<UniformSeries, PrepError> {
    let (Some(first), Some(last)) = (
        records.iter().min_by_key(|r| r.timestamp),
        records.iter().max_by_key(|r| r.timestamp),
    ) else {
        return Err(PrepError::EmptySeries);
    };

    let zone = target_timezone.unwrap_or_else(|| first.timestamp.timezone());
    let start = first.timestamp.with_timezone(&zone);
    let end = last.timestamp.with_timezone(&zone);
    let step = interval.as_millis();
    let slots = ((end - start).num_milliseconds() / step) as usize + 1;

    let mut grid: Vec<Option<f64>> = vec![None; slots];
    let mut seen = vec![false; slots];
    let mut duplicates = 0usize;
    let mut off_grid = 0usize;

    for record in records {
        let Some(slot) = grid_slot(record.timestamp - start, step) else {
            off_grid += 1;
            continue;
        };
        if seen[slot] {
            duplicates += 1;
        }
        seen[slot] = true;
        grid[slot] = record.is_observed().then_some(record.consumption);
    }

    if duplicates > 0 {
        warn!(
            "{} duplicate timestamps while resampling; keeping the last value for each",
            duplicates
        );
    }
    if off_grid > 0 {
        debug!("{} readings fall between {} grid slots", off_grid, interval);
    }

    let values = fill_gaps(&grid)?;
    let records = values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let offset = TimeDelta::milliseconds(step * i as i64);
            ConsumptionRecord::new(start + offset, value)
        })
        .collect::<Vec<_>>();

    info!("Resampled to {} frequency with {} rows", interval, records.len());
    Ok(UniformSeries::from_parts(interval, records))
}

fn grid_slot(offset: TimeDelta, step: i64) -> Option<usize> {
    let millis = offset.num_milliseconds();
    let sub_millis = offset.subsec_nanos() % 1_000_000;
    (millis >= 0 && sub_millis == 0 && millis % step == 0).then(|| (millis / step) as usize)
}

/// Linear interpolation between observed neighbours, with the edges taking
/// the nearest observation.
fn fill_gaps(grid: &[Option<f64>]) -> Result<Vec<f64>, PrepError> {
    let observed: Vec<(usize, f64)> = grid
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|value| (i, value)))
        .collect();
    let (Some(&(first_idx, first_val)), Some(&(last_idx, last_val))) =
        (observed.first(), observed.last())
    else {
        return Err(PrepError::NoObservations);
    };

    let mut filled = vec![first_val; grid.len()];
    for pair in observed.windows(2) {
        let (left_idx, left_val) = pair[0];
        let (right_idx, right_val) = pair[1];
        let span = (right_idx - left_idx) as f64;
        for (step, slot) in filled[left_idx..=right_idx].iter_mut().enumerate() {
            *slot = left_val + (right_val - left_val) * step as f64 / span;
        }
    }
    filled[first_idx] = first_val;
    for slot in filled[last_idx..].iter_mut() {
        *slot = last_val;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    fn record(hour: u32, value: f64) -> ConsumptionRecord {
        ConsumptionRecord::new(at(hour, 0), value)
    }

    #[test]
    fn test_linear_interpolation_fills_gap() -> Result<(), PrepError> {
        let series = resample(&[record(0, 1.0), record(2, 3.0)], None, Interval::HOURLY)?;

        assert_eq!(series.len(), 3);
        assert_eq!(series.values(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.timestamps(), vec![at(0, 0), at(1, 0), at(2, 0)]);
        Ok(())
    }

    #[test]
    fn test_length_matches_span_and_no_missing_values() -> Result<(), PrepError> {
        let input = vec![
            record(0, 5.0),
            record(3, f64::NAN),
            record(7, 1.0),
            record(4, 2.0),
            record(11, 9.0),
        ];
        let series = resample(&input, None, Interval::HOURLY)?;

        assert_eq!(series.len(), 12);
        assert!(series.values().iter().all(|v| v.is_finite()));
        assert_eq!(series.start(), Some(at(0, 0)));
        assert_eq!(series.end(), Some(at(11, 0)));
        Ok(())
    }

    #[test]
    fn test_uniform_series_is_unchanged() -> Result<(), PrepError> {
        let input: Vec<ConsumptionRecord> =
            (0..24).map(|h| record(h, (h * h) as f64 * 0.5)).collect();
        let once = resample(&input, None, Interval::HOURLY)?;
        let twice = resample(once.records(), None, Interval::HOURLY)?;

        assert_eq!(once.records(), input.as_slice());
        assert_eq!(once, twice);
        Ok(())
    }

    #[test]
    fn test_missing_edges_take_nearest_observation() -> Result<(), PrepError> {
        let input = vec![
            record(0, f64::NAN),
            record(1, f64::NAN),
            record(2, 4.0),
            record(3, 6.0),
            record(4, f64::NAN),
        ];
        let series = resample(&input, None, Interval::HOURLY)?;
        assert_eq!(series.values(), vec![4.0, 4.0, 4.0, 6.0, 6.0]);
        Ok(())
    }

    #[test]
    fn test_off_grid_readings_do_not_land_on_grid() -> Result<(), PrepError> {
        let input = vec![
            record(0, 0.0),
            ConsumptionRecord::new(at(1, 30), 100.0),
            record(2, 2.0),
        ];
        let series = resample(&input, None, Interval::HOURLY)?;
        assert_eq!(series.values(), vec![0.0, 1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_duplicate_timestamp_keeps_last_value() -> Result<(), PrepError> {
        let input = vec![record(0, 1.0), record(1, 5.0), record(1, 7.0), record(2, 3.0)];
        let series = resample(&input, None, Interval::HOURLY)?;
        assert_eq!(series.values(), vec![1.0, 7.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_sub_hourly_interval() -> Result<(), PrepError> {
        let input = vec![record(0, 0.0), record(1, 4.0)];
        let series = resample(&input, None, Interval::minutes(15)?)?;
        assert_eq!(series.values(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        Ok(())
    }

    #[test]
    fn test_target_timezone_keeps_instants() -> Result<(), PrepError> {
        let zone: Tz = "Europe/Budapest".parse().unwrap();
        let series = resample(&[record(0, 1.0), record(1, 2.0)], Some(zone), Interval::HOURLY)?;
        let first = series.start().unwrap();
        assert_eq!(first.timezone(), zone);
        assert_eq!(
            first.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        Ok(())
    }

    #[test]
    fn test_empty_and_unobserved_inputs_fail() {
        assert!(matches!(
            resample(&[], None, Interval::HOURLY),
            Err(PrepError::EmptySeries)
        ));
        assert!(matches!(
            resample(&[record(0, f64::NAN), record(1, f64::NAN)], None, Interval::HOURLY),
            Err(PrepError::NoObservations)
        ));
    }
}
