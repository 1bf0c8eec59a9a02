//! Synthetic hourly consumption for running the pipeline without a meter export.

use crate::types::record::ConsumptionRecord;
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

const BASE_LOAD: f64 = 0.8;
const AMPLITUDE: f64 = 0.2;
// radians swept by the sine over the whole series
const PHASE_SPAN: f64 = 10.0;
const NOISE_STD: f64 = 0.05;

/// Generates `days * 24` hourly readings starting at `start`: a slow sine
/// around 0.8 with Gaussian noise (σ = 0.05).
///
/// The same `seed` always yields the same values; `None` seeds from entropy.
pub fn demo_consumption(
    days: u32,
    start: DateTime<Utc>,
    seed: Option<u64>,
) -> Vec<ConsumptionRecord> {
    let mut rng = seed
        .map(StdRng::seed_from_u64)
        .unwrap_or_else(StdRng::from_entropy);
    let n = days as usize * 24;
    let step = if n > 1 {
        PHASE_SPAN / (n - 1) as f64
    } else {
        0.0
    };

    let records: Vec<ConsumptionRecord> = (0..n)
        .map(|i| {
            let base = BASE_LOAD + AMPLITUDE * (step * i as f64).sin();
            let noise = NOISE_STD * standard_normal(&mut rng);
            let timestamp = (start + TimeDelta::hours(i as i64)).with_timezone(&Tz::UTC);
            ConsumptionRecord::new(timestamp, base + noise)
        })
        .collect();
    info!("Generated {} demo readings over {} days", records.len(), days);
    records
}

fn standard_normal(rng: &mut impl Rng) -> f64 {
    // Box-Muller; 1 - u keeps the log argument in (0, 1]
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}
