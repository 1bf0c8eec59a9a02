//! Sliding (context, horizon) windows for sequence models.

use crate::data::error::PrepError;
use crate::types::record::UniformSeries;
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub window: usize,
    pub horizon: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window: 168,
            horizon: 24,
        }
    }
}

/// Paired input/target windows stored row-major.
///
/// `x` has shape `[n_samples, window]` and `y` has shape `[n_samples, horizon]`.
/// Deserialized tensors are shape-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWindowTensors")]
pub struct WindowTensors {
    window: usize,
    horizon: usize,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl WindowTensors {
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn n_samples(&self) -> usize {
        self.x.len() / self.window
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x_shape(&self) -> (usize, usize) {
        (self.n_samples(), self.window)
    }

    pub fn y_shape(&self) -> (usize, usize) {
        (self.n_samples(), self.horizon)
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn x_row(&self, index: usize) -> Option<&[f64]> {
        self.x.get(index * self.window..(index + 1) * self.window)
    }

    pub fn y_row(&self, index: usize) -> Option<&[f64]> {
        self.y.get(index * self.horizon..(index + 1) * self.horizon)
    }

    /// Iterates `(x_row, y_row)` pairs in ascending start order.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64], &[f64])> + '_ {
        self.x
            .chunks_exact(self.window)
            .zip(self.y.chunks_exact(self.horizon))
    }

    fn validate(&self) -> Result<(), PrepError> {
        check_sizes(self.window, self.horizon)?;
        let rows = self.x.len() / self.window;
        if self.x.len() % self.window != 0 || self.y.len() != rows * self.horizon {
            return Err(PrepError::Config(format!(
                "window tensors do not match shape [{rows}, {}] / [{rows}, {}]",
                self.window, self.horizon
            )));
        }
        Ok(())
    }
}

/// Slices `values` into every `(values[i..i+window], values[i+window..i+window+horizon])`.
///
/// A series shorter than `window + horizon` yields zero samples.
///
/// # Errors
///
/// [`PrepError::Config`] when `window` or `horizon` is zero.
///
/// # Examples
///
/// ```
/// use energy_forecast::sliding_window;
///
/// let tensors = sliding_window(&[10.0, 20.0, 30.0, 40.0, 50.0], 3, 2).unwrap();
/// assert_eq!(tensors.n_samples(), 1);
/// assert_eq!(tensors.x_row(0), Some(&[10.0, 20.0, 30.0][..]));
/// assert_eq!(tensors.y_row(0), Some(&[40.0, 50.0][..]));
/// ```
pub fn sliding_window(
    values: &[f64],
    window: usize,
    horizon: usize,
) -> Result<WindowTensors, PrepError> {
    check_sizes(window, horizon)?;
    let span = window + horizon;
    let samples = (values.len() + 1).saturating_sub(span);

    let mut x = Vec::with_capacity(samples * window);
    let mut y = Vec::with_capacity(samples * horizon);
    for chunk in values.windows(span) {
        x.extend_from_slice(&chunk[..window]);
        y.extend_from_slice(&chunk[window..]);
    }

    let tensors = WindowTensors {
        window,
        horizon,
        x,
        y,
    };
    info!(
        "Built sliding windows: X={:?}, y={:?}",
        tensors.x_shape(),
        tensors.y_shape()
    );
    Ok(tensors)
}

#[derive(Deserialize)]
struct RawWindowTensors {
    window: usize,
    horizon: usize,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl TryFrom<RawWindowTensors> for WindowTensors {
    type Error = PrepError;

    fn try_from(raw: RawWindowTensors) -> Result<Self, Self::Error> {
        let tensors = WindowTensors {
            window: raw.window,
            horizon: raw.horizon,
            x: raw.x,
            y: raw.y,
        };
        tensors.validate()?;
        Ok(tensors)
    }
}

pub fn build_transformer_windows(
    series: &UniformSeries,
    config: WindowConfig,
) -> Result<WindowTensors, PrepError> {
    sliding_window(&series.values(), config.window, config.horizon)
}

fn check_sizes(window: usize, horizon: usize) -> Result<(), PrepError> {
    if window == 0 || horizon == 0 {
        return Err(PrepError::Config(format!(
            "window and horizon must be positive (window={window}, horizon={horizon})"
        )));
    }
    Ok(())
}
