//! Moving average calculations
//!
//! Contains:
//! - Trailing means over the last `window` values of a slice
//! - Full-window rolling means over a whole series

use crate::{MathError, Result};

/// Mean of the non-`NAN` values among the last `window` (or all of them
/// when fewer exist).
///
/// Returns `f64::NAN` when that window holds no value.
pub fn trailing_mean(values: &[f64], window: usize) -> f64 {
    trailing_mean_or(values, window, f64::NAN)
}

/// Same as [`trailing_mean`] but returns `default` when nothing is available.
pub fn trailing_mean_or(values: &[f64], window: usize, default: f64) -> f64 {
    let tail = &values[values.len().saturating_sub(window)..];
    let (sum, count) = tail
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        default
    } else {
        sum / count as f64
    }
}

/// Rolling mean over a full window, aligned to the window's last element.
///
/// Positions with fewer than `window` values behind them are `NAN`, and a
/// window containing a `NAN` yields `NAN`.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<f64>> {
    if window == 0 {
        return Err(MathError::InvalidInput(
            "Window must be greater than zero".to_string(),
        ));
    }

    let means = (0..values.len())
        .map(|i| {
            if i + 1 < window {
                f64::NAN
            } else {
                let slice = &values[i + 1 - window..=i];
                slice.iter().sum::<f64>() / window as f64
            }
        })
        .collect();

    Ok(means)
}
