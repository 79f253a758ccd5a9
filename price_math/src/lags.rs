//! Positional lag lookups
//!
//! Lags are taken by position within an ordered series, not by calendar
//! offset, so gaps in the underlying dates do not change which value is
//! returned.

/// Lag offsets used for price features
pub const LAG_OFFSETS: [usize; 4] = [1, 3, 7, 14];

/// Value `k` positions back from the end of `values`.
///
/// When the series holds fewer than `k` values the earliest value is
/// returned instead. An empty series yields `f64::NAN`.
///
/// # Examples
///
/// ```
/// use price_math::lag_or_earliest;
///
/// let prices = [10.0, 20.0, 30.0];
/// assert_eq!(lag_or_earliest(&prices, 1), 30.0);
/// assert_eq!(lag_or_earliest(&prices, 3), 10.0);
/// assert_eq!(lag_or_earliest(&prices, 7), 10.0);
/// assert!(lag_or_earliest(&[], 1).is_nan());
/// ```
pub fn lag_or_earliest(values: &[f64], k: usize) -> f64 {
    match values.len() {
        0 => f64::NAN,
        n if k >= 1 && n >= k => values[n - k],
        _ => values[0],
    }
}

/// Shift a series forward by `k` positions, padding the head with `NAN`.
///
/// `shifted[i] == values[i - k]` for `i >= k`.
pub fn shift(values: &[f64], k: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| if i >= k { values[i - k] } else { f64::NAN })
        .collect()
}
