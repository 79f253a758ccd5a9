//! Feature construction for a single forecast day
//!
//! Feature names match the columns of the engineered training dataset so a
//! built vector can be aligned directly against a model's feature list.

use crate::data::HistoricalRecord;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use price_math::{day_of_week, is_monsoon, lag_or_earliest, trailing_mean, trailing_mean_or, LAG_OFFSETS};
use serde::{Deserialize, Serialize};

/// Number of trailing rows averaged by the window features
pub const ROLLING_WINDOW: usize = 7;

pub const AVG_PRICE_7D_MEAN: &str = "avg_price_7d_mean";
pub const MIN_PRICE: &str = "min_price";
pub const MAX_PRICE: &str = "max_price";
pub const MONTH: &str = "month";
pub const DAY_OF_WEEK: &str = "day_of_week";
pub const IS_MONSOON: &str = "is_monsoon";
pub const RAINFALL_MM: &str = "rainfall_mm";
pub const FESTIVAL_FLAG: &str = "festival_flag";

/// Name of the positional price lag feature for offset `k`
pub fn lag_feature_name(k: usize) -> String {
    format!("avg_price_lag_{}", k)
}

/// Ordered named feature values; `NAN` marks a value that is not available
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a feature, replacing any earlier value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut vector = FeatureVector::new();
        for (name, value) in iter {
            vector.insert(name, value);
        }
        vector
    }
}

/// Build the feature vector for `target_date` from an item's history.
///
/// `item_column` is the indicator column of the item being forecast and
/// `item_columns` every known indicator column; exactly one of them is set
/// to 1. History shorter than a lag falls back to the earliest price, and an
/// empty history leaves the price features as `NAN`.
pub fn build_features(
    history: &[HistoricalRecord],
    target_date: NaiveDate,
    item_column: &str,
    item_columns: &[String],
) -> FeatureVector {
    let prices: Vec<f64> = history.iter().map(|r| r.avg_price).collect();
    let mins: Vec<f64> = history.iter().map(|r| r.min_price).collect();
    let maxs: Vec<f64> = history.iter().map(|r| r.max_price).collect();
    let rainfall: Vec<f64> = history.iter().map(|r| r.rainfall_mm).collect();

    let mut features = FeatureVector::new();

    for k in LAG_OFFSETS {
        features.insert(lag_feature_name(k), lag_or_earliest(&prices, k));
    }
    features.insert(AVG_PRICE_7D_MEAN, trailing_mean(&prices, ROLLING_WINDOW));
    features.insert(MIN_PRICE, trailing_mean(&mins, ROLLING_WINDOW));
    features.insert(MAX_PRICE, trailing_mean(&maxs, ROLLING_WINDOW));

    features.insert(MONTH, target_date.month() as f64);
    features.insert(DAY_OF_WEEK, day_of_week(target_date) as f64);
    features.insert(IS_MONSOON, if is_monsoon(target_date) { 1.0 } else { 0.0 });

    features.insert(RAINFALL_MM, trailing_mean_or(&rainfall, ROLLING_WINDOW, 0.0));
    // No holiday calendar is consulted for future dates
    features.insert(FESTIVAL_FLAG, 0.0);

    for column in item_columns {
        features.insert(column.as_str(), if column == item_column { 1.0 } else { 0.0 });
    }

    features
}

/// How to treat model features the computed vector does not provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlignmentPolicy {
    /// Fill missing features with 0
    #[default]
    Lenient,
    /// Fail when any model feature is missing
    Strict,
}

/// Order a feature vector by the model's feature list.
///
/// The result has exactly one value per model feature, in model order.
/// Computed features unknown to the model are dropped.
pub fn align_features(
    features: &FeatureVector,
    model_features: &[String],
    policy: AlignmentPolicy,
) -> Result<Vec<f64>> {
    if policy == AlignmentPolicy::Strict {
        let missing: Vec<String> = model_features
            .iter()
            .filter(|name| !features.contains(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ForecastError::FeatureMismatch(missing));
        }
    }

    Ok(model_features
        .iter()
        .map(|name| features.get(name).unwrap_or(0.0))
        .collect())
}
