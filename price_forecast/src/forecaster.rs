//! Recursive multi-step forecasting
//!
//! Each predicted price is appended to a working copy of the item's history
//! so that the next day's lag and window features see it as if it had been
//! observed.

use crate::data::HistoricalRecord;
use crate::error::{ForecastError, Result};
use crate::features::{align_features, build_features, AlignmentPolicy};
use crate::model::PriceRegressor;
use crate::utils::{add_days, previous_day, round2};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One forecast day for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    #[serde(rename = "vegetable")]
    pub item: String,
    /// Rounded to two decimal places
    pub predicted_price: f64,
}

/// Forecasts items one day at a time against a shared model
#[derive(Debug, Clone)]
pub struct RecursiveForecaster<'a> {
    model: &'a dyn PriceRegressor,
    /// Indicator columns of every known item
    item_columns: Vec<String>,
    item_prefix: String,
    alignment: AlignmentPolicy,
    min_history: usize,
}

impl<'a> RecursiveForecaster<'a> {
    /// Create a forecaster with lenient alignment and a minimum history of 7 rows
    pub fn new(
        model: &'a dyn PriceRegressor,
        item_columns: Vec<String>,
        item_prefix: impl Into<String>,
    ) -> Self {
        Self {
            model,
            item_columns,
            item_prefix: item_prefix.into(),
            alignment: AlignmentPolicy::Lenient,
            min_history: 7,
        }
    }

    pub fn with_alignment(mut self, alignment: AlignmentPolicy) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_min_history(mut self, min_history: usize) -> Self {
        self.min_history = min_history;
        self
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }

    /// Forecast `horizon_days` consecutive days for `item`.
    ///
    /// `seed_history` must be sorted by date. When `start_date` is given and
    /// the seed ends before it, a copy of the last row dated `start_date - 1`
    /// is appended, even if the seed already ends on that day. Synthetic rows
    /// carry the raw prediction as `avg_price` and every other field from the
    /// prior row.
    pub fn forecast(
        &self,
        item: &str,
        seed_history: &[HistoricalRecord],
        start_date: Option<NaiveDate>,
        horizon_days: usize,
    ) -> Result<Vec<ForecastRecord>> {
        if seed_history.len() < self.min_history || seed_history.is_empty() {
            return Err(ForecastError::InsufficientHistory {
                item: item.to_string(),
                rows: seed_history.len(),
                required: self.min_history.max(1),
            });
        }

        let item_column = format!("{}{}", self.item_prefix, item);
        let mut history = seed_history.to_vec();
        let mut last = history[history.len() - 1].clone();

        if let Some(start) = start_date {
            if last.date < start {
                let bridge_date = previous_day(start)?;
                log::debug!("{}: bridging {} -> {}", item, last.date, bridge_date);
                last.date = bridge_date;
                history.push(last.clone());
            }
        }

        let model_features = self.model.feature_names();
        let mut records = Vec::with_capacity(horizon_days);

        for _ in 0..horizon_days {
            let next_date = add_days(last.date, 1)?;
            let features = build_features(&history, next_date, &item_column, &self.item_columns);
            let row = align_features(&features, model_features, self.alignment)?;

            let price = self.model.predict(&row).map_err(|e| match e {
                ForecastError::InferenceError(msg) => {
                    ForecastError::InferenceError(format!("{} on {}: {}", item, next_date, msg))
                }
                other => other,
            })?;
            log::debug!("{} {} -> {:.4}", item, next_date, price);

            records.push(ForecastRecord {
                date: next_date,
                item: item.to_string(),
                predicted_price: round2(price),
            });

            last.date = next_date;
            last.avg_price = price;
            history.push(last.clone());
        }

        Ok(records)
    }
}
