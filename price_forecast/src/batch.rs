//! Batch forecasting across every known item
//!
//! Items are forecast independently. A failure in one item is recorded in
//! its [`ItemReport`] and does not stop the others; the batch fails only
//! when no item produced a forecast.

use crate::config::ForecastConfig;
use crate::data::{ItemHistories, ItemHistory};
use crate::error::{ForecastError, Result};
use crate::features::build_features;
use crate::forecaster::{ForecastRecord, RecursiveForecaster};
use crate::model::PriceRegressor;
use rayon::prelude::*;

/// What happened to one item during a batch run
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// Forecast produced
    Forecast(Vec<ForecastRecord>),
    /// Not enough history to forecast
    Skipped { rows: usize },
    /// Forecasting aborted with an error
    Failed(String),
}

/// Outcome of one item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemReport {
    pub item: String,
    pub outcome: ItemOutcome,
}

/// Outcomes of a batch run, in item order
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    reports: Vec<ItemReport>,
}

impl BatchReport {
    pub fn reports(&self) -> &[ItemReport] {
        &self.reports
    }

    /// All forecast rows, item by item
    pub fn records(&self) -> Vec<ForecastRecord> {
        self.reports
            .iter()
            .filter_map(|r| match &r.outcome {
                ItemOutcome::Forecast(records) => Some(records.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Forecast(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Forecast every item in `histories`, or only `only_item` when given
pub fn run_batch(
    model: &dyn PriceRegressor,
    histories: &ItemHistories,
    config: &ForecastConfig,
    only_item: Option<&str>,
) -> Result<BatchReport> {
    config.validate()?;

    let selected: Vec<&ItemHistory> = match only_item {
        Some(item) => {
            let history = histories
                .get(item)
                .ok_or_else(|| ForecastError::UnknownItem(item.to_string()))?;
            vec![history]
        }
        None => histories.iter().collect(),
    };

    let forecaster = RecursiveForecaster::new(model, histories.item_columns(), config.item_prefix.as_str())
        .with_alignment(config.alignment)
        .with_min_history(config.min_history);

    warn_uncomputed_features(model, histories);
    log::info!(
        "Forecasting {} days for {} items with '{}'",
        config.horizon_days,
        selected.len(),
        model.name()
    );

    let run = |history: &&ItemHistory| forecast_item(&forecaster, history, config);
    let reports: Vec<ItemReport> = if config.parallel {
        selected.par_iter().map(run).collect()
    } else {
        selected.iter().map(run).collect()
    };

    let report = BatchReport { reports };
    log::info!(
        "Batch finished: {} forecast, {} skipped, {} failed",
        report.succeeded(),
        report.skipped(),
        report.failed()
    );

    if report.succeeded() == 0 {
        return Err(ForecastError::NoForecasts);
    }
    Ok(report)
}

fn forecast_item(
    forecaster: &RecursiveForecaster<'_>,
    history: &ItemHistory,
    config: &ForecastConfig,
) -> ItemReport {
    let seed = history.tail(config.history_days);
    let outcome = match forecaster.forecast(
        history.name(),
        seed,
        config.start_date,
        config.horizon_days,
    ) {
        Ok(records) => {
            log::info!("Forecast {} ({} days)", history.name(), records.len());
            ItemOutcome::Forecast(records)
        }
        Err(ForecastError::InsufficientHistory { rows, .. }) => {
            log::warn!(
                "Skipping {}, not enough history ({} rows)",
                history.name(),
                rows
            );
            ItemOutcome::Skipped { rows }
        }
        Err(e) => {
            log::warn!("Forecast for {} failed: {}", history.name(), e);
            ItemOutcome::Failed(e.to_string())
        }
    };

    ItemReport {
        item: history.name().to_string(),
        outcome,
    }
}

/// Log model features the builder never produces; they are filled with 0
fn warn_uncomputed_features(model: &dyn PriceRegressor, histories: &ItemHistories) {
    let columns = histories.item_columns();
    let Some(first) = columns.first() else {
        return;
    };
    let computed = build_features(&[], chrono::NaiveDate::MIN, first, &columns);
    let missing: Vec<&str> = model
        .feature_names()
        .iter()
        .map(String::as_str)
        .filter(|name| !computed.contains(name))
        .collect();

    if !missing.is_empty() {
        log::warn!("Model features not computed by the feature builder: {:?}", missing);
    }
}
