//! Run configuration
//!
//! Every field has a default, so a JSON config file only needs the values it
//! changes. Command-line flags are applied on top by the binary.

use crate::data::DEFAULT_ITEM_PREFIX;
use crate::error::{ForecastError, Result};
use crate::features::AlignmentPolicy;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for a batch forecast run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Engineered historical dataset (CSV or Parquet)
    pub data_path: PathBuf,
    /// Model bundle (JSON)
    pub model_path: PathBuf,
    /// Forecast CSV, overwritten on every run
    pub output_path: PathBuf,
    /// Days forecast per item
    pub horizon_days: usize,
    /// Trailing rows of each item's history seeding the forecast
    pub history_days: usize,
    /// Items with fewer seed rows are skipped
    pub min_history: usize,
    /// Prefix of the one-hot item columns
    pub item_prefix: String,
    pub alignment: AlignmentPolicy,
    /// Forecast items on the rayon thread pool
    pub parallel: bool,
    /// First forecast date; `None` starts the day after each item's last record
    pub start_date: Option<NaiveDate>,
    pub prepare: PrepareConfig,
    /// Rows dated on or after this date form the evaluation set
    pub split_date: NaiveDate,
}

/// Inputs and output of training-data preparation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    pub prices_path: PathBuf,
    pub rainfall_path: PathBuf,
    pub holidays_path: PathBuf,
    pub output_path: PathBuf,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/final_training_data.csv"),
            model_path: PathBuf::from("models/price_model.json"),
            output_path: PathBuf::from("data/forecasts/next_7_days_forecast.csv"),
            horizon_days: 7,
            history_days: 14,
            min_history: 7,
            item_prefix: DEFAULT_ITEM_PREFIX.to_string(),
            alignment: AlignmentPolicy::Lenient,
            parallel: false,
            start_date: None,
            prepare: PrepareConfig::default(),
            split_date: NaiveDate::from_ymd_opt(2023, 7, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}

impl Default for PrepareConfig {
    fn default() -> Self {
        Self {
            prices_path: PathBuf::from("data/kalimati_prices.csv"),
            rainfall_path: PathBuf::from("data/rainfall.csv"),
            holidays_path: PathBuf::from("data/holidays.csv"),
            output_path: PathBuf::from("data/final_training_data.csv"),
        }
    }
}

impl ForecastConfig {
    /// Load a config file, filling unspecified fields with defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ForecastError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            ForecastError::ConfigError(format!("Invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the numeric settings are usable together
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days == 0 {
            return Err(ForecastError::ConfigError(
                "horizon_days must be positive".to_string(),
            ));
        }
        if self.history_days == 0 {
            return Err(ForecastError::ConfigError(
                "history_days must be positive".to_string(),
            ));
        }
        if self.min_history > self.history_days {
            return Err(ForecastError::ConfigError(format!(
                "min_history ({}) cannot exceed history_days ({})",
                self.min_history, self.history_days
            )));
        }
        if self.item_prefix.is_empty() {
            return Err(ForecastError::ConfigError(
                "item_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a forecast run starts when launched from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPolicy {
    /// An explicit start date, or the config file's, or else today
    #[default]
    Today,
    /// Ignore any configured date and start today
    ForceToday,
    /// Each item starts the day after its own last record
    FromHistory,
    /// A fixed start date
    Date(NaiveDate),
}

impl ForecastConfig {
    /// Settle `start_date` for a command-line run.
    ///
    /// An explicit date wins, then the forced or per-item policies, then a
    /// date from the config file, and finally `today`.
    pub fn resolve_start_date(&mut self, policy: StartPolicy, today: NaiveDate) {
        self.start_date = match policy {
            StartPolicy::Date(date) => Some(date),
            StartPolicy::ForceToday => Some(today),
            StartPolicy::FromHistory => None,
            StartPolicy::Today => self.start_date.or(Some(today)),
        };
    }
}
