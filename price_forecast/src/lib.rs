//! # Price Forecast
//!
//! Recursive multi-step forecasting of daily vegetable prices.
//!
//! ## Features
//!
//! - Historical dataset loading (CSV or Parquet) split into per-item histories
//! - Lag, weekly-mean, calendar and one-hot features for each forecast day
//! - Alignment of computed features to a model's expected feature list
//! - Gradient-boosted tree ensembles loaded from JSON tree dumps
//! - Recursive forecasting that feeds each prediction back into the history
//! - Batch runs with per-item failure isolation and optional parallelism
//! - Training-data preparation from raw price, rainfall and holiday sheets
//! - Hold-out evaluation (MAE, RMSE, R²)
//!
//! ## Quick Start
//!
//! ```no_run
//! use price_forecast::{run_batch, write_forecasts, DataLoader, ForecastConfig, TreeEnsemble};
//!
//! let config = ForecastConfig::default();
//! let histories = DataLoader::from_path(&config.data_path, &config.item_prefix)?;
//! let model = TreeEnsemble::from_json_file(&config.model_path)?;
//!
//! let report = run_batch(&model, &histories, &config, None)?;
//! write_forecasts(&config.output_path, &report.records())?;
//! # Ok::<(), price_forecast::ForecastError>(())
//! ```

pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod metrics;
pub mod model;
pub mod output;
pub mod prepare;
pub mod utils;

// Re-export commonly used types
pub use crate::batch::{run_batch, BatchReport, ItemOutcome, ItemReport};
pub use crate::config::{ForecastConfig, PrepareConfig, StartPolicy};
pub use crate::data::{DataLoader, HistoricalRecord, ItemHistories, ItemHistory};
pub use crate::error::{ForecastError, Result};
pub use crate::features::{align_features, build_features, AlignmentPolicy, FeatureVector};
pub use crate::forecaster::{ForecastRecord, RecursiveForecaster};
pub use crate::metrics::{evaluate_model, EvaluationReport};
pub use crate::model::{PriceRegressor, TreeEnsemble};
pub use crate::output::{read_forecasts, write_forecasts};
pub use crate::prepare::{prepare_training_data, write_prepared, PreparedDataset};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
