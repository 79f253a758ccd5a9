//! Error types for the price_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the price_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Item has too few rows to be forecast
    #[error("Insufficient history for '{item}': {rows} rows, need at least {required}")]
    InsufficientHistory {
        item: String,
        rows: usize,
        required: usize,
    },

    /// No item produced a forecast
    #[error("No forecasts were generated; check the history data or min_history setting")]
    NoForecasts,

    /// Requested item is not part of the dataset
    #[error("Item '{0}' not found in dataset")]
    UnknownItem(String),

    /// Model expects features the computed vector does not provide
    #[error("Feature mismatch: model expects {0:?} which were not computed")]
    FeatureMismatch(Vec<String>),

    /// Error loading or interpreting a model
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error raised while evaluating the model on a feature row
    #[error("Inference error: {0}")]
    InferenceError(String),

    /// Error in a configuration value
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV reading or writing
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from the numeric helpers
    #[error("Math error: {0}")]
    MathError(#[from] price_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
