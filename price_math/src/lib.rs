//! # Price Math
//!
//! Numeric building blocks for daily price features.
//! This crate provides positional lag lookups, trailing-window means and
//! calendar flags used when turning a price history into model inputs.

use thiserror::Error;

pub mod calendar;
pub mod lags;
pub mod moving_averages;

pub use calendar::{day_of_week, is_monsoon, MONSOON_MONTHS};
pub use lags::{lag_or_earliest, shift, LAG_OFFSETS};
pub use moving_averages::{rolling_mean, trailing_mean, trailing_mean_or};

/// Errors that can occur in price feature calculations
#[derive(Error, Debug)]
pub enum MathError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for price math operations
pub type Result<T> = std::result::Result<T, MathError>;
