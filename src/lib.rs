//! # Vegetable price forecasting
//!
//! Workspace facade re-exporting the forecasting crates.
//!
//! - [`price_math`]: lag, moving-average and calendar helpers shared by
//!   training-data preparation and forecasting
//! - [`price_forecast`]: data loading, feature building, model inference and
//!   the recursive forecaster
//!
//! ## Example
//!
//! ```
//! use veg_price_workspace::price_math::lag_or_earliest;
//!
//! let prices = [40.0, 42.0, 45.0];
//! assert_eq!(lag_or_earliest(&prices, 1), 45.0);
//! assert_eq!(lag_or_earliest(&prices, 7), 40.0);
//! ```

pub use price_forecast;
pub use price_math;
