//! Metrics for evaluating model accuracy on held-out rows

use crate::data::{column_as_f64, DataLoader};
use crate::error::{ForecastError, Result};
use crate::model::PriceRegressor;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use statrs::statistics::Statistics;
use std::fmt;

const TARGET_COLUMN: &str = "avg_price";

/// Mean absolute error; `NAN` for empty or mismatched inputs
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Mean squared error; `NAN` for empty or mismatched inputs
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return f64::NAN;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64
}

/// Root mean squared error
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_squared_error(actual, predicted).sqrt()
}

/// Coefficient of determination.
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() || actual.len() != predicted.len() {
        return f64::NAN;
    }

    let mean = actual.iter().mean();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Accuracy of a model on the rows after a split date
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub train_samples: usize,
    pub test_samples: usize,
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Model Evaluation")?;
        writeln!(f, "  Train samples: {}", self.train_samples)?;
        writeln!(f, "  Test samples:  {}", self.test_samples)?;
        writeln!(f, "  MAE:  {:.2}", self.mae)?;
        writeln!(f, "  RMSE: {:.2}", self.rmse)?;
        writeln!(f, "  R²:   {:.4}", self.r2)?;
        Ok(())
    }
}

/// Score `model` on dataset rows dated on or after `split_date`.
///
/// Feature values come straight from the dataset's columns in the model's
/// order; a feature with no column is 0 for every row.
pub fn evaluate_model(
    model: &dyn PriceRegressor,
    df: &DataFrame,
    split_date: NaiveDate,
) -> Result<EvaluationReport> {
    let dates = DataLoader::date_column(df, "date")?;
    let actual_all = column_as_f64(df, TARGET_COLUMN)?;

    let column_names = df.get_column_names();
    let mut columns = Vec::with_capacity(model.feature_names().len());
    for name in model.feature_names() {
        if column_names.iter().any(|c| *c == name.as_str()) {
            columns.push(column_as_f64(df, name)?);
        } else {
            log::warn!("Dataset has no column '{}', using 0", name);
            columns.push(vec![0.0; df.height()]);
        }
    }

    let test_rows: Vec<usize> = (0..dates.len()).filter(|&i| dates[i] >= split_date).collect();
    if test_rows.is_empty() {
        return Err(ForecastError::ValidationError(format!(
            "No rows dated on or after {}",
            split_date
        )));
    }

    let mut actual = Vec::with_capacity(test_rows.len());
    let mut predicted = Vec::with_capacity(test_rows.len());
    for &i in &test_rows {
        let row: Vec<f64> = columns.iter().map(|col| col[i]).collect();
        predicted.push(model.predict(&row)?);
        actual.push(actual_all[i]);
    }

    Ok(EvaluationReport {
        train_samples: dates.len() - test_rows.len(),
        test_samples: test_rows.len(),
        mae: mean_absolute_error(&actual, &predicted),
        rmse: root_mean_squared_error(&actual, &predicted),
        r2: r2_score(&actual, &predicted),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_regression_metrics() {
        let actual = [10.0, 20.0, 30.0, 40.0, 50.0];
        let predicted = [12.0, 18.0, 33.0, 37.0, 52.0];

        assert_relative_eq!(mean_absolute_error(&actual, &predicted), 2.4);
        assert_relative_eq!(mean_squared_error(&actual, &predicted), 6.0);
        assert_relative_eq!(root_mean_squared_error(&actual, &predicted), 6.0_f64.sqrt());
        // ss_tot = 1000, ss_res = 30
        assert_relative_eq!(r2_score(&actual, &predicted), 0.97, epsilon = 1e-12);
    }

    #[test]
    fn test_mismatched_inputs() {
        assert!(mean_absolute_error(&[], &[]).is_nan());
        assert!(mean_squared_error(&[1.0, 2.0], &[1.0]).is_nan());
        assert!(r2_score(&[1.0], &[1.0, 2.0]).is_nan());
    }

    #[test]
    fn test_r2_constant_target() {
        assert_eq!(r2_score(&[5.0, 5.0], &[5.0, 5.0]), 1.0);
        assert_eq!(r2_score(&[5.0, 5.0], &[4.0, 6.0]), 0.0);
    }

    #[test]
    fn test_report_display() {
        let report = EvaluationReport {
            train_samples: 80,
            test_samples: 20,
            mae: 1.234,
            rmse: 2.0,
            r2: 0.5,
        };
        let text = report.to_string();
        assert!(text.contains("Test samples:  20"));
        assert!(text.contains("MAE:  1.23"));
    }
}
