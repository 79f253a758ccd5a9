//! Historical price data handling for forecasting

use crate::error::{ForecastError, Result};
use crate::utils::parse_date;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Default prefix of the one-hot item columns
pub const DEFAULT_ITEM_PREFIX: &str = "vegetable_";

const DATE_COLUMN: &str = "date";
const REQUIRED_COLUMNS: [&str; 4] = ["date", "avg_price", "min_price", "max_price"];

/// One day of observations for a single item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub date: NaiveDate,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub rainfall_mm: f64,
    #[serde(default)]
    pub festival_flag: bool,
}

impl HistoricalRecord {
    /// Create a record with no festival marker
    pub fn new(
        date: NaiveDate,
        avg_price: f64,
        min_price: f64,
        max_price: f64,
        rainfall_mm: f64,
    ) -> Self {
        Self {
            date,
            avg_price,
            min_price,
            max_price,
            rainfall_mm,
            festival_flag: false,
        }
    }
}

/// Date-ordered history of one item
#[derive(Debug, Clone, PartialEq)]
pub struct ItemHistory {
    /// Item name, e.g. `tomato`
    name: String,
    /// Indicator column the item was read from, e.g. `vegetable_tomato`
    column: String,
    /// Records sorted ascending by date
    records: Vec<HistoricalRecord>,
}

impl ItemHistory {
    /// Create an item history, sorting the records by date
    pub fn new(name: impl Into<String>, column: impl Into<String>, mut records: Vec<HistoricalRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        Self {
            name: name.into(),
            column: column.into(),
            records,
        }
    }

    /// Get the item name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the indicator column name
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Get all records
    pub fn records(&self) -> &[HistoricalRecord] {
        &self.records
    }

    /// The last `n` records (or all of them when fewer exist)
    pub fn tail(&self, n: usize) -> &[HistoricalRecord] {
        &self.records[self.records.len().saturating_sub(n)..]
    }

    /// Date of the most recent record
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Per-item histories discovered in a dataset, in column order
#[derive(Debug, Clone, Default)]
pub struct ItemHistories {
    items: Vec<ItemHistory>,
}

impl ItemHistories {
    pub fn new(items: Vec<ItemHistory>) -> Self {
        Self { items }
    }

    /// Iterate over all items
    pub fn iter(&self) -> std::slice::Iter<'_, ItemHistory> {
        self.items.iter()
    }

    /// Look up an item by name or by indicator column
    pub fn get(&self, item: &str) -> Option<&ItemHistory> {
        self.items
            .iter()
            .find(|h| h.name == item || h.column == item)
    }

    /// Indicator column names of every known item
    pub fn item_columns(&self) -> Vec<String> {
        self.items.iter().map(|h| h.column.clone()).collect()
    }

    /// Names of every known item
    pub fn item_names(&self) -> Vec<&str> {
        self.items.iter().map(|h| h.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Data loader for engineered price datasets
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Read a dataset into a DataFrame; `.parquet` files use the Parquet reader, anything else CSV
    pub fn read_frame<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let is_parquet = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("parquet"))
            .unwrap_or(false);

        let df = if is_parquet {
            ParquetReader::new(file).finish()?
        } else {
            CsvReader::new(file)
                .infer_schema(None)
                .has_header(true)
                .finish()?
        };

        Ok(df)
    }

    /// Load per-item histories from a dataset file
    pub fn from_path<P: AsRef<Path>>(path: P, item_prefix: &str) -> Result<ItemHistories> {
        let df = Self::read_frame(path)?;
        Self::from_dataframe(&df, item_prefix)
    }

    /// Split an existing DataFrame into per-item histories
    pub fn from_dataframe(df: &DataFrame, item_prefix: &str) -> Result<ItemHistories> {
        let column_names = df.get_column_names();
        for required in REQUIRED_COLUMNS {
            if !column_names.iter().any(|name| *name == required) {
                return Err(ForecastError::DataError(format!(
                    "Required column '{}' not found in data",
                    required
                )));
            }
        }

        let item_columns = Self::detect_item_columns(df, item_prefix);
        if item_columns.is_empty() {
            return Err(ForecastError::DataError(format!(
                "No item columns with prefix '{}' found in data",
                item_prefix
            )));
        }

        let dates = Self::date_column(df, DATE_COLUMN)?;
        let avg = column_as_f64(df, "avg_price")?;
        let min = column_as_f64(df, "min_price")?;
        let max = column_as_f64(df, "max_price")?;
        let rainfall = optional_column_as_f64(df, "rainfall_mm", 0.0)?;
        let festival = optional_column_as_f64(df, "festival_flag", 0.0)?;

        let mut items = Vec::with_capacity(item_columns.len());
        for column in &item_columns {
            let flags = column_as_f64(df, column)?;
            let records = flags
                .iter()
                .enumerate()
                .filter(|(_, flag)| **flag >= 0.5)
                .map(|(i, _)| HistoricalRecord {
                    date: dates[i],
                    avg_price: avg[i],
                    min_price: min[i],
                    max_price: max[i],
                    rainfall_mm: rainfall[i],
                    festival_flag: festival[i] >= 0.5,
                })
                .collect::<Vec<_>>();

            let name = column.strip_prefix(item_prefix).unwrap_or(column);
            items.push(ItemHistory::new(name, column.as_str(), records));
        }

        log::info!(
            "Loaded {} rows covering {} items",
            df.height(),
            items.len()
        );

        Ok(ItemHistories::new(items))
    }

    /// Columns whose name starts with the item prefix, in frame order
    pub fn detect_item_columns(df: &DataFrame, item_prefix: &str) -> Vec<String> {
        df.get_column_names()
            .into_iter()
            .filter(|name| name.starts_with(item_prefix) && name.len() > item_prefix.len())
            .map(|name| name.to_string())
            .collect()
    }

    /// Parse the date column, whatever type polars inferred for it
    pub fn date_column(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
        let col = df.column(name).map_err(|e| {
            ForecastError::DataError(format!("Column '{}' not found: {}", name, e))
        })?;
        let as_text = col.cast(&DataType::Utf8)?;

        as_text
            .utf8()?
            .into_iter()
            .enumerate()
            .map(|(i, value)| {
                let raw = value.ok_or_else(|| {
                    ForecastError::DataError(format!("Missing date at row {}", i + 1))
                })?;
                parse_date(raw).map_err(|e| {
                    ForecastError::DataError(format!("Row {}: {}", i + 1, e))
                })
            })
            .collect()
    }
}

/// Get a numeric, boolean or text column as f64 values; nulls and unparsable cells become `NAN`
pub fn column_as_f64(df: &DataFrame, column_name: &str) -> Result<Vec<f64>> {
    let col = df.column(column_name).map_err(|e| {
        ForecastError::DataError(format!("Column '{}' not found: {}", column_name, e))
    })?;

    let casted = col.cast(&DataType::Float64).map_err(|e| {
        ForecastError::DataError(format!(
            "Column '{}' cannot be converted to f64: {}",
            column_name, e
        ))
    })?;

    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Like [`column_as_f64`] but a missing column yields `default` for every row
pub fn optional_column_as_f64(df: &DataFrame, column_name: &str, default: f64) -> Result<Vec<f64>> {
    if df.get_column_names().iter().any(|name| *name == column_name) {
        column_as_f64(df, column_name)
    } else {
        Ok(vec![default; df.height()])
    }
}
