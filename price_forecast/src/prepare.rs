//! Training-data preparation
//!
//! Turns raw market price, rainfall and holiday sheets into the engineered,
//! one-hot encoded dataset the model is trained on and the forecaster reads
//! history from.

use crate::error::{ForecastError, Result};
use crate::features::{
    lag_feature_name, AVG_PRICE_7D_MEAN, DAY_OF_WEEK, FESTIVAL_FLAG, IS_MONSOON, MAX_PRICE,
    MIN_PRICE, MONTH, RAINFALL_MM, ROLLING_WINDOW,
};
use crate::utils::{clean_price, parse_date};
use chrono::{Datelike, NaiveDate};
use price_math::{day_of_week, is_monsoon, rolling_mean, shift, LAG_OFFSETS};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

/// One row of the raw market price sheet
#[derive(Debug, Clone, PartialEq)]
pub struct RawPriceRow {
    pub date: NaiveDate,
    pub vegetable: String,
    pub unit: Option<String>,
    pub min_price: f64,
    pub max_price: f64,
    pub avg_price: f64,
}

/// One engineered training row
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRow {
    pub date: NaiveDate,
    pub vegetable: String,
    pub unit: Option<String>,
    pub min_price: f64,
    pub max_price: f64,
    pub avg_price: f64,
    pub rainfall_mm: f64,
    pub festival_flag: bool,
    pub month: u32,
    pub day_of_week: u32,
    pub is_monsoon: bool,
    /// Price lags in [`LAG_OFFSETS`] order
    pub lags: [f64; 4],
    pub avg_price_7d_mean: f64,
}

impl PreparedRow {
    fn is_complete(&self, has_unit: bool) -> bool {
        let numeric = [self.min_price, self.max_price, self.avg_price, self.avg_price_7d_mean];
        numeric.iter().chain(self.lags.iter()).all(|v| !v.is_nan())
            && (!has_unit || self.unit.as_deref().map_or(false, |u| !u.is_empty()))
    }
}

/// Engineered dataset, sorted by vegetable then date
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDataset {
    rows: Vec<PreparedRow>,
    vegetables: Vec<String>,
    has_unit: bool,
}

impl PreparedDataset {
    pub fn rows(&self) -> &[PreparedRow] {
        &self.rows
    }

    /// Distinct vegetables, sorted
    pub fn vegetables(&self) -> &[String] {
        &self.vegetables
    }

    /// Output column names in write order
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec!["date".to_string()];
        if self.has_unit {
            columns.push("unit".to_string());
        }
        columns.extend(
            [MIN_PRICE, MAX_PRICE, "avg_price", RAINFALL_MM, FESTIVAL_FLAG, MONTH, DAY_OF_WEEK, IS_MONSOON]
                .iter()
                .map(|c| c.to_string()),
        );
        columns.extend(LAG_OFFSETS.iter().map(|k| lag_feature_name(*k)));
        columns.push(AVG_PRICE_7D_MEAN.to_string());
        columns.extend(self.vegetables.iter().map(|v| format!("vegetable_{}", v)));
        columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Header names trimmed and lower-cased, with all data records
fn read_table(path: &Path) -> Result<(Vec<String>, Vec<csv::StringRecord>)> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((headers, records))
}

fn column_index(headers: &[String], name: &str, path: &Path) -> Result<usize> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        ForecastError::DataError(format!(
            "Column '{}' not found in {}",
            name,
            path.display()
        ))
    })
}

fn parse_row_date(record: &csv::StringRecord, idx: usize, line: usize) -> Result<NaiveDate> {
    let raw = record.get(idx).unwrap_or_default();
    parse_date(raw).map_err(|e| ForecastError::DataError(format!("Line {}: {}", line, e)))
}

/// Read the raw market price sheet
pub fn read_price_sheet<P: AsRef<Path>>(path: P) -> Result<Vec<RawPriceRow>> {
    let path = path.as_ref();
    let (headers, records) = read_table(path)?;

    let date_idx = column_index(&headers, "date", path)?;
    let veg_idx = column_index(&headers, "vegetable", path)?;
    let min_idx = column_index(&headers, "min_price", path)?;
    let max_idx = column_index(&headers, "max_price", path)?;
    let avg_idx = column_index(&headers, "avg_price", path)?;
    let unit_idx = headers.iter().position(|h| h == "unit");

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let cell = |idx: usize| record.get(idx).unwrap_or_default();
            Ok(RawPriceRow {
                date: parse_row_date(record, date_idx, i + 2)?,
                vegetable: cell(veg_idx).to_string(),
                unit: unit_idx.map(|idx| cell(idx).to_string()),
                min_price: clean_price(cell(min_idx)),
                max_price: clean_price(cell(max_idx)),
                avg_price: clean_price(cell(avg_idx)),
            })
        })
        .collect()
}

/// Read daily rainfall; when a date repeats the first value wins
pub fn read_rainfall<P: AsRef<Path>>(path: P) -> Result<HashMap<NaiveDate, f64>> {
    let path = path.as_ref();
    let (headers, records) = read_table(path)?;
    let date_idx = column_index(&headers, "date", path)?;
    let rain_idx = column_index(&headers, RAINFALL_MM, path)?;

    let mut rainfall = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        let date = parse_row_date(record, date_idx, i + 2)?;
        let value = record
            .get(rain_idx)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| !v.is_nan())
            .unwrap_or(0.0);
        rainfall.entry(date).or_insert(value);
    }
    Ok(rainfall)
}

/// Read holiday dates
pub fn read_holidays<P: AsRef<Path>>(path: P) -> Result<HashSet<NaiveDate>> {
    let path = path.as_ref();
    let (headers, records) = read_table(path)?;
    let date_idx = column_index(&headers, "date", path)?;

    records
        .iter()
        .enumerate()
        .map(|(i, record)| parse_row_date(record, date_idx, i + 2))
        .collect()
}

/// Read the three sheets and engineer the training dataset
pub fn prepare_training_data<P: AsRef<Path>>(
    prices_path: P,
    rainfall_path: P,
    holidays_path: P,
) -> Result<PreparedDataset> {
    let prices = read_price_sheet(prices_path)?;
    let rainfall = read_rainfall(rainfall_path)?;
    let holidays = read_holidays(holidays_path)?;
    prepare_from_parts(prices, &rainfall, &holidays)
}

/// Engineer the training dataset from already-parsed sheets.
///
/// Rainfall missing for a date is 0 and holiday dates get `festival_flag`.
/// Lags are positional within each vegetable's date-sorted rows and the
/// weekly mean needs a full window that includes the current row. Rows with
/// any undefined value are dropped.
pub fn prepare_from_parts(
    mut prices: Vec<RawPriceRow>,
    rainfall: &HashMap<NaiveDate, f64>,
    holidays: &HashSet<NaiveDate>,
) -> Result<PreparedDataset> {
    let has_unit = prices.iter().any(|r| r.unit.is_some());
    let input_rows = prices.len();

    prices.sort_by(|a, b| a.vegetable.cmp(&b.vegetable).then(a.date.cmp(&b.date)));

    let mut rows = Vec::with_capacity(prices.len());
    let mut start = 0;
    while start < prices.len() {
        let vegetable = &prices[start].vegetable;
        let end = prices[start..]
            .iter()
            .position(|r| &r.vegetable != vegetable)
            .map_or(prices.len(), |offset| start + offset);
        let group = &prices[start..end];

        let avg: Vec<f64> = group.iter().map(|r| r.avg_price).collect();
        let lags: Vec<Vec<f64>> = LAG_OFFSETS.iter().map(|k| shift(&avg, *k)).collect();
        let weekly = rolling_mean(&avg, ROLLING_WINDOW)?;

        for (i, raw) in group.iter().enumerate() {
            rows.push(PreparedRow {
                date: raw.date,
                vegetable: raw.vegetable.clone(),
                unit: raw.unit.clone(),
                min_price: raw.min_price,
                max_price: raw.max_price,
                avg_price: raw.avg_price,
                rainfall_mm: rainfall.get(&raw.date).copied().unwrap_or(0.0),
                festival_flag: holidays.contains(&raw.date),
                month: raw.date.month(),
                day_of_week: day_of_week(raw.date),
                is_monsoon: is_monsoon(raw.date),
                lags: [lags[0][i], lags[1][i], lags[2][i], lags[3][i]],
                avg_price_7d_mean: weekly[i],
            });
        }
        start = end;
    }

    rows.retain(|row| row.is_complete(has_unit));
    let vegetables: Vec<String> = rows
        .iter()
        .map(|r| r.vegetable.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    log::info!(
        "Prepared {} of {} rows for {} vegetables",
        rows.len(),
        input_rows,
        vegetables.len()
    );

    Ok(PreparedDataset {
        rows,
        vegetables,
        has_unit,
    })
}

/// Write the engineered dataset as CSV with 0/1 indicator columns
pub fn write_prepared<P: AsRef<Path>>(path: P, dataset: &PreparedDataset) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let flag = |b: bool| if b { "1".to_string() } else { "0".to_string() };
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(dataset.columns())?;

    for row in &dataset.rows {
        let mut record = vec![row.date.format("%Y-%m-%d").to_string()];
        if dataset.has_unit {
            record.push(row.unit.clone().unwrap_or_default());
        }
        record.extend(
            [row.min_price, row.max_price, row.avg_price, row.rainfall_mm]
                .iter()
                .map(|v| v.to_string()),
        );
        record.push(flag(row.festival_flag));
        record.push(row.month.to_string());
        record.push(row.day_of_week.to_string());
        record.push(flag(row.is_monsoon));
        record.extend(row.lags.iter().map(|v| v.to_string()));
        record.push(row.avg_price_7d_mean.to_string());
        record.extend(dataset.vegetables.iter().map(|v| flag(*v == row.vegetable)));

        writer.write_record(&record)?;
    }
    writer.flush()?;

    log::info!("Saved prepared dataset ({} rows) to {}", dataset.len(), path.display());
    Ok(())
}
