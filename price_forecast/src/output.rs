//! Forecast file output

use crate::error::{ForecastError, Result};
use crate::forecaster::ForecastRecord;
use std::fs;
use std::path::Path;

/// Write forecast rows as `date,vegetable,predicted_price`, replacing any existing file.
///
/// An empty forecast is refused so a previous good file is never replaced
/// by a header-only one.
pub fn write_forecasts<P: AsRef<Path>>(path: P, records: &[ForecastRecord]) -> Result<()> {
    if records.is_empty() {
        return Err(ForecastError::NoForecasts);
    }

    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    log::info!("Saved {} forecast rows to {}", records.len(), path.display());
    Ok(())
}

/// Read a forecast file written by [`write_forecasts`]
pub fn read_forecasts<P: AsRef<Path>>(path: P) -> Result<Vec<ForecastRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<ForecastRecord>, csv::Error>>()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn record(day: u32, price: f64) -> ForecastRecord {
        ForecastRecord {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            item: "tomato".to_string(),
            predicted_price: price,
        }
    }

    #[test]
    fn test_write_creates_dirs_and_overwrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("forecasts").join("out.csv");

        write_forecasts(&path, &[record(11, 100.0), record(12, 101.5)]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("date,vegetable,predicted_price\n"));
        assert!(text.contains("2024-01-11,tomato,100.0"));

        write_forecasts(&path, &[record(13, 99.25)]).unwrap();
        let back = read_forecasts(&path).unwrap();
        assert_eq!(back, vec![record(13, 99.25)]);
    }

    #[test]
    fn test_empty_forecast_not_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");

        assert!(matches!(
            write_forecasts(&path, &[]),
            Err(ForecastError::NoForecasts)
        ));
        assert!(!path.exists());
    }
}
