//! Utility functions for the price_forecast crate

use crate::error::{ForecastError, Result};
use chrono::{Days, NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Parse a calendar date from the formats found in exported price sheets.
///
/// Timestamps are accepted and truncated to their date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(ts.date());
        }
    }

    // Fall back to an ISO date prefix, e.g. "2023-01-01 00:00:00.000000"
    trimmed
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .ok_or_else(|| ForecastError::DataError(format!("Unrecognised date '{}'", raw)))
}

/// The date `n` days after `date`
pub fn add_days(date: NaiveDate, n: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(n))
        .ok_or_else(|| ForecastError::ValidationError(format!("Date overflow after {}", date)))
}

/// The date one day before `date`
pub fn previous_day(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(1))
        .ok_or_else(|| ForecastError::ValidationError(format!("Date underflow before {}", date)))
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Strip currency decorations from a price cell and parse it.
///
/// `"Rs 1,250.50"` parses to `1250.5`; anything unparsable becomes `NAN`.
pub fn clean_price(raw: &str) -> f64 {
    raw.replace("Rs", "")
        .replace(',', "")
        .trim()
        .parse::<f64>()
        .unwrap_or(f64::NAN)
}
