//! Calendar features derived from a date

use chrono::{Datelike, NaiveDate};

/// Months (1-based) treated as the monsoon season
pub const MONSOON_MONTHS: [u32; 4] = [6, 7, 8, 9];

/// Day of week with Monday = 0 through Sunday = 6
pub fn day_of_week(date: NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

/// Whether the date falls in a monsoon month
pub fn is_monsoon(date: NaiveDate) -> bool {
    MONSOON_MONTHS.contains(&date.month())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2024, 1, 8, 0)] // Monday
    #[case(2024, 1, 10, 2)]
    #[case(2024, 1, 14, 6)] // Sunday
    fn test_day_of_week(#[case] y: i32, #[case] m: u32, #[case] d: u32, #[case] expected: u32) {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        assert_eq!(day_of_week(date), expected);
    }

    #[rstest]
    #[case(5, false)]
    #[case(6, true)]
    #[case(9, true)]
    #[case(10, false)]
    fn test_is_monsoon(#[case] month: u32, #[case] expected: bool) {
        let date = NaiveDate::from_ymd_opt(2023, month, 15).unwrap();
        assert_eq!(is_monsoon(date), expected);
    }
}
