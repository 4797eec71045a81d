//! Calendar helpers for month sheets and date-block headers.

use chrono::{Datelike, NaiveDate};

use crate::error::{CoreResult, ValidationError};

/// Header format of a date-block (`01-03-2024`).
pub const BLOCK_DATE_FORMAT: &str = "%d-%m-%Y";

const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Gregorian leap year: divisible by 4, centuries only when divisible by 400.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> CoreResult<u32> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::OutOfRange {
            field: "month".to_string(),
            min: 1,
            max: 12,
        }
        .into());
    }
    if month == 2 && is_leap_year(year) {
        return Ok(29);
    }
    Ok(DAYS_IN_MONTH[(month - 1) as usize])
}

pub fn format_block_date(date: NaiveDate) -> String {
    date.format(BLOCK_DATE_FORMAT).to_string()
}

pub fn parse_block_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), BLOCK_DATE_FORMAT).ok()
}

/// Parses a user-entered date: `YYYY-MM-DD` or `DD-MM-YYYY`.
pub fn parse_input_date(text: &str) -> CoreResult<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, BLOCK_DATE_FORMAT))
        .map_err(|_| {
            ValidationError::InvalidFormat {
                field: "date".to_string(),
                reason: format!("'{}' is not YYYY-MM-DD or DD-MM-YYYY", text),
            }
            .into()
        })
}

/// Every day of the month containing `date`, in order.
pub fn month_days(date: NaiveDate) -> CoreResult<Vec<NaiveDate>> {
    let days = days_in_month(date.year(), date.month())?;
    Ok((1..=days)
        .filter_map(|day| NaiveDate::from_ymd_opt(date.year(), date.month(), day))
        .collect())
}

/// First day of the previous month.
pub fn previous_month(date: NaiveDate) -> Option<NaiveDate> {
    let (year, month) = if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leap_years() {
        assert!(is_leap_year(2024));
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(!is_leap_year(2023));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2).unwrap(), 29);
        assert_eq!(days_in_month(2023, 2).unwrap(), 28);
        assert_eq!(days_in_month(2024, 4).unwrap(), 30);
        assert_eq!(days_in_month(2024, 12).unwrap(), 31);
        assert!(days_in_month(2024, 13).is_err());
        assert!(days_in_month(2024, 0).is_err());
    }

    #[test]
    fn test_block_date_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(format_block_date(date), "01-03-2024");
        assert_eq!(parse_block_date(" 01-03-2024 "), Some(date));
    }

    #[test]
    fn test_parse_input_date() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(parse_input_date("2024-02-29").unwrap(), date);
        assert_eq!(parse_input_date("29-02-2024").unwrap(), date);
        assert!(parse_input_date("2023-02-29").is_err());
    }

    #[test]
    fn test_month_days_and_previous_month() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        assert_eq!(month_days(date).unwrap().len(), 29);

        let jan = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            previous_month(jan),
            NaiveDate::from_ymd_opt(2023, 12, 1)
        );
    }
}
