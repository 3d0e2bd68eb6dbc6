use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{InsightsError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a `YYYY-MM-DD` value. Timestamps are accepted and truncated to
/// their calendar date.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
        return Some(date);
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|datetime| datetime.date())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|datetime| datetime.date_naive())
        })
}

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a filter from raw query parameters. Filtering only applies when
    /// both bounds are present and non-empty.
    pub fn from_params(start: Option<&str>, end: Option<&str>) -> Result<Option<Self>> {
        fn non_empty(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|value| !value.is_empty())
        }
        let (Some(start), Some(end)) = (non_empty(start), non_empty(end)) else {
            return Ok(None);
        };
        Ok(Some(Self {
            start: parse_bound(start)?,
            end: parse_bound(end)?,
        }))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

fn parse_bound(value: &str) -> Result<NaiveDate> {
    parse_calendar_date(value).ok_or_else(|| InsightsError::InvalidDate {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_calendar_date() {
        assert_eq!(parse_calendar_date("2024-01-02"), Some(ymd(2024, 1, 2)));
        assert_eq!(parse_calendar_date(" 2024-01-02 "), Some(ymd(2024, 1, 2)));
        assert_eq!(
            parse_calendar_date("2024-01-02T23:59:59"),
            Some(ymd(2024, 1, 2))
        );
        assert_eq!(
            parse_calendar_date("2024-01-02 08:30:00.250"),
            Some(ymd(2024, 1, 2))
        );
        assert_eq!(
            parse_calendar_date("2024-01-02T08:30:00+02:00"),
            Some(ymd(2024, 1, 2))
        );
        assert_eq!(parse_calendar_date("2024-13-01"), None);
        assert_eq!(parse_calendar_date("01/02/2024"), None);
        assert_eq!(parse_calendar_date(""), None);
    }

    #[test]
    fn test_range_requires_both_bounds() {
        assert_eq!(DateRange::from_params(None, None).unwrap(), None);
        assert_eq!(
            DateRange::from_params(Some("2024-01-01"), None).unwrap(),
            None
        );
        assert_eq!(
            DateRange::from_params(Some(""), Some("2024-01-02")).unwrap(),
            None
        );
        assert_eq!(
            DateRange::from_params(Some("2024-01-01"), Some("2024-01-02")).unwrap(),
            Some(DateRange {
                start: ymd(2024, 1, 1),
                end: ymd(2024, 1, 2)
            })
        );
    }

    #[test]
    fn test_malformed_bound_is_rejected() {
        let err = DateRange::from_params(Some("2024-01-01"), Some("yesterday")).unwrap_err();
        assert!(err.is_bad_request());
        assert_eq!(err.to_string(), "invalid date 'yesterday', expected YYYY-MM-DD");
    }

    #[test]
    fn test_contains_is_inclusive() {
        let range = DateRange {
            start: ymd(2024, 1, 1),
            end: ymd(2024, 1, 31),
        };
        assert!(range.contains(ymd(2024, 1, 1)));
        assert!(range.contains(ymd(2024, 1, 31)));
        assert!(!range.contains(ymd(2023, 12, 31)));
        assert!(!range.contains(ymd(2024, 2, 1)));
    }
}
