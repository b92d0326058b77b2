//! Reporting windows for the finance dashboard.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Time window selected by the `range` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardRange {
    /// First day of the month five months back until now.
    #[default]
    #[serde(rename = "last6months")]
    Last6Months,
    /// January 1st until now.
    Ytd,
    /// The whole calendar year, up to January 1st of the next year.
    #[serde(rename = "thisyear")]
    ThisYear,
}

impl DashboardRange {
    /// Parses a range name; anything unrecognized falls back to the default.
    #[must_use]
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s.map(str::to_lowercase).as_deref() {
            Some("ytd") => Self::Ytd,
            Some("thisyear") => Self::ThisYear,
            _ => Self::Last6Months,
        }
    }

    /// Half-open `[start, end)` bounds of the window relative to `now`.
    #[must_use]
    pub fn window(self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let year = now.year();
        match self {
            Self::Ytd => (start_of_month(year, 1), now),
            Self::ThisYear => (start_of_month(year, 1), start_of_month(year + 1, 1)),
            Self::Last6Months => {
                let months_since_epoch = year * 12 + i32::try_from(now.month0()).unwrap_or(0) - 5;
                let start_year = months_since_epoch.div_euclid(12);
                let start_month = u32::try_from(months_since_epoch.rem_euclid(12)).unwrap_or(0) + 1;
                (start_of_month(start_year, start_month), now)
            }
        }
    }
}

fn start_of_month(year: i32, month: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or(DateTime::<Utc>::MIN_UTC, |naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 30, 0).unwrap()
    }

    #[rstest]
    #[case(None, DashboardRange::Last6Months)]
    #[case(Some("ytd"), DashboardRange::Ytd)]
    #[case(Some("YTD"), DashboardRange::Ytd)]
    #[case(Some("thisyear"), DashboardRange::ThisYear)]
    #[case(Some("last6months"), DashboardRange::Last6Months)]
    #[case(Some("bogus"), DashboardRange::Last6Months)]
    fn test_parse(#[case] input: Option<&str>, #[case] expected: DashboardRange) {
        assert_eq!(DashboardRange::parse_or_default(input), expected);
    }

    #[test]
    fn test_last_six_months_mid_year() {
        let now = at(2024, 8, 15);
        let (start, end) = DashboardRange::Last6Months.window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        assert_eq!(end, now);
    }

    #[test]
    fn test_last_six_months_wraps_year() {
        let now = at(2024, 2, 10);
        let (start, _) = DashboardRange::Last6Months.window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2023, 9, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_ytd() {
        let now = at(2024, 5, 20);
        let (start, end) = DashboardRange::Ytd.window(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(end, now);
    }

    #[test]
    fn test_this_year() {
        let (start, end) = DashboardRange::ThisYear.window(at(2024, 5, 20));
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_this_year_covers_last_second_of_december() {
        let (start, end) = DashboardRange::ThisYear.window(at(2024, 5, 20));
        let late = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()
            + chrono::Duration::microseconds(500_000);
        assert!(start <= late && late < end);
    }
}
