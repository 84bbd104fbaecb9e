//! Calendar period windows.
//!
//! A window is the inclusive instant range `[start, end]` covered by one
//! calendar page: a day, a Sunday-to-Saturday week, or a calendar month.
//! Boundaries are computed in the clinic's fixed UTC offset and returned as
//! UTC instants; `end` is the last millisecond of the period.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveTime, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors raised while computing period windows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("Unknown granularity '{0}'. Must be one of: day, week, month")]
    UnknownGranularity(String),

    #[error("Date {0} is outside the supported calendar range")]
    OutOfRange(NaiveDate),
}

/// Size of a calendar page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            _ => Err(PeriodError::UnknownGranularity(s.to_string())),
        }
    }
}

impl TryFrom<String> for Granularity {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Inclusive instant range of one calendar page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PeriodWindow {
    /// Inclusive on both ends.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// A calendar page: the (possibly stepped) reference date and its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarPage {
    pub reference_date: NaiveDate,
    pub granularity: Granularity,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl CalendarPage {
    pub fn window(&self) -> PeriodWindow {
        PeriodWindow {
            start: self.start,
            end: self.end,
        }
    }
}

/// Compute the window of the period containing `reference`.
///
/// ```
/// use chrono::{FixedOffset, NaiveDate};
/// use clinic_scheduling::services::period::{window_for, Granularity};
///
/// let utc = FixedOffset::east_opt(0).unwrap();
/// let date = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
/// let week = window_for(date, Granularity::Week, utc).unwrap();
/// assert_eq!(week.start.to_rfc3339(), "2025-01-05T00:00:00+00:00");
/// ```
pub fn window_for(
    reference: NaiveDate,
    granularity: Granularity,
    offset: FixedOffset,
) -> Result<PeriodWindow, PeriodError> {
    let out_of_range = || PeriodError::OutOfRange(reference);

    let (first, next) = match granularity {
        Granularity::Day => (reference, reference.succ_opt().ok_or_else(out_of_range)?),
        Granularity::Week => {
            let back = i64::from(reference.weekday().num_days_from_sunday());
            let sunday = reference
                .checked_sub_signed(Duration::days(back))
                .ok_or_else(out_of_range)?;
            let next = sunday
                .checked_add_signed(Duration::days(7))
                .ok_or_else(out_of_range)?;
            (sunday, next)
        }
        Granularity::Month => {
            let first = NaiveDate::from_ymd_opt(reference.year(), reference.month(), 1)
                .ok_or_else(out_of_range)?;
            let next = first
                .checked_add_months(Months::new(1))
                .ok_or_else(out_of_range)?;
            (first, next)
        }
    };

    Ok(PeriodWindow {
        start: local_midnight(first, offset).ok_or_else(out_of_range)?,
        end: local_midnight(next, offset).ok_or_else(out_of_range)? - Duration::milliseconds(1),
    })
}

/// Shift `reference` by `delta` pages of the given granularity.
///
/// Months keep the day of month, clamped to the target month's length.
pub fn step(
    reference: NaiveDate,
    granularity: Granularity,
    delta: i32,
) -> Result<NaiveDate, PeriodError> {
    let shifted = match granularity {
        Granularity::Day => reference.checked_add_signed(Duration::days(i64::from(delta))),
        Granularity::Week => reference.checked_add_signed(Duration::days(7 * i64::from(delta))),
        Granularity::Month if delta >= 0 => {
            reference.checked_add_months(Months::new(delta.unsigned_abs()))
        }
        Granularity::Month => reference.checked_sub_months(Months::new(delta.unsigned_abs())),
    };
    shifted.ok_or(PeriodError::OutOfRange(reference))
}

/// Step from `reference` and return the resulting page.
pub fn page(
    reference: NaiveDate,
    granularity: Granularity,
    delta: i32,
    offset: FixedOffset,
) -> Result<CalendarPage, PeriodError> {
    let reference_date = step(reference, granularity, delta)?;
    let window = window_for(reference_date, granularity, offset)?;
    Ok(CalendarPage {
        reference_date,
        granularity,
        start: window.start,
        end: window.end,
    })
}

/// Calendar date of `instant` in the clinic's offset.
pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn instant(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_day_window() {
        let w = window_for(date(2025, 3, 14), Granularity::Day, utc()).unwrap();
        assert_eq!(w.start, instant("2025-03-14T00:00:00Z"));
        assert_eq!(w.end, instant("2025-03-14T23:59:59.999Z"));
        assert_eq!(w.duration(), Duration::days(1) - Duration::milliseconds(1));
    }

    #[test]
    fn test_week_window_starts_on_sunday() {
        // 2025-01-08 is a Wednesday
        let w = window_for(date(2025, 1, 8), Granularity::Week, utc()).unwrap();
        assert_eq!(w.start, instant("2025-01-05T00:00:00Z"));
        assert_eq!(w.end, instant("2025-01-11T23:59:59.999Z"));

        // A Sunday is the first day of its own week
        let sunday = window_for(date(2025, 1, 5), Granularity::Week, utc()).unwrap();
        assert_eq!(sunday, w);
    }

    #[test]
    fn test_week_window_crosses_year() {
        let w = window_for(date(2025, 1, 1), Granularity::Week, utc()).unwrap();
        assert_eq!(w.start, instant("2024-12-29T00:00:00Z"));
        assert_eq!(w.end, instant("2025-01-04T23:59:59.999Z"));
    }

    #[test]
    fn test_month_window_handles_leap_february() {
        let w = window_for(date(2024, 2, 10), Granularity::Month, utc()).unwrap();
        assert_eq!(w.start, instant("2024-02-01T00:00:00Z"));
        assert_eq!(w.end, instant("2024-02-29T23:59:59.999Z"));

        let dec = window_for(date(2024, 12, 31), Granularity::Month, utc()).unwrap();
        assert_eq!(dec.end, instant("2024-12-31T23:59:59.999Z"));
    }

    #[test]
    fn test_window_in_negative_offset() {
        let brt = FixedOffset::west_opt(3 * 3600).unwrap();
        let w = window_for(date(2025, 1, 8), Granularity::Day, brt).unwrap();
        assert_eq!(w.start, instant("2025-01-08T03:00:00Z"));
        assert_eq!(w.end, instant("2025-01-09T02:59:59.999Z"));
        assert_eq!(local_date(w.end, brt), date(2025, 1, 8));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let w = window_for(date(2025, 1, 8), Granularity::Day, utc()).unwrap();
        assert!(w.contains(w.start));
        assert!(w.contains(w.end));
        assert!(!w.contains(w.end + Duration::milliseconds(1)));
        assert!(!w.contains(w.start - Duration::milliseconds(1)));
    }

    #[test]
    fn test_step_days_and_weeks() {
        assert_eq!(step(date(2025, 1, 31), Granularity::Day, 1).unwrap(), date(2025, 2, 1));
        assert_eq!(step(date(2025, 1, 8), Granularity::Week, -2).unwrap(), date(2024, 12, 25));
        assert_eq!(step(date(2025, 1, 8), Granularity::Day, 0).unwrap(), date(2025, 1, 8));
    }

    #[test]
    fn test_step_months_rolls_year_and_clamps() {
        assert_eq!(step(date(2024, 12, 15), Granularity::Month, 1).unwrap(), date(2025, 1, 15));
        assert_eq!(step(date(2025, 1, 15), Granularity::Month, -1).unwrap(), date(2024, 12, 15));
        assert_eq!(step(date(2025, 1, 31), Granularity::Month, 1).unwrap(), date(2025, 2, 28));
    }

    #[test]
    fn test_page_combines_step_and_window() {
        let p = page(date(2024, 12, 20), Granularity::Month, 1, utc()).unwrap();
        assert_eq!(p.reference_date, date(2025, 1, 20));
        assert_eq!(p.start, instant("2025-01-01T00:00:00Z"));
        assert_eq!(p.end, instant("2025-01-31T23:59:59.999Z"));
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!("WEEK".parse::<Granularity>().unwrap(), Granularity::Week);
        assert_eq!(
            "year".parse::<Granularity>().unwrap_err(),
            PeriodError::UnknownGranularity("year".into())
        );
        assert_eq!(
            serde_json::to_string(&Granularity::Month).unwrap(),
            "\"month\""
        );
        let parsed: Granularity = serde_json::from_str("\"Day\"").unwrap();
        assert_eq!(parsed, Granularity::Day);
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        assert!(window_for(NaiveDate::MAX, Granularity::Day, utc()).is_err());
        assert!(step(NaiveDate::MAX, Granularity::Month, 1).is_err());
    }
}
