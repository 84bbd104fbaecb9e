//! Property tests for interval overlap and calendar windows.

use chrono::{Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc, Weekday};
use proptest::prelude::*;

use clinic_scheduling::models::TimeInterval;
use clinic_scheduling::services::period::{local_date, step, window_for, Granularity};

fn interval(start_min: i64, len: i64) -> TimeInterval {
    let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let start = base + Duration::minutes(start_min);
    TimeInterval::new(start, start + Duration::minutes(len))
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (1990i32..2100, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn offset_strategy() -> impl Strategy<Value = FixedOffset> {
    (-14 * 60i32..=14 * 60).prop_map(|m| FixedOffset::east_opt(m * 60).unwrap())
}

proptest! {
    #[test]
    fn prop_overlap_is_symmetric(a in 0i64..2000, al in 1i64..240, b in 0i64..2000, bl in 1i64..240) {
        let x = interval(a, al);
        let y = interval(b, bl);
        prop_assert_eq!(x.overlaps(&y), y.overlaps(&x));
    }

    #[test]
    fn prop_back_to_back_never_overlaps(a in 0i64..2000, al in 1i64..240, bl in 1i64..240) {
        let first = interval(a, al);
        let second = interval(a + al, bl);
        prop_assert!(!first.overlaps(&second));
    }

    #[test]
    fn prop_interval_overlaps_itself(a in 0i64..2000, al in 1i64..240) {
        let x = interval(a, al);
        prop_assert!(x.overlaps(&x));
    }

    #[test]
    fn prop_day_window_is_one_day_minus_a_millisecond(date in date_strategy(), offset in offset_strategy()) {
        let day = window_for(date, Granularity::Day, offset).unwrap();
        prop_assert_eq!(day.duration(), Duration::days(1) - Duration::milliseconds(1));
        prop_assert_eq!(local_date(day.start, offset), date);
        prop_assert_eq!(local_date(day.end, offset), date);
    }

    #[test]
    fn prop_week_starts_on_sunday_and_contains_reference(date in date_strategy(), offset in offset_strategy()) {
        let week = window_for(date, Granularity::Week, offset).unwrap();
        let first = local_date(week.start, offset);
        prop_assert_eq!(first.weekday(), Weekday::Sun);
        prop_assert_eq!(local_date(week.end, offset).weekday(), Weekday::Sat);
        prop_assert!(first <= date && date <= local_date(week.end, offset));
    }

    #[test]
    fn prop_month_window_stays_in_month(date in date_strategy(), offset in offset_strategy()) {
        let month = window_for(date, Granularity::Month, offset).unwrap();
        let first = local_date(month.start, offset);
        let last = local_date(month.end, offset);
        prop_assert_eq!(first.day(), 1);
        prop_assert_eq!((first.year(), first.month()), (date.year(), date.month()));
        prop_assert_eq!((last.year(), last.month()), (date.year(), date.month()));
        prop_assert_ne!(last.succ_opt().unwrap().month(), date.month());
    }

    #[test]
    fn prop_step_forward_then_back_returns_for_days_and_weeks(date in date_strategy(), delta in -400i32..400) {
        for granularity in [Granularity::Day, Granularity::Week] {
            let there = step(date, granularity, delta).unwrap();
            prop_assert_eq!(step(there, granularity, -delta).unwrap(), date);
        }
    }

    #[test]
    fn prop_step_month_moves_whole_months(date in date_strategy(), delta in -60i32..60) {
        let shifted = step(date, Granularity::Month, delta).unwrap();
        let months = |d: NaiveDate| d.year() * 12 + d.month() as i32;
        prop_assert_eq!(months(shifted) - months(date), delta);
        // Days 1..=28 exist in every month
        prop_assert_eq!(shifted.day(), date.day());
    }
}

#[test]
fn test_step_month_wraps_year() {
    let december = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    assert_eq!(
        step(december, Granularity::Month, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
    );
    assert_eq!(
        step(december, Granularity::Month, 2).unwrap(),
        NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
    );
}
