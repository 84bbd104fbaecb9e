//! Booking counts for the calendar dashboard.

use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Booking, BookingStatus};
use crate::services::period::{window_for, Granularity, PeriodError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingStatistics {
    pub total: usize,
    /// Every status is present, zero counts included.
    pub by_status: BTreeMap<BookingStatus, usize>,
    pub today: usize,
    pub this_week: usize,
    pub this_month: usize,
}

/// Reduce a booking snapshot to dashboard counts.
///
/// "Today", "this week" and "this month" are the period windows around
/// `reference` in the clinic's offset; a booking counts when its start
/// falls inside the window.
pub fn aggregate(
    bookings: &[Booking],
    reference: NaiveDate,
    offset: FixedOffset,
) -> Result<BookingStatistics, PeriodError> {
    let day = window_for(reference, Granularity::Day, offset)?;
    let week = window_for(reference, Granularity::Week, offset)?;
    let month = window_for(reference, Granularity::Month, offset)?;

    let mut by_status: BTreeMap<BookingStatus, usize> =
        BookingStatus::ALL.iter().map(|s| (*s, 0)).collect();
    let mut stats = BookingStatistics {
        total: bookings.len(),
        by_status: BTreeMap::new(),
        today: 0,
        this_week: 0,
        this_month: 0,
    };

    for booking in bookings {
        *by_status.entry(booking.status).or_insert(0) += 1;
        stats.today += usize::from(day.contains(booking.start));
        stats.this_week += usize::from(week.contains(booking.start));
        stats.this_month += usize::from(month.contains(booking.start));
    }

    stats.by_status = by_status;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingId, NewBooking};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn booking(start: DateTime<Utc>, status: BookingStatus) -> Booking {
        NewBooking::new("p", start)
            .with_status(status)
            .into_booking(BookingId::generate(), start)
    }

    #[test]
    fn test_empty_snapshot_lists_every_status() {
        let stats = aggregate(&[], NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(), utc()).unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.by_status.len(), BookingStatus::ALL.len());
        assert!(stats.by_status.values().all(|c| *c == 0));
    }

    #[test]
    fn test_counts_by_window_and_status() {
        let reference = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        let noon = Utc.with_ymd_and_hms(2025, 1, 8, 12, 0, 0).unwrap();
        let bookings = vec![
            booking(noon, BookingStatus::Scheduled),
            booking(noon + Duration::hours(2), BookingStatus::Cancelled),
            // Saturday of the same week
            booking(noon + Duration::days(3), BookingStatus::Confirmed),
            // Next week, same month
            booking(noon + Duration::days(7), BookingStatus::NoShow),
            // Previous month
            booking(noon - Duration::days(10), BookingStatus::Completed),
        ];

        let stats = aggregate(&bookings, reference, utc()).unwrap();
        assert_eq!(stats.total, 5);
        assert_eq!(stats.today, 2);
        assert_eq!(stats.this_week, 3);
        assert_eq!(stats.this_month, 4);
        assert_eq!(stats.by_status[&BookingStatus::Scheduled], 1);
        assert_eq!(stats.by_status[&BookingStatus::InProgress], 0);
    }

    #[test]
    fn test_today_follows_clinic_offset() {
        let reference = NaiveDate::from_ymd_opt(2025, 1, 8).unwrap();
        // 01:00Z on the 9th is still the 8th at UTC-3
        let late = booking(
            Utc.with_ymd_and_hms(2025, 1, 9, 1, 0, 0).unwrap(),
            BookingStatus::Scheduled,
        );
        let brt = FixedOffset::west_opt(3 * 3600).unwrap();

        assert_eq!(aggregate(std::slice::from_ref(&late), reference, brt).unwrap().today, 1);
        assert_eq!(aggregate(&[late], reference, utc()).unwrap().today, 0);
    }

    #[test]
    fn test_serializes_status_keys_as_strings() {
        let stats = aggregate(&[], NaiveDate::from_ymd_opt(2025, 1, 8).unwrap(), utc()).unwrap();
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["by_status"]["no_show"], 0);
    }
}
