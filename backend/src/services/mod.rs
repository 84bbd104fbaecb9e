//! Scheduling engine.
//!
//! - [`conflict`]: overlap detection against a practitioner's calendar
//! - [`period`]: day/week/month windows and calendar navigation
//! - [`statistics`]: dashboard counts
//! - [`scheduling`]: the service that validates and serializes writes

pub mod conflict;
pub mod error;
pub mod locks;
pub mod period;
pub mod scheduling;
pub mod statistics;

pub use error::{ConflictingBooking, SchedulingError, SchedulingResult};
pub use period::{CalendarPage, Granularity, PeriodError, PeriodWindow};
pub use scheduling::{BookingFilter, Reschedule, SchedulingConfig, SchedulingService};
pub use statistics::BookingStatistics;
