//! Booking data model.
//!
//! A booking occupies the half-open interval `[start, start + duration)` on a
//! practitioner's calendar. The end instant is always derived, never stored.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::define_ref_type;

/// Duration applied when a booking is created without one.
pub const DEFAULT_DURATION_MINUTES: i32 = 30;

define_ref_type!(BookingId);
define_ref_type!(PatientRef);
define_ref_type!(PractitionerRef);

impl BookingId {
    /// Generate a fresh random booking id.
    pub fn generate() -> Self {
        BookingId(uuid::Uuid::new_v4().to_string())
    }
}

/// Lifecycle status of a booking.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
    InProgress,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Scheduled,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
        BookingStatus::NoShow,
        BookingStatus::InProgress,
    ];

    /// Statuses that still occupy the calendar slot.
    pub const BLOCKING: [BookingStatus; 3] = [
        BookingStatus::Scheduled,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
    ];

    /// Whether a booking in this status takes part in conflict detection.
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            BookingStatus::Scheduled | BookingStatus::Confirmed | BookingStatus::InProgress
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Scheduled => "scheduled",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
            BookingStatus::InProgress => "in_progress",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "scheduled" => Ok(BookingStatus::Scheduled),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" | "canceled" => Ok(BookingStatus::Cancelled),
            "no_show" | "no-show" => Ok(BookingStatus::NoShow),
            "in_progress" | "in-progress" => Ok(BookingStatus::InProgress),
            _ => Err(format!(
                "Invalid status: '{}'. Must be one of: scheduled, confirmed, completed, cancelled, no_show, in_progress",
                s
            )),
        }
    }
}

/// Half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Interval starting at `start` and lasting `duration_minutes`.
    pub fn from_start(start: DateTime<Utc>, duration_minutes: i32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
        }
    }

    /// Two intervals overlap iff each starts before the other ends.
    /// Back-to-back intervals (one ends exactly when the other starts) do not.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}

/// A stored booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub patient_ref: PatientRef,
    pub practitioner_ref: Option<PractitionerRef>,
    pub start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub kind: Option<String>,
    pub procedure: Option<String>,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub estimated_value: Option<f64>,
    pub risk_classification: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn end(&self) -> DateTime<Utc> {
        self.interval().end
    }

    pub fn interval(&self) -> TimeInterval {
        TimeInterval::from_start(self.start, self.duration_minutes)
    }

    pub fn is_blocking(&self) -> bool {
        self.status.is_blocking()
    }

    /// Whether this booking and `other` collide on the same practitioner.
    ///
    /// Unassigned bookings and non-blocking statuses never collide.
    pub fn collides_with(&self, other: &Booking) -> bool {
        match (&self.practitioner_ref, &other.practitioner_ref) {
            (Some(a), Some(b)) if a == b => {
                self.is_blocking()
                    && other.is_blocking()
                    && self.interval().overlaps(&other.interval())
            }
            _ => false,
        }
    }

    /// Apply a partial update in place. Does not touch `id` or `created_at`.
    pub fn apply(&mut self, patch: &BookingPatch, now: DateTime<Utc>) {
        if let Some(ref patient_ref) = patch.patient_ref {
            self.patient_ref = patient_ref.clone();
        }
        if let Some(ref practitioner_ref) = patch.practitioner_ref {
            self.practitioner_ref = practitioner_ref.clone();
        }
        if let Some(start) = patch.start {
            self.start = start;
        }
        if let Some(duration) = patch.duration_minutes {
            self.duration_minutes = duration;
        }
        if let Some(ref kind) = patch.kind {
            self.kind = kind.clone();
        }
        if let Some(ref procedure) = patch.procedure {
            self.procedure = procedure.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(ref notes) = patch.notes {
            self.notes = notes.clone();
        }
        if let Some(value) = patch.estimated_value {
            self.estimated_value = value;
        }
        if let Some(ref risk) = patch.risk_classification {
            self.risk_classification = risk.clone();
        }
        self.updated_at = now;
    }
}

/// Creation input for a booking.
///
/// `id`, `duration_minutes` and `status` are optional; stores fill in a
/// generated id, [`DEFAULT_DURATION_MINUTES`] and `scheduled` respectively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewBooking {
    #[serde(default)]
    pub id: Option<BookingId>,
    pub patient_ref: PatientRef,
    #[serde(default)]
    pub practitioner_ref: Option<PractitionerRef>,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub procedure: Option<String>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub estimated_value: Option<f64>,
    #[serde(default)]
    pub risk_classification: Option<String>,
}

impl NewBooking {
    pub fn new(patient_ref: impl Into<PatientRef>, start: DateTime<Utc>) -> Self {
        Self {
            patient_ref: patient_ref.into(),
            start,
            ..Default::default()
        }
    }

    pub fn with_practitioner(mut self, practitioner_ref: impl Into<PractitionerRef>) -> Self {
        self.practitioner_ref = Some(practitioner_ref.into());
        self
    }

    pub fn with_duration(mut self, minutes: i32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn with_status(mut self, status: BookingStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn effective_duration(&self) -> i32 {
        self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES)
    }

    pub fn effective_status(&self) -> BookingStatus {
        self.status.unwrap_or_default()
    }

    pub fn interval(&self) -> TimeInterval {
        TimeInterval::from_start(self.start, self.effective_duration())
    }

    /// Materialize the stored form, stamping id and timestamps.
    pub fn into_booking(self, id: BookingId, now: DateTime<Utc>) -> Booking {
        let duration_minutes = self.effective_duration();
        let status = self.effective_status();
        Booking {
            id,
            patient_ref: self.patient_ref,
            practitioner_ref: self.practitioner_ref,
            start: self.start,
            duration_minutes,
            kind: self.kind,
            procedure: self.procedure,
            status,
            notes: self.notes,
            estimated_value: self.estimated_value,
            risk_classification: self.risk_classification,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a booking. `None` leaves a field unchanged.
///
/// Optional booking fields are doubly optional: `Some(None)` clears them,
/// which JSON spells as an explicit `null`. For `practitioner_ref` that
/// means unassigning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookingPatch {
    #[serde(default)]
    pub patient_ref: Option<PatientRef>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub practitioner_ref: Option<Option<PractitionerRef>>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub procedure: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_value: Option<Option<f64>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub risk_classification: Option<Option<String>>,
}

impl BookingPatch {
    pub fn status(status: BookingStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Whether the patch moves the booking in time or between practitioners.
    pub fn touches_slot(&self) -> bool {
        self.start.is_some() || self.duration_minutes.is_some() || self.practitioner_ref.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == BookingPatch::default()
    }
}

// A present field (even `null`) deserializes to `Some(..)`; an absent one
// falls back to `#[serde(default)]`.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
