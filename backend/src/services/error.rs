//! Errors reported by the scheduling service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::db::repository::RepositoryError;
use crate::models::{Booking, BookingId, PractitionerRef};
use crate::services::period::PeriodError;

pub type SchedulingResult<T> = Result<T, SchedulingError>;

/// The booking a rejected write would have collided with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingBooking {
    pub id: BookingId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl From<&Booking> for ConflictingBooking {
    fn from(b: &Booking) -> Self {
        Self {
            id: b.id.clone(),
            start: b.start,
            end: b.end(),
        }
    }
}

impl fmt::Display for ConflictingBooking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "booking {} [{}, {})",
            self.id,
            self.start.to_rfc3339(),
            self.end.to_rfc3339()
        )
    }
}

fn describe_existing(existing: &Option<ConflictingBooking>) -> String {
    match existing {
        Some(b) => format!(" with {}", b),
        None => String::new(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    /// Malformed input; nothing was written.
    #[error("Invalid booking: {message}")]
    Validation { message: String },

    /// The slot overlaps a blocking booking of the same practitioner.
    #[error("Scheduling conflict for practitioner {practitioner}{}", describe_existing(.existing))]
    Conflict {
        practitioner: PractitionerRef,
        existing: Option<ConflictingBooking>,
    },

    #[error("Booking {id} not found")]
    NotFound { id: BookingId },

    /// The booking store failed; no cached or synthetic data is substituted.
    #[error("Booking store unavailable: {source}")]
    StorageUnavailable { source: RepositoryError },
}

impl SchedulingError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(practitioner: PractitionerRef, existing: Option<&Booking>) -> Self {
        Self::Conflict {
            practitioner,
            existing: existing.map(ConflictingBooking::from),
        }
    }

    /// Translate a store failure.
    ///
    /// `id` names the booking the operation addressed and `practitioner`
    /// the one whose calendar was written, when known.
    pub fn from_store(
        err: RepositoryError,
        id: Option<&BookingId>,
        practitioner: Option<&PractitionerRef>,
    ) -> Self {
        if err.is_not_found() {
            let id = id
                .cloned()
                .or_else(|| err.context().entity_id.clone().map(BookingId))
                .unwrap_or_default();
            return Self::NotFound { id };
        }
        if err.is_validation() {
            // The store refused the record itself; nothing was written
            return Self::validation(err.message());
        }
        if err.is_constraint_violation() {
            return Self::Conflict {
                practitioner: practitioner.cloned().unwrap_or_default(),
                existing: None,
            };
        }
        Self::StorageUnavailable { source: err }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}

impl From<PeriodError> for SchedulingError {
    fn from(err: PeriodError) -> Self {
        Self::validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ErrorContext;

    #[test]
    fn test_store_error_mapping() {
        let id = BookingId::new("b-1");
        let dr = PractitionerRef::new("dr-a");

        let not_found =
            SchedulingError::from_store(RepositoryError::not_found("gone"), Some(&id), None);
        assert!(matches!(not_found, SchedulingError::NotFound { ref id } if id.as_str() == "b-1"));

        let violation = RepositoryError::constraint_violation(
            "bookings_no_overlap",
            ErrorContext::new("insert_booking"),
        );
        let conflict = SchedulingError::from_store(violation, None, Some(&dr));
        assert!(
            matches!(conflict, SchedulingError::Conflict { ref practitioner, existing: None } if *practitioner == dr)
        );

        let down = SchedulingError::from_store(RepositoryError::connection("refused"), None, None);
        assert!(down.is_storage_unavailable());

        let duplicate = RepositoryError::validation_with_context(
            "Booking b-1 already exists",
            ErrorContext::new("insert_booking").with_entity_id("b-1"),
        );
        match SchedulingError::from_store(duplicate, Some(&id), Some(&dr)) {
            SchedulingError::Validation { message } => {
                assert_eq!(message, "Booking b-1 already exists")
            }
            other => panic!("expected validation, got {:?}", other),
        }
    }

    #[test]
    fn test_not_found_falls_back_to_context_id() {
        let err = RepositoryError::not_found_with_context(
            "missing",
            ErrorContext::new("get_booking").with_entity_id("b-9"),
        );
        match SchedulingError::from_store(err, None, None) {
            SchedulingError::NotFound { id } => assert_eq!(id.as_str(), "b-9"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_conflict_message_names_existing_booking() {
        let existing = ConflictingBooking {
            id: BookingId::new("b-1"),
            start: "2025-01-06T09:00:00Z".parse().unwrap(),
            end: "2025-01-06T09:30:00Z".parse().unwrap(),
        };
        let err = SchedulingError::Conflict {
            practitioner: PractitionerRef::new("dr-a"),
            existing: Some(existing),
        };
        let message = err.to_string();
        assert!(message.contains("dr-a"));
        assert!(message.contains("booking b-1"));
        assert!(message.contains("2025-01-06T09:00:00+00:00"));
    }
}
