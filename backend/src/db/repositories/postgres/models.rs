use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::bookings;
use crate::db::repository::{ErrorContext, RepositoryError, RepositoryResult};
use crate::models::{Booking, BookingId, BookingStatus, PatientRef, PractitionerRef};

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingRow {
    pub id: String,
    pub patient_ref: String,
    pub practitioner_ref: Option<String>,
    pub start_at: DateTime<Utc>,
    #[allow(dead_code)] // Maintained for the exclusion constraint only
    pub end_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub kind: Option<String>,
    pub procedure: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub estimated_value: Option<f64>,
    pub risk_classification: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = RepositoryError;

    fn try_from(row: BookingRow) -> RepositoryResult<Self> {
        let status: BookingStatus = row.status.parse().map_err(|e: String| {
            RepositoryError::internal_with_context(
                e,
                ErrorContext::new("decode_booking")
                    .with_entity("booking")
                    .with_entity_id(&row.id),
            )
        })?;

        Ok(Booking {
            id: BookingId(row.id),
            patient_ref: PatientRef(row.patient_ref),
            practitioner_ref: row.practitioner_ref.map(PractitionerRef),
            start: row.start_at,
            duration_minutes: row.duration_minutes,
            kind: row.kind,
            procedure: row.procedure,
            status,
            notes: row.notes,
            estimated_value: row.estimated_value,
            risk_classification: row.risk_classification,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBookingRow {
    pub id: String,
    pub patient_ref: String,
    pub practitioner_ref: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub kind: Option<String>,
    pub procedure: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub estimated_value: Option<f64>,
    pub risk_classification: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Booking> for NewBookingRow {
    fn from(b: &Booking) -> Self {
        Self {
            id: b.id.to_string(),
            patient_ref: b.patient_ref.to_string(),
            practitioner_ref: b.practitioner_ref.as_ref().map(|p| p.to_string()),
            start_at: b.start,
            end_at: b.end(),
            duration_minutes: b.duration_minutes,
            kind: b.kind.clone(),
            procedure: b.procedure.clone(),
            status: b.status.as_str().to_string(),
            notes: b.notes.clone(),
            estimated_value: b.estimated_value,
            risk_classification: b.risk_classification.clone(),
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

/// Full-row changeset written after a patch has been applied in memory.
///
/// `None` writes `NULL`, so unassigning a practitioner clears the column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = bookings)]
#[diesel(treat_none_as_null = true)]
pub struct BookingChangeset {
    pub patient_ref: String,
    pub practitioner_ref: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub kind: Option<String>,
    pub procedure: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub estimated_value: Option<f64>,
    pub risk_classification: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Booking> for BookingChangeset {
    fn from(b: &Booking) -> Self {
        Self {
            patient_ref: b.patient_ref.to_string(),
            practitioner_ref: b.practitioner_ref.as_ref().map(|p| p.to_string()),
            start_at: b.start,
            end_at: b.end(),
            duration_minutes: b.duration_minutes,
            kind: b.kind.clone(),
            procedure: b.procedure.clone(),
            status: b.status.as_str().to_string(),
            notes: b.notes.clone(),
            estimated_value: b.estimated_value,
            risk_classification: b.risk_classification.clone(),
            updated_at: b.updated_at,
        }
    }
}
