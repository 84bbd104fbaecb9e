//! Booking repository trait: the persistence contract the scheduling
//! service depends on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::RepositoryResult;
use crate::models::{Booking, BookingId, BookingPatch, NewBooking, PractitionerRef};

/// Repository trait for booking storage.
///
/// Implementations own id and timestamp assignment; they perform no
/// conflict detection of their own beyond what their storage engine
/// enforces (see [`RepositoryError::ConstraintViolation`]).
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
///
/// [`RepositoryError::ConstraintViolation`]: super::RepositoryError::ConstraintViolation
#[async_trait]
pub trait BookingRepository: Send + Sync {
    // ==================== Health & Connection ====================

    /// Check if the underlying store is reachable.
    ///
    /// # Returns
    /// - `Ok(true)` if the store is healthy
    /// - `Ok(false)` if it is unhealthy but no error occurred
    /// - `Err(RepositoryError)` if the check itself failed
    async fn health_check(&self) -> RepositoryResult<bool>;

    // ==================== Writes ====================

    /// Persist a new booking.
    ///
    /// Assigns a generated id when `booking.id` is `None`, defaults the
    /// duration and status, and stamps `created_at`/`updated_at`.
    async fn insert_booking(&self, booking: &NewBooking) -> RepositoryResult<Booking>;

    /// Apply a partial update and refresh `updated_at`.
    ///
    /// # Returns
    /// * `Ok(Booking)` - The booking after the update
    /// * `Err(RepositoryError::NotFound)` - If no booking has this id
    async fn update_booking(&self, id: &BookingId, patch: &BookingPatch)
        -> RepositoryResult<Booking>;

    /// Hard-delete a booking. Administrative only; the scheduling flow
    /// cancels instead.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If no booking has this id
    async fn delete_booking(&self, id: &BookingId) -> RepositoryResult<()>;

    // ==================== Reads ====================

    /// Get a single booking.
    ///
    /// # Returns
    /// * `Err(RepositoryError::NotFound)` - If no booking has this id
    async fn get_booking(&self, id: &BookingId) -> RepositoryResult<Booking>;

    /// All bookings of `practitioner` in a blocking status
    /// (`scheduled`, `confirmed`, `in_progress`), over the whole timeline,
    /// optionally excluding one booking. Ordered by start ascending.
    async fn list_active_by_practitioner(
        &self,
        practitioner: &PractitionerRef,
        exclude: Option<&BookingId>,
    ) -> RepositoryResult<Vec<Booking>>;

    /// Bookings whose start lies in `[start, end]` (both inclusive),
    /// ordered by start ascending.
    async fn list_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Booking>>;

    /// Every stored booking, most recent start first.
    async fn list_bookings(&self) -> RepositoryResult<Vec<Booking>>;
}
