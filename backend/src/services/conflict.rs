//! Overlap detection against a practitioner's blocking bookings.
//!
//! Detection always consults the practitioner's full set of blocking
//! bookings, never just the window a calendar happens to display.

use crate::db::repository::{BookingRepository, RepositoryResult};
use crate::models::{Booking, BookingId, PractitionerRef, TimeInterval};

/// Earliest booking in `existing` whose interval overlaps `candidate`.
///
/// Callers pass bookings that are already known to block; the status is
/// checked again here so stale snapshots cannot produce false conflicts.
pub fn first_overlap<'a>(
    existing: &'a [Booking],
    candidate: &TimeInterval,
    exclude: Option<&BookingId>,
) -> Option<&'a Booking> {
    existing
        .iter()
        .filter(|b| Some(&b.id) != exclude)
        .filter(|b| b.is_blocking())
        .filter(|b| b.interval().overlaps(candidate))
        .min_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)))
}

/// Find the booking that `candidate` would collide with, if any.
///
/// An absent practitioner never conflicts and the store is not queried.
pub async fn find_conflict(
    repo: &dyn BookingRepository,
    practitioner: Option<&PractitionerRef>,
    candidate: &TimeInterval,
    exclude: Option<&BookingId>,
) -> RepositoryResult<Option<Booking>> {
    let Some(practitioner) = practitioner else {
        return Ok(None);
    };

    let active = repo
        .list_active_by_practitioner(practitioner, exclude)
        .await?;
    Ok(first_overlap(&active, candidate, exclude).cloned())
}

pub async fn has_conflict(
    repo: &dyn BookingRepository,
    practitioner: Option<&PractitionerRef>,
    candidate: &TimeInterval,
    exclude: Option<&BookingId>,
) -> RepositoryResult<bool> {
    Ok(find_conflict(repo, practitioner, candidate, exclude)
        .await?
        .is_some())
}
