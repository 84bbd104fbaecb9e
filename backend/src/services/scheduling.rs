//! Scheduling service.
//!
//! Owns every write to the calendar. Each write that can change which slot
//! a booking occupies runs its conflict check and its store write under the
//! lock of every practitioner involved, so two writers can never both win
//! the same slot through this service.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::db::repo_config::SchedulingSettings;
use crate::db::repository::BookingRepository;
use crate::models::{
    Booking, BookingId, BookingPatch, BookingStatus, NewBooking, PractitionerRef,
    DEFAULT_DURATION_MINUTES,
};
use crate::services::conflict::find_conflict;
use crate::services::error::{SchedulingError, SchedulingResult};
use crate::services::locks::PractitionerLocks;
use crate::services::period::{self, CalendarPage, Granularity};
use crate::services::statistics::{aggregate, BookingStatistics};

/// Service-level settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingConfig {
    /// Duration given to bookings created without one.
    pub default_duration_minutes: i32,
    /// Fixed offset of the clinic calendar.
    pub calendar_offset: FixedOffset,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: DEFAULT_DURATION_MINUTES,
            calendar_offset: Utc.fix(),
        }
    }
}

fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, String> {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| format!("Calendar UTC offset of {} minutes is out of range", minutes))
}

impl SchedulingConfig {
    /// Build from the `[scheduling]` section of `repository.toml`.
    pub fn from_settings(settings: &SchedulingSettings) -> Result<Self, String> {
        if settings.default_duration_minutes <= 0 {
            return Err("default_duration_minutes must be positive".to_string());
        }
        Ok(Self {
            default_duration_minutes: settings.default_duration_minutes,
            calendar_offset: offset_from_minutes(settings.calendar_utc_offset_minutes)?,
        })
    }

    /// Apply environment overrides.
    ///
    /// # Environment Variables
    /// - `DEFAULT_BOOKING_MINUTES`: default booking duration
    /// - `CALENDAR_UTC_OFFSET_MINUTES`: calendar offset, minutes east of UTC
    pub fn with_env_overrides(mut self) -> Result<Self, String> {
        if let Ok(raw) = std::env::var("DEFAULT_BOOKING_MINUTES") {
            let minutes: i32 = raw
                .trim()
                .parse()
                .map_err(|_| format!("DEFAULT_BOOKING_MINUTES is not an integer: {}", raw))?;
            if minutes <= 0 {
                return Err("DEFAULT_BOOKING_MINUTES must be positive".to_string());
            }
            self.default_duration_minutes = minutes;
        }
        if let Ok(raw) = std::env::var("CALENDAR_UTC_OFFSET_MINUTES") {
            let minutes: i32 = raw
                .trim()
                .parse()
                .map_err(|_| format!("CALENDAR_UTC_OFFSET_MINUTES is not an integer: {}", raw))?;
            self.calendar_offset = offset_from_minutes(minutes)?;
        }
        Ok(self)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Result<Self, String> {
        Self::default().with_env_overrides()
    }
}

/// Move request, used for explicit edits and drag-initiated moves alike.
///
/// Absent `duration_minutes` or `practitioner_ref` keep the booking's
/// current values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reschedule {
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub practitioner_ref: Option<PractitionerRef>,
}

impl Reschedule {
    pub fn to(start: DateTime<Utc>) -> Self {
        Self {
            start,
            duration_minutes: None,
            practitioner_ref: None,
        }
    }

    pub fn with_duration(mut self, minutes: i32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    pub fn with_practitioner(mut self, practitioner: impl Into<PractitionerRef>) -> Self {
        self.practitioner_ref = Some(practitioner.into());
        self
    }

    fn into_patch(self) -> BookingPatch {
        BookingPatch {
            start: Some(self.start),
            duration_minutes: self.duration_minutes,
            practitioner_ref: self.practitioner_ref.map(Some),
            ..Default::default()
        }
    }
}

/// Optional narrowing of a period listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingFilter {
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub practitioner_ref: Option<PractitionerRef>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        self.status.map_or(true, |s| booking.status == s)
            && self
                .practitioner_ref
                .as_ref()
                .map_or(true, |p| booking.practitioner_ref.as_ref() == Some(p))
    }
}

/// The calendar's scheduling engine.
///
/// ```
/// use std::sync::Arc;
/// use clinic_scheduling::db::LocalRepository;
/// use clinic_scheduling::models::NewBooking;
/// use clinic_scheduling::services::SchedulingService;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let service = SchedulingService::new(Arc::new(LocalRepository::new()));
/// let start = "2025-01-06T09:00:00Z".parse().unwrap();
///
/// service
///     .create(NewBooking::new("patient-1", start).with_practitioner("dr-a"))
///     .await
///     .unwrap();
/// let clash = service
///     .create(NewBooking::new("patient-2", start).with_practitioner("dr-a"))
///     .await;
/// assert!(clash.unwrap_err().is_conflict());
/// # });
/// ```
#[derive(Clone)]
pub struct SchedulingService {
    repo: Arc<dyn BookingRepository>,
    locks: PractitionerLocks,
    config: SchedulingConfig,
}

impl SchedulingService {
    pub fn new(repo: Arc<dyn BookingRepository>) -> Self {
        Self::with_config(repo, SchedulingConfig::default())
    }

    pub fn with_config(repo: Arc<dyn BookingRepository>, config: SchedulingConfig) -> Self {
        Self {
            repo,
            locks: PractitionerLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &SchedulingConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn BookingRepository> {
        &self.repo
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create a booking.
    ///
    /// Defaults duration and status, then checks the practitioner's calendar
    /// when the booking is assigned and starts in a blocking status.
    pub async fn create(&self, mut input: NewBooking) -> SchedulingResult<Booking> {
        if input.patient_ref.is_blank() {
            return Err(SchedulingError::validation("patient_ref is required"));
        }
        if input.practitioner_ref.as_ref().is_some_and(|p| p.is_blank()) {
            input.practitioner_ref = None;
        }
        let duration = input
            .duration_minutes
            .unwrap_or(self.config.default_duration_minutes);
        input.duration_minutes = Some(duration);
        input.status = Some(input.effective_status());
        validate_slot(input.start, duration)?;
        validate_value(input.estimated_value)?;

        let practitioner = input.practitioner_ref.clone();
        let _guard = self.locks.lock(practitioner.iter()).await;

        if input.effective_status().is_blocking() {
            let existing = find_conflict(
                self.repo.as_ref(),
                practitioner.as_ref(),
                &input.interval(),
                None,
            )
            .await
            .map_err(|e| SchedulingError::from_store(e, None, practitioner.as_ref()))?;
            if let (Some(practitioner), Some(existing)) = (practitioner.as_ref(), existing) {
                log::warn!(
                    "Rejected booking for {} at {}: overlaps {}",
                    practitioner,
                    input.interval(),
                    existing.id
                );
                return Err(SchedulingError::conflict(
                    practitioner.clone(),
                    Some(&existing),
                ));
            }
        }

        let stored = self
            .repo
            .insert_booking(&input)
            .await
            .map_err(|e| SchedulingError::from_store(e, input.id.as_ref(), practitioner.as_ref()))?;
        log::info!(
            "Created booking {} for patient {} at {}",
            stored.id,
            stored.patient_ref,
            stored.interval()
        );
        Ok(stored)
    }

    /// Move a booking to a new start, optionally changing its duration or
    /// practitioner.
    pub async fn reschedule(&self, id: &BookingId, request: Reschedule) -> SchedulingResult<Booking> {
        let moved = self.modify(id, request.into_patch()).await?;
        log::info!("Rescheduled booking {} to {}", moved.id, moved.interval());
        Ok(moved)
    }

    /// Apply a partial edit.
    pub async fn update(&self, id: &BookingId, patch: BookingPatch) -> SchedulingResult<Booking> {
        self.modify(id, patch).await
    }

    /// Change only the status.
    ///
    /// Moving from a non-blocking status back into a blocking one re-checks
    /// the slot; every other transition is accepted as is.
    pub async fn update_status(
        &self,
        id: &BookingId,
        status: BookingStatus,
    ) -> SchedulingResult<Booking> {
        let updated = self.modify(id, BookingPatch::status(status)).await?;
        log::info!("Booking {} is now {}", updated.id, updated.status);
        Ok(updated)
    }

    /// Cancel a booking. Cancelling an already cancelled booking is a no-op.
    pub async fn cancel(&self, id: &BookingId) -> SchedulingResult<()> {
        let current = self.get(id).await?;
        if current.status == BookingStatus::Cancelled {
            log::debug!("Booking {} already cancelled", id);
            return Ok(());
        }
        self.update_status(id, BookingStatus::Cancelled).await?;
        Ok(())
    }

    /// Administrative hard delete.
    pub async fn remove(&self, id: &BookingId) -> SchedulingResult<()> {
        self.repo
            .delete_booking(id)
            .await
            .map_err(|e| SchedulingError::from_store(e, Some(id), None))?;
        log::info!("Removed booking {}", id);
        Ok(())
    }

    async fn modify(&self, id: &BookingId, mut patch: BookingPatch) -> SchedulingResult<Booking> {
        validate_patch(&mut patch)?;

        loop {
            let current = self.get(id).await?;
            if patch.is_empty() {
                return Ok(current);
            }
            let keys = lock_keys(&current, &patch);
            let _guard = self.locks.lock(keys.iter()).await;

            // Re-read under the lock; retry if a concurrent move changed
            // which practitioners are involved.
            let current = self.get(id).await?;
            if lock_keys(&current, &patch) != keys {
                continue;
            }

            let mut candidate = current.clone();
            candidate.apply(&patch, Utc::now());
            validate_slot(candidate.start, candidate.duration_minutes)?;

            let entering_block = !current.is_blocking() && candidate.is_blocking();
            let practitioner = candidate.practitioner_ref.clone();
            if candidate.is_blocking() && (patch.touches_slot() || entering_block) {
                let existing = find_conflict(
                    self.repo.as_ref(),
                    practitioner.as_ref(),
                    &candidate.interval(),
                    Some(id),
                )
                .await
                .map_err(|e| SchedulingError::from_store(e, Some(id), practitioner.as_ref()))?;
                if let (Some(practitioner), Some(existing)) = (practitioner.as_ref(), existing) {
                    log::warn!(
                        "Rejected change to booking {} ({}): overlaps {}",
                        id,
                        candidate.interval(),
                        existing.id
                    );
                    return Err(SchedulingError::conflict(
                        practitioner.clone(),
                        Some(&existing),
                    ));
                }
            }

            return self
                .repo
                .update_booking(id, &patch)
                .await
                .map_err(|e| SchedulingError::from_store(e, Some(id), practitioner.as_ref()));
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get(&self, id: &BookingId) -> SchedulingResult<Booking> {
        self.repo
            .get_booking(id)
            .await
            .map_err(|e| SchedulingError::from_store(e, Some(id), None))
    }

    /// Every booking, most recent start first.
    pub async fn list_all(&self) -> SchedulingResult<Vec<Booking>> {
        self.repo
            .list_bookings()
            .await
            .map_err(|e| SchedulingError::from_store(e, None, None))
    }

    /// Bookings starting inside the calendar page around `reference`,
    /// ascending by start.
    pub async fn list_by_period(
        &self,
        reference: NaiveDate,
        granularity: Granularity,
        filter: &BookingFilter,
    ) -> SchedulingResult<Vec<Booking>> {
        let window = period::window_for(reference, granularity, self.config.calendar_offset)?;
        let bookings = self
            .repo
            .list_by_time_range(window.start, window.end)
            .await
            .map_err(|e| SchedulingError::from_store(e, None, None))?;
        log::debug!(
            "{} bookings in {} of {}",
            bookings.len(),
            granularity,
            reference
        );
        Ok(bookings.into_iter().filter(|b| filter.matches(b)).collect())
    }

    /// Calendar page `step` pages away from `reference`.
    pub fn calendar_page(
        &self,
        reference: NaiveDate,
        granularity: Granularity,
        step: i32,
    ) -> SchedulingResult<CalendarPage> {
        Ok(period::page(
            reference,
            granularity,
            step,
            self.config.calendar_offset,
        )?)
    }

    /// Today's date on the clinic calendar.
    pub fn today(&self) -> NaiveDate {
        period::local_date(Utc::now(), self.config.calendar_offset)
    }

    pub async fn statistics(&self, reference: NaiveDate) -> SchedulingResult<BookingStatistics> {
        let snapshot = self.list_all().await?;
        Ok(aggregate(&snapshot, reference, self.config.calendar_offset)?)
    }

    /// Whether the booking store answers. Store errors read as unhealthy.
    pub async fn health_check(&self) -> bool {
        match self.repo.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                log::warn!("Booking store health check failed: {}", e);
                false
            }
        }
    }
}

fn lock_keys(current: &Booking, patch: &BookingPatch) -> Vec<PractitionerRef> {
    let mut keys: Vec<PractitionerRef> = current.practitioner_ref.iter().cloned().collect();
    if let Some(Some(next)) = &patch.practitioner_ref {
        keys.push(next.clone());
    }
    keys.sort();
    keys.dedup();
    keys
}

fn validate_slot(start: DateTime<Utc>, duration_minutes: i32) -> SchedulingResult<()> {
    if duration_minutes <= 0 {
        return Err(SchedulingError::validation(format!(
            "duration_minutes must be positive, got {}",
            duration_minutes
        )));
    }
    if start
        .checked_add_signed(Duration::minutes(i64::from(duration_minutes)))
        .is_none()
    {
        return Err(SchedulingError::validation(
            "booking end is outside the supported time range",
        ));
    }
    Ok(())
}

fn validate_value(value: Option<f64>) -> SchedulingResult<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(SchedulingError::validation(format!(
            "estimated_value must be a non-negative amount, got {}",
            v
        ))),
        _ => Ok(()),
    }
}

fn validate_patch(patch: &mut BookingPatch) -> SchedulingResult<()> {
    if patch.patient_ref.as_ref().is_some_and(|p| p.is_blank()) {
        return Err(SchedulingError::validation("patient_ref must not be blank"));
    }
    if let Some(minutes) = patch.duration_minutes {
        if minutes <= 0 {
            return Err(SchedulingError::validation(format!(
                "duration_minutes must be positive, got {}",
                minutes
            )));
        }
    }
    // A blank practitioner from a cleared form field unassigns
    if let Some(Some(p)) = &patch.practitioner_ref {
        if p.is_blank() {
            patch.practitioner_ref = Some(None);
        }
    }
    validate_value(patch.estimated_value.flatten())
}
