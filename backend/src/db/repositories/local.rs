//! In-memory local repository implementation.
//!
//! All bookings live in a `HashMap` behind a `parking_lot::RwLock`, which
//! makes this store fast, deterministic and isolated. It backs unit tests,
//! local development, and the offline mode of the calendar UI.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::repository::{BookingRepository, ErrorContext, RepositoryError, RepositoryResult};
use crate::models::{Booking, BookingId, BookingPatch, NewBooking, PractitionerRef};

/// In-memory local repository.
///
/// Clones share the same underlying data.
///
/// # Example
/// ```
/// use clinic_scheduling::db::repositories::LocalRepository;
/// use clinic_scheduling::db::repository::BookingRepository;
/// use clinic_scheduling::models::NewBooking;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let repo = LocalRepository::new();
/// let start = "2025-01-06T09:00:00Z".parse().unwrap();
/// let booking = repo
///     .insert_booking(&NewBooking::new("patient-1", start).with_practitioner("dr-a"))
///     .await
///     .unwrap();
/// assert_eq!(repo.get_booking(&booking.id).await.unwrap(), booking);
/// # });
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    bookings: HashMap<BookingId, Booking>,

    // Connection health
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            bookings: HashMap::new(),
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Create a repository pre-populated with stored bookings.
    ///
    /// Bookings are kept as given, ids and timestamps included.
    pub fn with_bookings(bookings: impl IntoIterator<Item = Booking>) -> Self {
        let repo = Self::new();
        {
            let mut data = repo.data.write();
            for booking in bookings {
                data.bookings.insert(booking.id.clone(), booking);
            }
        }
        repo
    }

    /// Set the health status for testing storage outages.
    ///
    /// While unhealthy every operation fails with a connection error.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.bookings.clear();
    }

    /// Get the number of bookings stored.
    pub fn booking_count(&self) -> usize {
        self.data.read().bookings.len()
    }

    /// Check if a booking exists.
    pub fn has_booking(&self, id: &BookingId) -> bool {
        self.data.read().bookings.contains_key(id)
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self, operation: &str) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection_with_context(
                "Local store is not available",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }

    fn not_found(operation: &str, id: &BookingId) -> RepositoryError {
        RepositoryError::not_found_with_context(
            format!("Booking {} not found", id),
            ErrorContext::new(operation)
                .with_entity("booking")
                .with_entity_id(id),
        )
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_ascending(bookings: &mut [Booking]) {
    bookings.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
}

#[async_trait]
impl BookingRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn insert_booking(&self, booking: &NewBooking) -> RepositoryResult<Booking> {
        self.check_health("insert_booking")?;

        let id = booking.id.clone().unwrap_or_else(BookingId::generate);
        let mut data = self.data.write();
        if data.bookings.contains_key(&id) {
            return Err(RepositoryError::validation_with_context(
                format!("Booking {} already exists", id),
                ErrorContext::new("insert_booking")
                    .with_entity("booking")
                    .with_entity_id(&id),
            ));
        }

        let stored = booking.clone().into_booking(id.clone(), Utc::now());
        data.bookings.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update_booking(
        &self,
        id: &BookingId,
        patch: &BookingPatch,
    ) -> RepositoryResult<Booking> {
        self.check_health("update_booking")?;

        let mut data = self.data.write();
        let booking = data
            .bookings
            .get_mut(id)
            .ok_or_else(|| Self::not_found("update_booking", id))?;
        booking.apply(patch, Utc::now());
        Ok(booking.clone())
    }

    async fn delete_booking(&self, id: &BookingId) -> RepositoryResult<()> {
        self.check_health("delete_booking")?;

        let mut data = self.data.write();
        match data.bookings.remove(id) {
            Some(_) => Ok(()),
            None => Err(Self::not_found("delete_booking", id)),
        }
    }

    async fn get_booking(&self, id: &BookingId) -> RepositoryResult<Booking> {
        self.check_health("get_booking")?;

        let data = self.data.read();
        data.bookings
            .get(id)
            .cloned()
            .ok_or_else(|| Self::not_found("get_booking", id))
    }

    async fn list_active_by_practitioner(
        &self,
        practitioner: &PractitionerRef,
        exclude: Option<&BookingId>,
    ) -> RepositoryResult<Vec<Booking>> {
        self.check_health("list_active_by_practitioner")?;

        let data = self.data.read();
        let mut bookings: Vec<Booking> = data
            .bookings
            .values()
            .filter(|b| b.practitioner_ref.as_ref() == Some(practitioner))
            .filter(|b| b.is_blocking())
            .filter(|b| Some(&b.id) != exclude)
            .cloned()
            .collect();
        sort_ascending(&mut bookings);
        Ok(bookings)
    }

    async fn list_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Booking>> {
        self.check_health("list_by_time_range")?;

        let data = self.data.read();
        let mut bookings: Vec<Booking> = data
            .bookings
            .values()
            .filter(|b| b.start >= start && b.start <= end)
            .cloned()
            .collect();
        sort_ascending(&mut bookings);
        Ok(bookings)
    }

    async fn list_bookings(&self) -> RepositoryResult<Vec<Booking>> {
        self.check_health("list_bookings")?;

        let data = self.data.read();
        let mut bookings: Vec<Booking> = data.bookings.values().cloned().collect();
        sort_ascending(&mut bookings);
        bookings.reverse();
        Ok(bookings)
    }
}
