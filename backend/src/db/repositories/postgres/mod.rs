//! Postgres booking store using Diesel.
//!
//! Bookings live in a single `bookings` table. Besides the columns of
//! [`Booking`], the table stores a derived `end_at` so that an exclusion
//! constraint (`bookings_no_overlap`) can reject overlapping blocking
//! bookings of one practitioner even when two writers race.
//!
//! Connections come from an r2d2 pool and every call runs on the blocking
//! thread pool. Failures flagged retryable (pool checkout, serialization
//! failures) are retried with exponential backoff; see
//! [`PostgresConfig`](crate::db::PostgresConfig) for the knobs. Pending
//! migrations run when the store is created.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::DatabaseErrorKind;
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::time::Duration;
use tokio::task;

use crate::db::repo_config::PostgresConfig;
use crate::db::repository::{BookingRepository, ErrorContext, RepositoryError, RepositoryResult};
use crate::models::{Booking, BookingId, BookingPatch, BookingStatus, NewBooking, PractitionerRef};

mod models;
mod schema;

use models::*;
use schema::bookings;

/// Name of the exclusion constraint forbidding overlapping blocking bookings.
pub const BOOKING_OVERLAP_CONSTRAINT: &str = "bookings_no_overlap";

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Diesel-backed booking store.
///
/// Slot writes run in a transaction; the exclusion constraint backs up the
/// scheduling service's per-practitioner lock across processes.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
    max_retries: u32,
    retry_delay: Duration,
}

impl PostgresRepository {
    /// Build the pool and bring the schema up to date.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(ConnectionManager::<PgConnection>::new(&config.database_url))
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        let mut conn = pool.get()?;
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        drop(conn);

        log::info!(
            "Postgres booking store ready (pool max {}, retries {})",
            config.max_pool_size,
            config.max_retries
        );
        Ok(Self {
            pool,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Run `f` on a pooled connection, off the async runtime.
    ///
    /// Retryable failures are attempted again up to `max_retries` times,
    /// doubling the delay each time. `f` may therefore run more than once.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: Fn(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let max_retries = self.max_retries;
        let mut delay = self.retry_delay;

        task::spawn_blocking(move || {
            let mut attempt = 0;
            loop {
                let result = pool
                    .get()
                    .map_err(RepositoryError::from)
                    .and_then(|mut conn| f(&mut conn));
                match result {
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        attempt += 1;
                        log::debug!("Retrying store call (attempt {}): {}", attempt + 1, e);
                        std::thread::sleep(delay);
                        delay *= 2;
                    }
                    other => return other,
                }
            }
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }
}

fn map_diesel_error(err: diesel::result::Error) -> RepositoryError {
    RepositoryError::from(err)
}

fn decode_all(rows: Vec<BookingRow>) -> RepositoryResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

fn booking_not_found(operation: &str, id: &str) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("Booking {} not found", id),
        ErrorContext::new(operation)
            .with_entity("booking")
            .with_entity_id(id),
    )
}

fn blocking_statuses() -> Vec<&'static str> {
    BookingStatus::BLOCKING.iter().map(|s| s.as_str()).collect()
}

#[async_trait]
impl BookingRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(map_diesel_error)
        })
        .await
    }

    async fn insert_booking(&self, booking: &NewBooking) -> RepositoryResult<Booking> {
        let id = booking.id.clone().unwrap_or_else(BookingId::generate);
        let stored = booking.clone().into_booking(id, Utc::now());
        let row = NewBookingRow::from(&stored);

        self.with_conn(move |conn| {
            let inserted: BookingRow = diesel::insert_into(bookings::table)
                .values(&row)
                .returning(BookingRow::as_returning())
                .get_result(conn)
                .map_err(|e| match e {
                    diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        RepositoryError::validation_with_context(
                            format!("Booking {} already exists", row.id),
                            ErrorContext::new("insert_booking")
                                .with_entity("booking")
                                .with_entity_id(&row.id),
                        )
                    }
                    other => map_diesel_error(other).with_operation("insert_booking"),
                })?;
            Booking::try_from(inserted)
        })
        .await
    }

    async fn update_booking(
        &self,
        id: &BookingId,
        patch: &BookingPatch,
    ) -> RepositoryResult<Booking> {
        let id = id.to_string();
        let patch = patch.clone();

        self.with_conn(move |conn| {
            conn.transaction(|tx| {
                let current: BookingRow = bookings::table
                    .find(&id)
                    .select(BookingRow::as_select())
                    .for_update()
                    .first(tx)
                    .optional()
                    .map_err(map_diesel_error)?
                    .ok_or_else(|| booking_not_found("update_booking", &id))?;

                let mut booking = Booking::try_from(current)?;
                booking.apply(&patch, Utc::now());

                let updated: BookingRow = diesel::update(bookings::table.find(&id))
                    .set(BookingChangeset::from(&booking))
                    .returning(BookingRow::as_returning())
                    .get_result(tx)
                    .map_err(|e| map_diesel_error(e).with_operation("update_booking"))?;
                Booking::try_from(updated)
            })
        })
        .await
    }

    async fn delete_booking(&self, id: &BookingId) -> RepositoryResult<()> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let deleted = diesel::delete(bookings::table.find(&id))
                .execute(conn)
                .map_err(map_diesel_error)?;
            if deleted == 0 {
                return Err(booking_not_found("delete_booking", &id));
            }
            Ok(())
        })
        .await
    }

    async fn get_booking(&self, id: &BookingId) -> RepositoryResult<Booking> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let row = bookings::table
                .find(&id)
                .select(BookingRow::as_select())
                .first(conn)
                .optional()
                .map_err(map_diesel_error)?
                .ok_or_else(|| booking_not_found("get_booking", &id))?;
            Booking::try_from(row)
        })
        .await
    }

    async fn list_active_by_practitioner(
        &self,
        practitioner: &PractitionerRef,
        exclude: Option<&BookingId>,
    ) -> RepositoryResult<Vec<Booking>> {
        let practitioner = practitioner.to_string();
        let exclude = exclude.map(|id| id.to_string());

        self.with_conn(move |conn| {
            let mut query = bookings::table
                .filter(bookings::practitioner_ref.eq(&practitioner))
                .filter(bookings::status.eq_any(blocking_statuses()))
                .select(BookingRow::as_select())
                .order((bookings::start_at.asc(), bookings::id.asc()))
                .into_boxed();
            if let Some(ref excluded) = exclude {
                query = query.filter(bookings::id.ne(excluded));
            }
            let rows = query.load::<BookingRow>(conn).map_err(map_diesel_error)?;
            decode_all(rows)
        })
        .await
    }

    async fn list_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> RepositoryResult<Vec<Booking>> {
        self.with_conn(move |conn| {
            let rows = bookings::table
                .filter(bookings::start_at.ge(start))
                .filter(bookings::start_at.le(end))
                .select(BookingRow::as_select())
                .order((bookings::start_at.asc(), bookings::id.asc()))
                .load::<BookingRow>(conn)
                .map_err(map_diesel_error)?;
            decode_all(rows)
        })
        .await
    }

    async fn list_bookings(&self) -> RepositoryResult<Vec<Booking>> {
        self.with_conn(|conn| {
            let rows = bookings::table
                .select(BookingRow::as_select())
                .order((bookings::start_at.desc(), bookings::id.desc()))
                .load::<BookingRow>(conn)
                .map_err(map_diesel_error)?;
            decode_all(rows)
        })
        .await
    }
}
