//! Booking store implementations.
//!
//! - `local`: in-memory store for tests, development and offline mode
//! - `postgres`: PostgreSQL store with Diesel ORM (feature `postgres-repo`)
pub mod local;
#[cfg(feature = "postgres-repo")]
pub mod postgres;

pub use local::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use postgres::PostgresRepository;
