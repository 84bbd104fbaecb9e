//! Booking storage.
//!
//! The scheduling service talks to storage only through the
//! [`BookingRepository`] trait, so stores can be swapped by configuration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  HTTP API / calendar UI                                  │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  SchedulingService (services::scheduling)                │
//! │  - validation and defaults                               │
//! │  - per-practitioner check-and-write                      │
//! │  - period windows, statistics                            │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  BookingRepository trait (repository) - store contract   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴──────────────────┐
//!     │                                  │
//! ┌───▼──────────────┐        ┌──────────▼──────────┐
//! │ LocalRepository  │        │ PostgresRepository  │
//! │   (in-memory)    │        │ (Diesel, optional)  │
//! └──────────────────┘        └─────────────────────┘
//! ```
//!
//! - `repository`: trait and error types
//! - `repositories::local`: in-memory store
//! - `repositories::postgres`: Postgres store (feature `postgres-repo`)
//! - `factory`: builds an `Arc<dyn BookingRepository>` from type, env or file
//! - `repo_config`: `repository.toml` parsing

#[cfg(not(any(feature = "postgres-repo", feature = "local-repo")))]
compile_error!("Enable at least one repository backend feature.");

pub mod factory;
pub mod repo_config;
pub mod repositories;
pub mod repository;

pub use factory::{RepositoryBuilder, RepositoryFactory, RepositoryType};
pub use repo_config::{PostgresConfig, RepositoryConfig, SchedulingSettings};
pub use repositories::LocalRepository;
#[cfg(feature = "postgres-repo")]
pub use repositories::PostgresRepository;
pub use repository::{BookingRepository, ErrorContext, RepositoryError, RepositoryResult};
