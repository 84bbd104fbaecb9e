//! Repository trait definitions for booking storage.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`booking`]: The booking store contract
//!
//! Services take the store as `&dyn BookingRepository` or
//! `Arc<dyn BookingRepository>`, so the in-memory and Postgres
//! implementations are interchangeable at construction time.

pub mod booking;
pub mod error;

pub use booking::BookingRepository;
pub use error::{ErrorContext, RepositoryError, RepositoryResult};
