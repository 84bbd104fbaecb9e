//! # Clinic Scheduling
//!
//! Appointment-scheduling engine for a clinic-management application.
//!
//! The crate keeps a calendar of time-boxed bookings per practitioner,
//! rejects overlapping bookings, answers day/week/month period queries and
//! supports interactive rescheduling with immediate consistency between the
//! calendar grid and the stored state.
//!
//! ## Architecture
//!
//! - [`models`]: booking data model and the half-open interval type
//! - [`db`]: booking store trait, in-memory and Postgres stores, factory
//! - [`services`]: conflict detection, period windows, statistics and the
//!   [`SchedulingService`](services::SchedulingService)
//! - [`http`]: axum REST API (feature `http-server`)
//!
//! Patients and practitioners are opaque references; the engine never
//! checks that they exist.

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
