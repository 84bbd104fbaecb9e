//! Data Transfer Objects for the HTTP API.
//!
//! Bookings, patches and statistics are serialized as-is; this module only
//! holds the request/response wrappers the endpoints add around them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Booking, BookingStatus, PractitionerRef};
use crate::services::{BookingFilter, Granularity, PeriodWindow};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

/// Query parameters for `GET /v1/bookings`.
///
/// Without `date` and `granularity` every booking is listed; with either,
/// the listing is limited to that calendar page (defaults: today, week).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingListQuery {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub granularity: Option<Granularity>,
    #[serde(default)]
    pub status: Option<BookingStatus>,
    #[serde(default)]
    pub practitioner: Option<PractitionerRef>,
}

impl BookingListQuery {
    pub fn is_period(&self) -> bool {
        self.date.is_some() || self.granularity.is_some()
    }

    pub fn filter(&self) -> BookingFilter {
        BookingFilter {
            status: self.status,
            practitioner_ref: self.practitioner.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingListResponse {
    pub bookings: Vec<Booking>,
    pub total: usize,
    /// Present for period listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<PeriodWindow>,
}

/// Body of `POST /v1/bookings/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: BookingStatus,
}

/// Query parameters for `GET /v1/bookings/statistics`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatisticsQuery {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Query parameters for `GET /v1/calendar/window`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowQuery {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default = "default_granularity")]
    pub granularity: Granularity,
    #[serde(default)]
    pub step: i32,
}

fn default_granularity() -> Granularity {
    Granularity::Week
}
