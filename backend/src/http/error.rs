//! HTTP error handling and response types.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::services::{ConflictingBooking, SchedulingError};

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// The booking a rejected write collided with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicting_booking: Option<ConflictingBooking>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            conflicting_booking: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Malformed request that never reached the service
    BadRequest(String),
    /// Failure reported by the scheduling service
    Scheduling(SchedulingError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Scheduling(e) => match e {
                SchedulingError::Validation { .. } => StatusCode::BAD_REQUEST,
                SchedulingError::NotFound { .. } => StatusCode::NOT_FOUND,
                SchedulingError::Conflict { .. } => StatusCode::CONFLICT,
                SchedulingError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::BadRequest(msg) => ApiError::new("BAD_REQUEST", msg),
            AppError::Scheduling(e) => match e {
                SchedulingError::Validation { message } => ApiError::new("VALIDATION_ERROR", message),
                SchedulingError::NotFound { .. } => ApiError::new("NOT_FOUND", e.to_string()),
                SchedulingError::Conflict { ref existing, .. } => {
                    let mut body = ApiError::new("SCHEDULING_CONFLICT", e.to_string());
                    body.conflicting_booking = existing.clone();
                    body
                }
                SchedulingError::StorageUnavailable { ref source } => {
                    tracing::error!(error = %source, "booking store unavailable");
                    ApiError::new("STORAGE_UNAVAILABLE", "Booking store is unavailable")
                        .with_details(source.to_string())
                }
            },
        };

        (status, Json(error)).into_response()
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        AppError::Scheduling(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
