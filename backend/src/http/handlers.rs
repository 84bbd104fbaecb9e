//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to
//! [`SchedulingService`](crate::services::SchedulingService).

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};

use super::dto::{
    BookingListQuery, BookingListResponse, HealthResponse, StatisticsQuery, StatusRequest,
    WindowQuery,
};
use super::error::AppError;
use super::state::AppState;
use crate::models::{Booking, BookingId, BookingPatch, NewBooking};
use crate::services::{BookingStatistics, CalendarPage, Granularity, Reschedule};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Reports whether the booking store answers.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let healthy = state.scheduling.health_check().await;

    Ok(Json(HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        version: "v1".to_string(),
        database: if healthy { "connected" } else { "disconnected" }.to_string(),
    }))
}

// =============================================================================
// Bookings
// =============================================================================

/// GET /v1/bookings
///
/// List every booking (most recent first), or one calendar page when
/// `date`/`granularity` are given (ascending by start).
pub async fn list_bookings(
    State(state): State<AppState>,
    query: Result<Query<BookingListQuery>, QueryRejection>,
) -> HandlerResult<BookingListResponse> {
    let Query(query) = query?;
    let filter = query.filter();

    let (bookings, window) = if query.is_period() {
        let date = query.date.unwrap_or_else(|| state.scheduling.today());
        let granularity = query.granularity.unwrap_or(Granularity::Week);
        let page = state.scheduling.calendar_page(date, granularity, 0)?;
        let bookings = state
            .scheduling
            .list_by_period(date, granularity, &filter)
            .await?;
        (bookings, Some(page.window()))
    } else {
        let all = state.scheduling.list_all().await?;
        (all.into_iter().filter(|b| filter.matches(b)).collect(), None)
    };

    Ok(Json(BookingListResponse {
        total: bookings.len(),
        bookings,
        window,
    }))
}

/// POST /v1/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    payload: Result<Json<NewBooking>, JsonRejection>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let Json(input) = payload?;
    let booking = state.scheduling.create(input).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /v1/bookings/{id}
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult<Booking> {
    let booking = state.scheduling.get(&BookingId::new(id)).await?;
    Ok(Json(booking))
}

/// PATCH /v1/bookings/{id}
///
/// Partial edit. An explicit `"practitioner_ref": null` unassigns.
pub async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<BookingPatch>, JsonRejection>,
) -> HandlerResult<Booking> {
    let Json(patch) = payload?;
    let booking = state.scheduling.update(&BookingId::new(id), patch).await?;
    Ok(Json(booking))
}

/// DELETE /v1/bookings/{id}
///
/// Administrative hard delete. Regular workflows cancel instead.
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.scheduling.remove(&BookingId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/bookings/{id}/reschedule
///
/// Used for both form edits and drag-and-drop moves.
pub async fn reschedule_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Reschedule>, JsonRejection>,
) -> HandlerResult<Booking> {
    let Json(request) = payload?;
    let booking = state
        .scheduling
        .reschedule(&BookingId::new(id), request)
        .await?;
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> HandlerResult<Booking> {
    let Json(request) = payload?;
    let booking = state
        .scheduling
        .update_status(&BookingId::new(id), request.status)
        .await?;
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/cancel
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.scheduling.cancel(&BookingId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Calendar
// =============================================================================

/// GET /v1/bookings/statistics
pub async fn get_statistics(
    State(state): State<AppState>,
    query: Result<Query<StatisticsQuery>, QueryRejection>,
) -> HandlerResult<BookingStatistics> {
    let Query(query) = query?;
    let date = query.date.unwrap_or_else(|| state.scheduling.today());
    let stats = state.scheduling.statistics(date).await?;
    Ok(Json(stats))
}

/// GET /v1/calendar/window
///
/// Resolve the calendar page `step` pages away from `date`.
pub async fn get_calendar_window(
    State(state): State<AppState>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> HandlerResult<CalendarPage> {
    let Query(query) = query?;
    let date = query.date.unwrap_or_else(|| state.scheduling.today());
    let page = state
        .scheduling
        .calendar_page(date, query.granularity, query.step)?;
    Ok(Json(page))
}
