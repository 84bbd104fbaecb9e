//! Router configuration for the HTTP API.
//!
//! This module sets up all routes, middleware (CORS, compression, tracing),
//! and creates the axum router ready for serving.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration - permissive for the calendar dev server
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route(
            "/bookings",
            get(handlers::list_bookings).post(handlers::create_booking),
        )
        .route("/bookings/statistics", get(handlers::get_statistics))
        .route(
            "/bookings/{id}",
            get(handlers::get_booking)
                .patch(handlers::update_booking)
                .delete(handlers::delete_booking),
        )
        .route("/bookings/{id}/reschedule", post(handlers::reschedule_booking))
        .route("/bookings/{id}/status", post(handlers::update_status))
        .route("/bookings/{id}/cancel", post(handlers::cancel_booking))
        .route("/calendar/window", get(handlers::get_calendar_window));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
