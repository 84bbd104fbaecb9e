//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::BookingRepository;
use crate::services::{SchedulingConfig, SchedulingService};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub scheduling: SchedulingService,
}

impl AppState {
    pub fn new(scheduling: SchedulingService) -> Self {
        Self { scheduling }
    }

    /// Wrap a repository in a service with the given settings.
    pub fn from_repository(
        repository: Arc<dyn BookingRepository>,
        config: SchedulingConfig,
    ) -> Self {
        Self::new(SchedulingService::with_config(repository, config))
    }
}
