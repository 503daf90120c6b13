//! Application state.

use std::sync::Arc;

use vtrim_worker::JobCoordinator;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub coordinator: Arc<JobCoordinator>,
    /// Whether `ffmpeg` was found on PATH at startup
    pub ffmpeg_available: bool,
}

impl AppState {
    pub fn new(config: ApiConfig, coordinator: Arc<JobCoordinator>, ffmpeg_available: bool) -> Self {
        Self {
            config,
            coordinator,
            ffmpeg_available,
        }
    }
}
