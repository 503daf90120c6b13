//! Health check handler.

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
    pub ffmpeg: bool,
    pub active_jobs: usize,
    pub encode_profile: String,
}

/// Health check endpoint (liveness probe).
///
/// Reports `degraded` when the encode engine was not found at startup;
/// uploads are still accepted but every clip will fail.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.ffmpeg_available {
        "healthy"
    } else {
        "degraded"
    };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        ffmpeg: state.ffmpeg_available,
        active_jobs: state.coordinator.active_jobs().await,
        encode_profile: state.coordinator.config().profile.as_str().to_string(),
    })
}
