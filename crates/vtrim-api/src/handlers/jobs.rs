//! Job status handler.

use axum::extract::{Path, State};
use axum::Json;

use vtrim_models::{JobId, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Status of a submitted job: outstanding count plus per-clip outcomes.
///
/// Completed jobs stay queryable for the configured retention window.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatus>> {
    let job_id = JobId::from_string(job_id);
    state
        .coordinator
        .status(&job_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Job {} not found", job_id)))
}
