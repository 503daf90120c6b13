//! Job and clip metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder. Without a recorder these calls are no-ops.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "vtrim_jobs_submitted_total";
    pub const JOB_CLIP_COUNT: &str = "vtrim_job_clip_count";
    pub const JOBS_COMPLETED_TOTAL: &str = "vtrim_jobs_completed_total";
    pub const CLIPS_PROCESSED_TOTAL: &str = "vtrim_clips_processed_total";
    pub const ENCODE_DURATION_SECONDS: &str = "vtrim_encode_duration_seconds";
    pub const CLEANUP_FAILURES_TOTAL: &str = "vtrim_cleanup_failures_total";
}

pub fn record_job_submitted(clip_count: usize) {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
    histogram!(names::JOB_CLIP_COUNT).record(clip_count as f64);
}

/// Record a drained job, labelled by whether every clip succeeded.
pub fn record_job_completed(failed_clips: usize) {
    let outcome = if failed_clips == 0 { "success" } else { "partial_failure" };
    let labels = [("outcome", outcome.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

/// Record one encode task's result and duration.
pub fn record_clip_processed(profile: &str, success: bool, duration_secs: f64) {
    let status = if success { "success" } else { "failure" };
    let labels = [
        ("profile", profile.to_string()),
        ("status", status.to_string()),
    ];
    counter!(names::CLIPS_PROCESSED_TOTAL, &labels).increment(1);
    histogram!(names::ENCODE_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_cleanup_failure() {
    counter!(names::CLEANUP_FAILURES_TOTAL).increment(1);
}
