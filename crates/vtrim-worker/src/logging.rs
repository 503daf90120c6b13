//! Structured job logging.
//!
//! Every line carries the job ID so the clips of one upload can be
//! followed through interleaved output from concurrent tasks.

use std::path::Path;

use tracing::{info, warn, Span};
use vtrim_models::JobId;

/// Lifecycle logger bound to one job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    total_clips: usize,
}

impl JobLogger {
    pub fn new(job_id: &JobId, total_clips: usize) -> Self {
        Self {
            job_id: job_id.to_string(),
            total_clips,
        }
    }

    /// Job registered and its tasks about to be spawned.
    pub fn submitted(&self, source: &Path, profile: &str) {
        info!(
            job_id = %self.job_id,
            clips = self.total_clips,
            profile,
            source = %source.display(),
            "Job submitted"
        );
    }

    /// One clip's outcome recorded.
    pub fn clip_reported(&self, index: usize, success: bool, outstanding: usize) {
        info!(
            job_id = %self.job_id,
            clip = index + 1,
            success,
            outstanding,
            "Clip {}/{} reported",
            index + 1,
            self.total_clips
        );
    }

    /// A report that did not count towards the job.
    pub fn report_ignored(&self, index: usize, why: &str) {
        warn!(job_id = %self.job_id, clip = index + 1, "Ignored clip report: {}", why);
    }

    pub fn cleanup_failed(&self, source: &Path, error: &std::io::Error) {
        warn!(
            job_id = %self.job_id,
            source = %source.display(),
            "Failed to delete source: {}",
            error
        );
    }

    pub fn completed(&self, succeeded: usize, failed: usize, source_removed: bool) {
        info!(
            job_id = %self.job_id,
            succeeded,
            failed,
            source_removed,
            "Job complete"
        );
    }

    /// Span for one clip of this job; attach it to the spawned encode task.
    pub fn clip_span(&self, clip_index: usize, clip_name: &str) -> Span {
        tracing::info_span!(
            "clip",
            job_id = %self.job_id,
            clip = clip_index + 1,
            clip_name = %clip_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_carries_job_id() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, 3);

        assert!(format!("{:?}", logger).contains(&job_id.to_string()));
        let span = logger.clip_span(0, "Intro");
        // Disabled without a subscriber, but constructible.
        let _entered = span.enter();
    }
}
