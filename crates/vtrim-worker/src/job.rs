//! The job aggregate.
//!
//! A [`Job`] owns one uploaded source file and the clips cut from it. Every
//! clip reports exactly once through [`Job::record_outcome`]; the call that
//! brings the outstanding count to zero moves the job to `Draining` and is
//! the only one told to run [`Job::cleanup`], which deletes the source and
//! moves the job to `Complete`.
//!
//! All bookkeeping happens under one mutex, so the last two clips finishing
//! at the same instant still produce exactly one drain.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};

use vtrim_media::{output_filename, EncodeOutcome};
use vtrim_models::{ClipSpec, FailedClip, JobId, JobState, JobStatus, SucceededClip};

use crate::logging::JobLogger;
use crate::metrics;

#[derive(Debug)]
pub(crate) struct JobProgress {
    outstanding: usize,
    /// One flag per clip; set when its outcome has been recorded
    reported: Vec<bool>,
    succeeded: Vec<SucceededClip>,
    failed: Vec<FailedClip>,
    state: JobState,
    cleanup_claimed: bool,
    completed_at: Option<DateTime<Utc>>,
}

/// One source file and the clips requested from it.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    source: PathBuf,
    clips: Vec<ClipSpec>,
    created_at: DateTime<Utc>,
    progress: Mutex<JobProgress>,
    state_tx: watch::Sender<JobState>,
    logger: JobLogger,
}

impl Job {
    /// Create a job. With no clips the job starts out `Draining`.
    pub fn new(id: JobId, source: PathBuf, clips: Vec<ClipSpec>) -> Self {
        let state = if clips.is_empty() {
            JobState::Draining
        } else {
            JobState::Running
        };
        let (state_tx, _) = watch::channel(state);
        let logger = JobLogger::new(&id, clips.len());

        Self {
            progress: Mutex::new(JobProgress {
                outstanding: clips.len(),
                reported: vec![false; clips.len()],
                succeeded: Vec::new(),
                failed: Vec::new(),
                state,
                cleanup_claimed: false,
                completed_at: None,
            }),
            id,
            source,
            clips,
            created_at: Utc::now(),
            state_tx,
            logger,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn clips(&self) -> &[ClipSpec] {
        &self.clips
    }

    pub fn logger(&self) -> &JobLogger {
        &self.logger
    }

    /// Current lifecycle state.
    pub fn state(&self) -> JobState {
        *self.state_tx.borrow()
    }

    /// Record the outcome of clip `index`.
    ///
    /// Returns `true` for exactly one call per job: the one that brought
    /// the outstanding count to zero. The caller must then run
    /// [`Job::cleanup`]. Duplicate or out-of-range reports are ignored.
    pub async fn record_outcome(&self, index: usize, outcome: EncodeOutcome) -> bool {
        let mut progress = self.progress.lock().await;

        let already_reported = progress.reported.get(index).copied();
        match already_reported {
            Some(false) => progress.reported[index] = true,
            Some(true) => {
                self.logger.report_ignored(index, "duplicate outcome");
                return false;
            }
            None => {
                self.logger.report_ignored(index, "no such clip");
                return false;
            }
        }

        let name = self.clips[index].name().to_string();
        let success = outcome.is_success();
        match outcome {
            EncodeOutcome::Success { output_path } => progress.succeeded.push(SucceededClip {
                name,
                filename: output_filename(&output_path),
            }),
            EncodeOutcome::Failure { reason } => progress.failed.push(FailedClip { name, reason }),
        }

        progress.outstanding -= 1;
        self.logger
            .clip_reported(index, success, progress.outstanding);

        if progress.outstanding > 0 {
            return false;
        }

        progress.state = JobState::Draining;
        self.state_tx.send_replace(JobState::Draining);
        true
    }

    /// Delete the source file and mark the job `Complete`.
    ///
    /// Only acts on a `Draining` job and only once; any other call returns
    /// `false` without touching the filesystem. A failed delete is logged
    /// and the job still completes.
    pub async fn cleanup(&self) -> bool {
        {
            let mut progress = self.progress.lock().await;
            if progress.state != JobState::Draining || progress.cleanup_claimed {
                return false;
            }
            progress.cleanup_claimed = true;
        }

        let removed = match tokio::fs::remove_file(&self.source).await {
            Ok(()) => true,
            Err(e) => {
                metrics::record_cleanup_failure();
                self.logger.cleanup_failed(&self.source, &e);
                false
            }
        };

        let mut progress = self.progress.lock().await;
        progress.state = JobState::Complete;
        progress.completed_at = Some(Utc::now());
        self.state_tx.send_replace(JobState::Complete);

        metrics::record_job_completed(progress.failed.len());
        self.logger
            .completed(progress.succeeded.len(), progress.failed.len(), removed);
        true
    }

    /// Point-in-time status snapshot.
    pub async fn status(&self) -> JobStatus {
        let progress = self.progress.lock().await;
        JobStatus {
            job_id: self.id.clone(),
            state: progress.state,
            total_clips: self.clips.len(),
            outstanding: progress.outstanding,
            succeeded: progress.succeeded.clone(),
            failed: progress.failed.clone(),
            created_at: self.created_at,
            completed_at: progress.completed_at,
        }
    }

    /// When the job reached `Complete`, if it has.
    pub async fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.progress.lock().await.completed_at
    }
}

#[cfg(test)]
impl Job {
    pub(crate) async fn lock_progress(&self) -> tokio::sync::MutexGuard<'_, JobProgress> {
        self.progress.lock().await
    }
}

/// Shared handle to a submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    job: Arc<Job>,
}

impl JobHandle {
    pub(crate) fn new(job: Arc<Job>) -> Self {
        Self { job }
    }

    pub fn id(&self) -> &JobId {
        self.job.id()
    }

    pub fn state(&self) -> JobState {
        self.job.state()
    }

    pub async fn status(&self) -> JobStatus {
        self.job.status().await
    }

    /// Wait until the job is `Complete` (source deleted or delete attempted).
    pub async fn wait_complete(&self) {
        let mut rx = self.job.state_tx.subscribe();
        // The sender lives as long as the job, which this handle keeps alive.
        let _ = rx.wait_for(|state| state.is_terminal()).await;
    }
}
