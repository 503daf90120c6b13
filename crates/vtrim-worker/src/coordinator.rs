//! Job coordinator.
//!
//! Turns a stored upload plus its validated clips into a [`Job`], spawns one
//! encode task per clip and returns immediately. Each task reports its
//! outcome back to the job; whichever task drains the job runs the source
//! cleanup. Jobs stay in an in-memory registry so their status can be
//! queried until they are pruned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, Instrument};

use vtrim_media::{ClipEncoder, EncodeOutcome, EncodeRequest, EncodeTask};
use vtrim_models::{ClipSpec, JobId, JobState, JobStatus};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::job::{Job, JobHandle};
use crate::metrics;

/// What the submitter gets back before any clip has been cut.
#[derive(Debug, Clone, PartialEq)]
pub struct JobAck {
    pub job_id: JobId,
    pub clip_count: usize,
    pub state: JobState,
}

/// Fans jobs out into encode tasks and tracks them until pruned.
pub struct JobCoordinator {
    config: WorkerConfig,
    encoder: Arc<dyn ClipEncoder>,
    jobs: RwLock<HashMap<JobId, Arc<Job>>>,
}

impl JobCoordinator {
    pub fn new(config: WorkerConfig, encoder: Arc<dyn ClipEncoder>) -> Self {
        Self {
            config,
            encoder,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn upload_dir(&self) -> &Path {
        &self.config.upload_dir
    }

    pub fn clips_dir(&self) -> &Path {
        &self.config.clips_dir
    }

    /// Start extracting `clips` from `source`.
    ///
    /// Returns as soon as the job is registered and its tasks are spawned.
    /// The source file is owned by the job from here on and is deleted once
    /// every clip has reported. With no clips the source is deleted before
    /// this returns.
    pub async fn submit(&self, source: PathBuf, clips: Vec<ClipSpec>) -> WorkerResult<JobAck> {
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            return Err(WorkerError::SourceMissing(source));
        }

        self.prune_finished().await;

        let clip_count = clips.len();
        let job = Arc::new(Job::new(JobId::new(), source, clips));
        let job_id = job.id().clone();

        // Registered before any task exists so status is always answerable.
        self.jobs
            .write()
            .await
            .insert(job_id.clone(), Arc::clone(&job));
        metrics::record_job_submitted(clip_count);

        job.logger()
            .submitted(job.source(), self.config.profile.as_str());

        if clip_count == 0 {
            job.cleanup().await;
            return Ok(JobAck {
                job_id,
                clip_count,
                state: job.state(),
            });
        }

        for index in 0..clip_count {
            self.spawn_clip(&job, index);
        }

        Ok(JobAck {
            job_id,
            clip_count,
            state: job.state(),
        })
    }

    fn spawn_clip(&self, job: &Arc<Job>, index: usize) {
        let clip = &job.clips()[index];
        let request = EncodeRequest {
            source: job.source().to_path_buf(),
            output: self.config.clips_dir.join(clip.output_filename()),
            start_secs: clip.start_secs(),
            duration_secs: clip.duration_secs(),
            profile: self.config.profile.clone(),
        };
        let span = job.logger().clip_span(index, clip.name());
        let timeout = self.config.encode_timeout;
        let encoder = Arc::clone(&self.encoder);
        let job = Arc::clone(job);

        tokio::spawn(
            async move {
                let started = Instant::now();
                let profile = request.profile.as_str();
                let outcome = run_encode(encoder, request, timeout).await;
                metrics::record_clip_processed(
                    profile,
                    outcome.is_success(),
                    started.elapsed().as_secs_f64(),
                );

                if job.record_outcome(index, outcome).await {
                    job.cleanup().await;
                }
            }
            .instrument(span),
        );
    }

    /// Status of a known job.
    pub async fn status(&self, job_id: &JobId) -> Option<JobStatus> {
        let job = self.jobs.read().await.get(job_id).cloned()?;
        Some(job.status().await)
    }

    pub async fn handle(&self, job_id: &JobId) -> Option<JobHandle> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .map(|job| JobHandle::new(Arc::clone(job)))
    }

    /// Number of jobs that have not reached `Complete`.
    pub async fn active_jobs(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|job| !job.state().is_terminal())
            .count()
    }

    /// Wait for every job still in flight.
    pub async fn wait_idle(&self) {
        let handles: Vec<JobHandle> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| !job.state().is_terminal())
            .map(|job| JobHandle::new(Arc::clone(job)))
            .collect();

        for handle in handles {
            handle.wait_complete().await;
        }
    }

    /// Forget completed jobs older than the retention window.
    ///
    /// Returns how many were removed.
    pub async fn prune_finished(&self) -> usize {
        let retention = chrono::Duration::from_std(self.config.job_retention)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let cutoff = Utc::now() - retention;

        // Job locks are only awaited outside the registry lock.
        let finished: Vec<(JobId, Arc<Job>)> = self
            .jobs
            .read()
            .await
            .iter()
            .filter(|(_, job)| job.state().is_terminal())
            .map(|(id, job)| (id.clone(), Arc::clone(job)))
            .collect();

        let mut expired = Vec::new();
        for (id, job) in finished {
            if matches!(job.completed_at().await, Some(at) if at <= cutoff) {
                expired.push(id);
            }
        }
        if expired.is_empty() {
            return 0;
        }

        let mut jobs = self.jobs.write().await;
        for id in &expired {
            jobs.remove(id);
        }
        drop(jobs);

        debug!(count = expired.len(), "Pruned finished jobs");
        expired.len()
    }
}

/// Run one encode in its own task so a panicking or hung encoder still
/// yields an outcome for the job.
async fn run_encode(
    encoder: Arc<dyn ClipEncoder>,
    request: EncodeRequest,
    timeout: Option<Duration>,
) -> EncodeOutcome {
    let mut task = tokio::spawn(
        async move { EncodeTask::run(encoder.as_ref(), &request).await }.in_current_span(),
    );

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                // Dropping the encode future kills the engine process.
                task.abort();
                return EncodeOutcome::Failure {
                    reason: format!("encode timed out after {}s", limit.as_secs_f64()),
                };
            }
        },
        None => task.await,
    };

    joined.unwrap_or_else(|e| EncodeOutcome::Failure {
        reason: format!("encode task failed: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::oneshot;
    use vtrim_media::{MediaError, MediaResult};
    use vtrim_models::EncodeProfile;

    type Gate = oneshot::Receiver<Result<(), String>>;

    /// Encoder whose calls block until the test releases them, keyed by
    /// output file name. Ungated calls succeed immediately.
    #[derive(Default)]
    struct GatedEncoder {
        gates: StdMutex<HashMap<String, Gate>>,
        calls: AtomicUsize,
    }

    impl GatedEncoder {
        fn gate(&self, clip: &ClipSpec) -> oneshot::Sender<Result<(), String>> {
            let (tx, rx) = oneshot::channel();
            self.gates
                .lock()
                .unwrap()
                .insert(clip.output_filename().to_string(), rx);
            tx
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ClipEncoder for GatedEncoder {
        async fn encode(&self, request: &EncodeRequest) -> MediaResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let key = request
                .output
                .file_name()
                .unwrap()
                .to_string_lossy()
                .into_owned();
            let gate = self.gates.lock().unwrap().remove(&key);

            let verdict = match gate {
                Some(rx) => rx.await.unwrap_or_else(|_| Err("gate dropped".to_string())),
                None => Ok(()),
            };
            match verdict {
                Ok(()) => {
                    tokio::fs::write(&request.output, b"clip").await?;
                    Ok(())
                }
                Err(message) => Err(MediaError::ffmpeg_failed(message, None, Some(1))),
            }
        }
    }

    struct Fixture {
        _root: tempfile::TempDir,
        config: WorkerConfig,
        source: PathBuf,
    }

    async fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let config = WorkerConfig {
            upload_dir: root.path().join("uploads"),
            clips_dir: root.path().join("clips"),
            profile: EncodeProfile::StreamCopy,
            ..Default::default()
        };
        config.ensure_directories().await.unwrap();
        let source = config.upload_dir.join("original-1.mp4");
        tokio::fs::write(&source, b"video").await.unwrap();
        Fixture {
            _root: root,
            config,
            source,
        }
    }

    fn clips(n: usize) -> Vec<ClipSpec> {
        (0..n)
            .map(|i| {
                let start = (i * 10) as f64;
                ClipSpec::new(i, &format!("part {}", i + 1), start, start + 5.0).unwrap()
            })
            .collect()
    }

    async fn wait_for_outstanding(coordinator: &JobCoordinator, job_id: &JobId, expected: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let status = coordinator.status(job_id).await.unwrap();
                if status.outstanding == expected {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("outstanding count never reached expected value");
    }

    async fn wait_complete(coordinator: &JobCoordinator, job_id: &JobId) {
        let handle = coordinator.handle(job_id).await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle.wait_complete())
            .await
            .expect("job never completed");
    }

    #[tokio::test]
    async fn test_source_kept_until_last_clip_in_reverse_order() {
        let fx = fixture().await;
        let encoder = Arc::new(GatedEncoder::default());
        let specs = clips(3);
        let gates: Vec<_> = specs.iter().map(|c| encoder.gate(c)).collect();
        let coordinator = JobCoordinator::new(fx.config.clone(), encoder.clone());

        let ack = coordinator.submit(fx.source.clone(), specs).await.unwrap();
        assert_eq!(ack.clip_count, 3);
        assert_eq!(ack.state, JobState::Running);

        let mut gates = gates.into_iter().rev();
        for remaining in [2, 1] {
            gates.next().unwrap().send(Ok(())).unwrap();
            wait_for_outstanding(&coordinator, &ack.job_id, remaining).await;
            assert!(fx.source.exists(), "source removed with clips outstanding");
        }

        gates.next().unwrap().send(Ok(())).unwrap();
        wait_complete(&coordinator, &ack.job_id).await;

        assert!(!fx.source.exists());
        let status = coordinator.status(&ack.job_id).await.unwrap();
        assert_eq!(status.state, JobState::Complete);
        assert_eq!(status.succeeded.len(), 3);
        assert_eq!(encoder.calls(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_last_two_clips_finishing_together_delete_once() {
        let fx = fixture().await;
        let encoder = Arc::new(GatedEncoder::default());
        let specs = clips(3);
        let mut gates: Vec<_> = specs.iter().map(|c| encoder.gate(c)).collect();
        let coordinator = JobCoordinator::new(fx.config.clone(), encoder.clone());

        let ack = coordinator.submit(fx.source.clone(), specs).await.unwrap();

        gates.remove(0).send(Ok(())).unwrap();
        wait_for_outstanding(&coordinator, &ack.job_id, 2).await;

        let last = gates.pop().unwrap();
        let second = gates.pop().unwrap();
        second.send(Ok(())).unwrap();
        last.send(Ok(())).unwrap();

        wait_complete(&coordinator, &ack.job_id).await;
        assert!(!fx.source.exists());
        let status = coordinator.status(&ack.job_id).await.unwrap();
        assert_eq!(status.outstanding, 0);
        assert_eq!(status.succeeded.len(), 3);
    }

    #[tokio::test]
    async fn test_zero_clips_deletes_source_before_returning() {
        let fx = fixture().await;
        let encoder = Arc::new(GatedEncoder::default());
        let coordinator = JobCoordinator::new(fx.config.clone(), encoder.clone());

        let ack = coordinator
            .submit(fx.source.clone(), Vec::new())
            .await
            .unwrap();

        assert_eq!(ack.state, JobState::Complete);
        assert!(!fx.source.exists());
        assert_eq!(encoder.calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_clip_still_counts_towards_cleanup() {
        let fx = fixture().await;
        let encoder = Arc::new(GatedEncoder::default());
        let specs = clips(3);
        let failing = encoder.gate(&specs[1]);
        let coordinator = JobCoordinator::new(fx.config.clone(), encoder.clone());

        let ack = coordinator.submit(fx.source.clone(), specs).await.unwrap();
        failing.send(Err("Invalid data found".to_string())).unwrap();
        wait_complete(&coordinator, &ack.job_id).await;

        assert!(!fx.source.exists());
        let status = coordinator.status(&ack.job_id).await.unwrap();
        assert_eq!(status.succeeded.len(), 2);
        assert_eq!(status.failed.len(), 1);
        assert_eq!(status.failed[0].name, "part 2");
        assert!(status.failed[0].reason.contains("Invalid data found"));

        let produced = std::fs::read_dir(&fx.config.clips_dir).unwrap().count();
        assert_eq!(produced, 2);
    }

    #[tokio::test]
    async fn test_missing_source_rejected() {
        let fx = fixture().await;
        let coordinator =
            JobCoordinator::new(fx.config.clone(), Arc::new(GatedEncoder::default()));

        let missing = fx.config.upload_dir.join("nope.mp4");
        let err = coordinator.submit(missing, clips(1)).await.unwrap_err();
        assert!(matches!(err, WorkerError::SourceMissing(_)));
        assert_eq!(coordinator.active_jobs().await, 0);
    }

    #[tokio::test]
    async fn test_encode_timeout_becomes_failure() {
        let fx = fixture().await;
        let encoder = Arc::new(GatedEncoder::default());
        let specs = clips(1);
        // Held but never released.
        let _stuck = encoder.gate(&specs[0]);
        let config = WorkerConfig {
            encode_timeout: Some(Duration::from_millis(50)),
            ..fx.config.clone()
        };
        let coordinator = JobCoordinator::new(config, encoder);

        let ack = coordinator.submit(fx.source.clone(), specs).await.unwrap();
        wait_complete(&coordinator, &ack.job_id).await;

        let status = coordinator.status(&ack.job_id).await.unwrap();
        assert_eq!(status.failed.len(), 1);
        assert!(status.failed[0].reason.contains("timed out"));
        assert!(!fx.source.exists());
    }

    struct PanickingEncoder;

    #[async_trait]
    impl ClipEncoder for PanickingEncoder {
        async fn encode(&self, _request: &EncodeRequest) -> MediaResult<()> {
            panic!("encoder bug");
        }
    }

    #[tokio::test]
    async fn test_panicking_encoder_still_drains_job() {
        let fx = fixture().await;
        let coordinator = JobCoordinator::new(fx.config.clone(), Arc::new(PanickingEncoder));

        let ack = coordinator.submit(fx.source.clone(), clips(2)).await.unwrap();
        wait_complete(&coordinator, &ack.job_id).await;

        let status = coordinator.status(&ack.job_id).await.unwrap();
        assert_eq!(status.failed.len(), 2);
        assert!(status.failed[0].reason.contains("encode task failed"));
        assert!(!fx.source.exists());
    }

    #[tokio::test]
    async fn test_prune_removes_only_finished_jobs() {
        let fx = fixture().await;
        let encoder = Arc::new(GatedEncoder::default());
        let specs = clips(1);
        let gate = encoder.gate(&specs[0]);
        let config = WorkerConfig {
            job_retention: Duration::ZERO,
            ..fx.config.clone()
        };
        let coordinator = JobCoordinator::new(config, encoder);

        let running = coordinator.submit(fx.source.clone(), specs).await.unwrap();

        let second_source = fx.config.upload_dir.join("original-2.mp4");
        tokio::fs::write(&second_source, b"video").await.unwrap();
        let finished = coordinator
            .submit(second_source, Vec::new())
            .await
            .unwrap();

        assert_eq!(coordinator.prune_finished().await, 1);
        assert!(coordinator.status(&finished.job_id).await.is_none());
        assert!(coordinator.status(&running.job_id).await.is_some());
        assert_eq!(coordinator.active_jobs().await, 1);

        gate.send(Ok(())).unwrap();
        coordinator.wait_idle().await;
        assert_eq!(coordinator.active_jobs().await, 0);
    }
    #[tokio::test]
    async fn test_prune_does_not_block_registry_on_busy_job() {
        let fx = fixture().await;
        let config = WorkerConfig {
            job_retention: Duration::ZERO,
            ..fx.config.clone()
        };
        let encoder = Arc::new(GatedEncoder::default());
        let coordinator = Arc::new(JobCoordinator::new(config, encoder));

        let finished = coordinator
            .submit(fx.source.clone(), Vec::new())
            .await
            .unwrap();
        let job = coordinator
            .jobs
            .read()
            .await
            .get(&finished.job_id)
            .cloned()
            .unwrap();

        // A slow reader holds the job's progress lock while pruning starts.
        let guard = job.lock_progress().await;
        let pruning = tokio::spawn({
            let coordinator = Arc::clone(&coordinator);
            async move { coordinator.prune_finished().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let lookup =
            tokio::time::timeout(Duration::from_secs(1), coordinator.handle(&finished.job_id))
                .await;
        assert!(lookup.is_ok(), "registry blocked while pruning");

        drop(guard);
        assert_eq!(pruning.await.unwrap(), 1);
        assert!(coordinator.status(&finished.job_id).await.is_none());
    }
}
