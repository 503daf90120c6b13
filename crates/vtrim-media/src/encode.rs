//! Clip encode tasks.
//!
//! # Architecture
//!
//! The encoder is an injectable capability: anything implementing
//! [`ClipEncoder`] can cut a clip. [`FfmpegEncoder`] is the production
//! implementation; tests substitute in-process fakes.
//!
//! [`EncodeTask`] wraps exactly one encoder invocation and folds its result
//! into an [`EncodeOutcome`]. A task never returns an error to its caller:
//! engine failures become `EncodeOutcome::Failure` and stay local to that
//! clip.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use vtrim_models::{format_seconds, EncodeProfile};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Everything the engine needs to produce one clip.
///
/// The range is expressed as offset plus duration, which is what the
/// engine's trim options take.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub source: PathBuf,
    pub output: PathBuf,
    pub start_secs: f64,
    pub duration_secs: f64,
    pub profile: EncodeProfile,
}

impl EncodeRequest {
    /// Build the FFmpeg invocation for this request.
    pub fn to_command(&self) -> FfmpegCommand {
        FfmpegCommand::new(&self.source, &self.output)
            .seek(self.start_secs)
            .duration(self.duration_secs)
            .output_args(self.profile.to_ffmpeg_args())
    }
}

/// Result of one encode task.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeOutcome {
    Success { output_path: PathBuf },
    Failure { reason: String },
}

impl EncodeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, EncodeOutcome::Success { .. })
    }
}

/// The external encode engine.
#[async_trait]
pub trait ClipEncoder: Send + Sync {
    /// Produce `request.output` from `request.source`.
    ///
    /// Returns once the engine reports completion. A partial output file
    /// may be left behind on error.
    async fn encode(&self, request: &EncodeRequest) -> MediaResult<()>;
}

/// [`ClipEncoder`] backed by the `ffmpeg` binary.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder {
    runner: FfmpegRunner,
}

impl FfmpegEncoder {
    pub fn new(runner: FfmpegRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl ClipEncoder for FfmpegEncoder {
    async fn encode(&self, request: &EncodeRequest) -> MediaResult<()> {
        if !tokio::fs::try_exists(&request.source).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(request.source.clone()));
        }

        self.runner.run(&request.to_command()).await
    }
}

/// One clip's worth of work against a shared source file.
pub struct EncodeTask;

impl EncodeTask {
    /// Invoke the encoder exactly once and report the outcome.
    pub async fn run(encoder: &dyn ClipEncoder, request: &EncodeRequest) -> EncodeOutcome {
        let started = Instant::now();
        info!(
            source = %request.source.display(),
            output = %request.output.display(),
            profile = request.profile.as_str(),
            "Encoding clip: start {} duration {:.3}s",
            format_seconds(request.start_secs),
            request.duration_secs
        );

        match encoder.encode(request).await {
            Ok(()) => {
                info!(
                    output = %request.output.display(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Clip encoded"
                );
                EncodeOutcome::Success {
                    output_path: request.output.clone(),
                }
            }
            Err(e) => {
                let reason = e.reason();
                warn!(
                    output = %request.output.display(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Clip encode failed: {}",
                    reason
                );
                EncodeOutcome::Failure { reason }
            }
        }
    }
}

/// File name component of an output path, for status reporting.
pub fn output_filename(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
