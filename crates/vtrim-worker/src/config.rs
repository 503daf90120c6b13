//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use vtrim_models::{EncodeProfile, EncodingConfig};

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory holding uploaded sources until their job completes
    pub upload_dir: PathBuf,
    /// Directory receiving finished clips
    pub clips_dir: PathBuf,
    /// Re-encode or stream-copy
    pub profile: EncodeProfile,
    /// Per-clip engine timeout; `None` waits indefinitely
    pub encode_timeout: Option<Duration>,
    /// How long finished jobs stay queryable
    pub job_retention: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            clips_dir: PathBuf::from("clips"),
            profile: EncodeProfile::default(),
            encode_timeout: None,
            job_retention: Duration::from_secs(3600), // 1 hour
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let mut encoding = EncodingConfig::default();
        if let Some(crf) = std::env::var("ENCODE_CRF").ok().and_then(|s| s.parse().ok()) {
            encoding = encoding.with_crf(crf);
        }
        if let Ok(preset) = std::env::var("ENCODE_PRESET") {
            encoding = encoding.with_preset(preset);
        }
        if let Ok(bitrate) = std::env::var("ENCODE_AUDIO_BITRATE") {
            encoding = encoding.with_audio_bitrate(bitrate);
        }

        let profile_name = std::env::var("ENCODE_PROFILE").unwrap_or_else(|_| "reencode".to_string());
        let profile = EncodeProfile::from_name(&profile_name, encoding).ok_or_else(|| {
            WorkerError::config_error(format!(
                "ENCODE_PROFILE must be 'reencode' or 'copy', got '{}'",
                profile_name
            ))
        })?;

        Ok(Self {
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            clips_dir: std::env::var("CLIPS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("clips")),
            profile,
            encode_timeout: std::env::var("ENCODE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs),
            job_retention: Duration::from_secs(
                std::env::var("JOB_RETENTION_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        })
    }

    /// Create the upload and clips directories if they are missing.
    pub async fn ensure_directories(&self) -> WorkerResult<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.clips_dir).await?;
        Ok(())
    }
}
