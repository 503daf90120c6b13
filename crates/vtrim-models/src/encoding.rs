//! Video encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 23;

/// Re-encode settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate; the encoder default is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bitrate: Option<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: None,
        }
    }
}

impl EncodingConfig {
    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Returns a new config with updated preset.
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// Returns a new config with an explicit audio bitrate (e.g. "128k").
    pub fn with_audio_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.audio_bitrate = Some(bitrate.into());
        self
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
        ];

        if let Some(bitrate) = &self.audio_bitrate {
            args.extend_from_slice(&["-b:a".to_string(), bitrate.clone()]);
        }

        args
    }
}

/// How a clip is cut out of its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EncodeProfile {
    /// Decode and re-encode; frame-accurate cut points.
    Reencode(EncodingConfig),
    /// Re-package the existing streams. Fast, but cuts snap to keyframes.
    StreamCopy,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        EncodeProfile::Reencode(EncodingConfig::default())
    }
}

impl EncodeProfile {
    /// Parse the `ENCODE_PROFILE` setting (`reencode` or `copy`).
    pub fn from_name(name: &str, encoding: EncodingConfig) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "reencode" | "re-encode" | "encode" => Some(EncodeProfile::Reencode(encoding)),
            "copy" | "stream_copy" | "stream-copy" => Some(EncodeProfile::StreamCopy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EncodeProfile::Reencode(_) => "reencode",
            EncodeProfile::StreamCopy => "copy",
        }
    }

    /// FFmpeg output arguments for this profile.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        match self {
            EncodeProfile::Reencode(config) => config.to_ffmpeg_args(),
            EncodeProfile::StreamCopy => vec!["-c".to_string(), "copy".to_string()],
        }
    }
}
