//! Clip requests and their validated form.
//!
//! A [`RawClip`] is what the client sends: a free-form name plus start and
//! end timestamps. [`validate_clips`] turns a list of them into
//! [`ClipSpec`]s, which carry numeric offsets, a filesystem-safe name and a
//! collision-free output filename.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::timestamp::{parse_timestamp, TimestampError};

/// Extension of every produced clip file.
pub const CLIP_EXTENSION: &str = "mp4";

/// Shortest accepted clip. The engine receives offsets with millisecond
/// precision, so anything shorter would be cut as zero-length.
pub const MIN_CLIP_DURATION_SECS: f64 = 0.001;

/// Process-wide sequence mixed into output filenames.
static OUTPUT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Clip validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClipError {
    #[error("No timestamps provided")]
    EmptyClipList,

    #[error("Clip {}: invalid {field} timestamp: {source}", .index + 1)]
    InvalidTimestamp {
        /// Zero-based position of the clip in the request
        index: usize,
        /// Which boundary failed ("start" or "end")
        field: &'static str,
        #[source]
        source: TimestampError,
    },

    #[error("Clip {}: end must be after start (duration {duration:.3}s)", .index + 1)]
    NonPositiveDuration { index: usize, duration: f64 },
}

impl ClipError {
    /// Position of the offending clip, if the error concerns a single clip.
    pub fn clip_index(&self) -> Option<usize> {
        match self {
            ClipError::EmptyClipList => None,
            ClipError::InvalidTimestamp { index, .. } | ClipError::NonPositiveDuration { index, .. } => {
                Some(*index)
            }
        }
    }
}

/// A clip as requested by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawClip {
    /// Display name, used as the output filename stem
    #[serde(default)]
    pub name: String,

    /// Start timestamp (`H:MM:SS`, `MM:SS` or seconds)
    #[serde(deserialize_with = "string_or_number")]
    pub start: String,

    /// End timestamp (`H:MM:SS`, `MM:SS` or seconds)
    #[serde(deserialize_with = "string_or_number")]
    pub end: String,
}

impl RawClip {
    pub fn new(name: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: start.into(),
            end: end.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(f64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

/// A validated clip, ready to be handed to an encoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipSpec {
    index: usize,
    name: String,
    output_name: String,
    start_secs: f64,
    duration_secs: f64,
    output_filename: String,
}

impl ClipSpec {
    /// Build a clip from numeric boundaries.
    ///
    /// `index` is the zero-based position within the job and only matters
    /// for the fallback name and error reporting.
    pub fn new(
        index: usize,
        name: &str,
        start_secs: f64,
        end_secs: f64,
    ) -> Result<Self, ClipError> {
        let duration = end_secs - start_secs;
        if !duration.is_finite() || duration < MIN_CLIP_DURATION_SECS {
            return Err(ClipError::NonPositiveDuration { index, duration });
        }

        let output_name = normalize_name(name, index);
        let output_filename = format!("{}-{}.{}", output_name, unique_suffix(), CLIP_EXTENSION);

        Ok(Self {
            index,
            name: name.trim().to_string(),
            output_name,
            start_secs,
            duration_secs: duration,
            output_filename,
        })
    }

    /// Parse and validate a single raw clip.
    pub fn from_raw(index: usize, raw: &RawClip) -> Result<Self, ClipError> {
        let start_secs = parse_timestamp(&raw.start).map_err(|source| ClipError::InvalidTimestamp {
            index,
            field: "start",
            source,
        })?;
        let end_secs = parse_timestamp(&raw.end).map_err(|source| ClipError::InvalidTimestamp {
            index,
            field: "end",
            source,
        })?;
        Self::new(index, &raw.name, start_secs, end_secs)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Name as sent by the client (trimmed).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filesystem-safe name used as the filename stem.
    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn start_secs(&self) -> f64 {
        self.start_secs
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }

    /// `{output_name}-{suffix}.mp4`, unique across jobs in this process.
    pub fn output_filename(&self) -> &str {
        &self.output_filename
    }
}

/// Validate a full clip list.
///
/// Fails on the first invalid clip; an empty list is rejected outright.
pub fn validate_clips(raw: &[RawClip]) -> Result<Vec<ClipSpec>, ClipError> {
    if raw.is_empty() {
        return Err(ClipError::EmptyClipList);
    }

    raw.iter()
        .enumerate()
        .map(|(index, clip)| ClipSpec::from_raw(index, clip))
        .collect()
}

/// Collapse whitespace runs into `-` and strip characters that would let the
/// name act as a path. Falls back to `clip-{n}` (1-based) when nothing is left.
fn normalize_name(raw: &str, index: usize) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_whitespace = false;

    for ch in raw.trim().chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                out.push('-');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;

        if ch == '/' || ch == '\\' || ch.is_control() {
            out.push('-');
        } else {
            out.push(ch);
        }
    }

    if out.is_empty() {
        format!("clip-{}", index + 1)
    } else {
        out
    }
}

fn unique_suffix() -> String {
    let seq = OUTPUT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", Utc::now().timestamp_millis(), seq)
}
