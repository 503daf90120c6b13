//! Shared data models for the vtrim clip service.
//!
//! This crate provides Serde-serializable types for:
//! - Timestamp parsing
//! - Clip requests and their validated form
//! - Encoding profiles
//! - Job identifiers and status snapshots

pub mod clip;
pub mod encoding;
pub mod job;
pub mod timestamp;

// Re-export common types
pub use clip::{validate_clips, ClipError, ClipSpec, RawClip, CLIP_EXTENSION, MIN_CLIP_DURATION_SECS};
pub use encoding::{EncodeProfile, EncodingConfig};
pub use job::{FailedClip, JobId, JobState, JobStatus, SucceededClip};
pub use timestamp::{format_seconds, parse_timestamp, TimestampError};
