//! FFmpeg CLI wrapper and clip encode tasks.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A process runner that captures stderr on failure
//! - The [`ClipEncoder`] seam and its FFmpeg implementation
//! - [`EncodeTask`], which turns one encoder call into an [`EncodeOutcome`]

pub mod command;
pub mod encode;
pub mod error;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use encode::{
    output_filename, ClipEncoder, EncodeOutcome, EncodeRequest, EncodeTask, FfmpegEncoder,
};
pub use error::{MediaError, MediaResult};
