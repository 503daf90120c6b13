//! Background job coordination for multi-clip extraction.
//!
//! This crate provides:
//! - The [`Job`] aggregate: outstanding count, per-clip outcomes and the
//!   exactly-once source cleanup
//! - [`JobCoordinator`], which fans a job out into encode tasks and keeps
//!   an in-memory registry for status queries
//! - Worker configuration, structured job logging and metrics

pub mod config;
pub mod coordinator;
pub mod error;
pub mod job;
pub mod logging;
pub mod metrics;

pub use config::WorkerConfig;
pub use coordinator::{JobAck, JobCoordinator};
pub use error::{WorkerError, WorkerResult};
pub use job::{Job, JobHandle};
pub use logging::JobLogger;
