//! Axum HTTP API for clip extraction.
//!
//! This crate provides:
//! - Upload intake: multipart video plus clip list, answered with 202
//! - Clip listing, job status and static clip retrieval
//! - Request id, request logging and Prometheus metrics middleware

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
