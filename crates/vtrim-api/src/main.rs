//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vtrim_api::{create_router, metrics, ApiConfig, AppState};
use vtrim_media::{check_ffmpeg, FfmpegEncoder};
use vtrim_worker::{JobCoordinator, WorkerConfig};

/// How long shutdown waits for in-flight jobs before exiting.
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON when LOG_FORMAT=json
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("vtrim=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vtrim-api");

    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env().context("invalid worker configuration")?;
    info!(
        "API config: host={}, port={}, production={}",
        config.host,
        config.port,
        config.is_production()
    );
    info!(
        "Worker config: uploads={}, clips={}, profile={}",
        worker_config.upload_dir.display(),
        worker_config.clips_dir.display(),
        worker_config.profile.as_str()
    );

    worker_config
        .ensure_directories()
        .await
        .context("failed to create upload/clips directories")?;

    let ffmpeg_available = match check_ffmpeg() {
        Ok(path) => {
            info!("Using ffmpeg at {}", path.display());
            true
        }
        Err(e) => {
            warn!("{}; every clip will fail until it is installed", e);
            false
        }
    };

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install metrics recorder")?)
    } else {
        None
    };

    let coordinator = Arc::new(JobCoordinator::new(
        worker_config,
        Arc::new(FfmpegEncoder::default()),
    ));
    let state = AppState::new(config.clone(), Arc::clone(&coordinator), ffmpeg_available);
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let active = coordinator.active_jobs().await;
    if active > 0 {
        info!("Waiting for {} in-flight jobs", active);
        if tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, coordinator.wait_idle())
            .await
            .is_err()
        {
            warn!("Shutdown timed out with jobs still running; their sources stay on disk");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
