//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use grabq_api::{create_router, metrics, ApiConfig, AppState};
use grabq_media::{check_ffmpeg, check_ytdlp, YtDlpEngine};
use grabq_worker::WorkerConfig;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("grabq=info"));

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

    info!("Starting grabq-api");

    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    info!(
        "API config: host={}, port={}, download_dir={}",
        config.host,
        config.port,
        config.download_dir.display()
    );

    if let Err(e) = tokio::fs::create_dir_all(&config.download_dir).await {
        error!("Failed to create download directory {}: {}", config.download_dir.display(), e);
        std::process::exit(1);
    }

    // Missing tools fail jobs, not startup.
    match check_ytdlp(&worker_config.ytdlp_bin) {
        Ok(path) => info!("Using yt-dlp at {}", path.display()),
        Err(e) => warn!("{}; downloads will fail until it is installed", e),
    }
    if worker_config.ffmpeg_location.is_none() {
        if let Err(e) = check_ffmpeg() {
            warn!("{}; merging and audio extraction will fail", e);
        }
    }

    let metrics_handle = if config.metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install Prometheus recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    let engine = Arc::new(YtDlpEngine::new(&worker_config.ytdlp_bin));
    let (state, worker) = AppState::start(config.clone(), &worker_config, engine);
    let queue = state.queue.clone();

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address {}:{}: {}", config.host, config.port, e);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    info!("Listening on {}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    // Let the worker finish what is already queued, up to the timeout.
    queue.shutdown();
    match tokio::time::timeout(worker_config.shutdown_timeout, worker).await {
        Ok(Ok(())) => info!("Worker drained"),
        Ok(Err(e)) => error!("Worker task failed: {}", e),
        Err(_) => warn!(
            "Worker still busy after {:?}; abandoning queued tasks",
            worker_config.shutdown_timeout
        ),
    }

    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
