//! ShortClip API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sclip_api::{create_router, metrics, ApiConfig, AppState};
use sclip_media::{check_ffmpeg, check_ytdlp};
use sclip_publish::{CredentialAuthorizer, OAuthClient, OAuthConfig, YouTubeUploader};
use sclip_store::{ProgressChannel, RedisStore, StoreConfig};
use sclip_transcribe::TranscribeClient;
use sclip_worker::{Collaborators, JobExecutor, JobRunner, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Required by rustls 0.23+
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    init_tracing()?;

    info!("Starting sclip-api");

    let config = ApiConfig::from_env();
    let worker_config = WorkerConfig::from_env();
    let store_config = StoreConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        max_jobs = worker_config.max_concurrent_jobs,
        "Loaded configuration"
    );

    if let Err(e) = check_ffmpeg() {
        warn!("FFmpeg not available: {}", e);
    }
    if let Err(e) = check_ytdlp() {
        warn!("yt-dlp not available: {}", e);
    }

    let store = RedisStore::new(store_config.clone()).context("failed to create Redis store")?;
    let progress = ProgressChannel::from_client(store.client().clone(), store_config.key_prefix.clone());
    let shared = Arc::new(store.clone());

    let oauth = OAuthClient::new(OAuthConfig::from_env()?)?;
    let collaborators = Collaborators::production(
        &worker_config,
        TranscribeClient::from_env()?,
        CredentialAuthorizer::new(shared.clone(), oauth.clone()),
        YouTubeUploader::new()?,
    );

    let runner = JobRunner::new(shared.clone(), collaborators, worker_config);
    let executor = Arc::new(JobExecutor::new(runner));

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install Prometheus recorder")?)
    } else {
        None
    };

    let state = AppState::new(config.clone(), executor.clone(), shared.clone(), shared, oauth)
        .with_redis(store)
        .with_progress(progress);

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    executor.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// JSON output when `LOG_FORMAT=json`, human-readable otherwise.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("sclip=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
