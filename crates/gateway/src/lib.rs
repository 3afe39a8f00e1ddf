pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod state;

use crate::config::Config;
use crate::fetch::ImageFetcher;
use crate::state::AppState;
use anyhow::{Context, anyhow};
use inference::backend::ort::SessionOptions;
use inference::{Dispatcher, LoadOptions, Registry, catalog};
use std::sync::Arc;

/// Loads every configured model. Runs before the listener is bound so a bad
/// model directory never produces a half-working server.
pub fn build_dispatcher(config: &Config) -> anyhow::Result<Dispatcher> {
    let specs = catalog::select(inference::default_catalog(), &config.models).map_err(|unknown| {
        anyhow!("unknown models in configuration: {}", unknown.join(", "))
    })?;

    let options = LoadOptions {
        session: SessionOptions {
            provider: config.execution_provider,
            intra_threads: config.intra_threads,
        },
        score_threshold: config.score_threshold,
    };

    let registry = Registry::load(&specs, &config.model_dir, &options)
        .with_context(|| format!("failed to load models from {}", config.model_dir.display()))?;

    Ok(Dispatcher::new(Arc::new(registry)))
}

pub async fn run_server(config: &Config, dispatcher: Dispatcher) -> anyhow::Result<()> {
    let fetcher = ImageFetcher::new(config.fetch_timeout(), config.max_image_bytes)
        .context("failed to build HTTP client")?;
    let app = routes::create_app(AppState::new(dispatcher, fetcher));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Detection gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Detection gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
