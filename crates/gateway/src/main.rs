use anyhow::Context;
use gateway::{build_dispatcher, config::get_configuration, logging::setup_logging, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration().context("failed to load configuration")?;
    let _telemetry = setup_logging(&config)?;

    tracing::info!(
        environment = config.environment.as_str(),
        model_dir = %config.model_dir.display(),
        "Starting detection gateway"
    );

    let load_config = config.clone();
    let dispatcher = tokio::task::spawn_blocking(move || build_dispatcher(&load_config))
        .await
        .context("model loading task panicked")?
        .inspect_err(|e| tracing::error!("Startup failed: {:#}", e))?;
    tracing::info!(models = dispatcher.registry().len(), "All models loaded");

    run_server(&config, dispatcher).await
}
