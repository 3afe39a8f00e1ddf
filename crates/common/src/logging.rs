use crate::config::Environment;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::Layered, layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Installs the global `tracing` subscriber without span export.
///
/// `RUST_LOG` wins over `default_level`. Production writes one JSON object per
/// event, development writes pretty multi-line output.
pub fn setup_logging(environment: Environment, default_level: &str) -> anyhow::Result<()> {
    init_subscriber(environment, default_level, tracing_opentelemetry::layer())
}

pub(crate) fn init_subscriber<L>(
    environment: Environment,
    default_level: &str,
    otel_layer: L,
) -> anyhow::Result<()>
where
    L: Layer<Layered<EnvFilter, Registry>> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))?;

    let (json, pretty) = match environment {
        Environment::Production => (
            Some(fmt::layer().json().with_current_span(true).with_span_list(false)),
            None,
        ),
        Environment::Development => (None, Some(fmt::layer().pretty().with_ansi(true))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(json)
        .with(pretty)
        .try_init()?;

    Ok(())
}
