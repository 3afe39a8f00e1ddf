use crate::config::Config;
use common::TelemetryGuard;

/// Installs the global subscriber. With an OTLP endpoint configured the
/// returned guard must live until shutdown so pending spans get flushed.
pub fn setup_logging(config: &Config) -> anyhow::Result<Option<TelemetryGuard>> {
    match config.otel_endpoint() {
        Some(endpoint) => Ok(Some(TelemetryGuard::init(
            "gateway",
            endpoint,
            config.environment,
            config.log_level.as_str(),
        )?)),
        None => {
            common::setup_logging(config.environment, config.log_level.as_str())?;
            Ok(None)
        }
    }
}
