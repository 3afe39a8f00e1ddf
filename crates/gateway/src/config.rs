use common::Environment;
use inference::backend::ort::ExecutionProvider;
use serde::{Deserialize, Deserializer, de};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    #[serde(deserialize_with = "deserialize_environment")]
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub model_dir: PathBuf,
    /// Subset of the catalog to load; empty loads every model.
    pub models: Vec<String>,
    #[serde(deserialize_with = "deserialize_provider")]
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
    pub score_threshold: f32,
    pub fetch_timeout_secs: u64,
    pub max_image_bytes: usize,
    pub otel_endpoint: Option<String>,
}

impl Config {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn otel_endpoint(&self) -> Option<&str> {
        self.otel_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
    }

    fn validate(self) -> Result<Self, config::ConfigError> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(config::ConfigError::Message(format!(
                "score_threshold must be within [0, 1], got {}",
                self.score_threshold
            )));
        }
        if self.intra_threads == 0 {
            return Err(config::ConfigError::Message(
                "intra_threads must be at least 1".to_string(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(config::ConfigError::Message(
                "fetch_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.max_image_bytes == 0 {
            return Err(config::ConfigError::Message(
                "max_image_bytes must be positive".to_string(),
            ));
        }
        Ok(self)
    }
}

fn deserialize_environment<'de, D>(deserializer: D) -> Result<Environment, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Environment::parse(&value).map_err(de::Error::custom)
}

fn deserialize_provider<'de, D>(deserializer: D) -> Result<ExecutionProvider, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    ExecutionProvider::parse(&value).map_err(de::Error::custom)
}

/// Reads `GATEWAY_*` environment variables on top of the defaults.
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    build_configuration(env_source())
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix("GATEWAY")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("models")
}

pub fn build_configuration(source: config::Environment) -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("environment", Environment::from_env().as_str())?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 5000)?
        .set_default("model_dir", "models")?
        .set_default("models", Vec::<String>::new())?
        .set_default("execution_provider", "cpu")?
        .set_default("intra_threads", 4)?
        .set_default("score_threshold", 0.7)?
        .set_default("fetch_timeout_secs", 30)?
        .set_default("max_image_bytes", 20 * 1024 * 1024)?
        .add_source(source)
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;

    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Result<Config, config::ConfigError> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        build_configuration(env_source().source(Some(vars)))
    }

    #[test]
    fn test_defaults() {
        let config = from_vars(&[]).unwrap();

        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.model_dir, PathBuf::from("models"));
        assert!(config.models.is_empty());
        assert_eq!(config.execution_provider, ExecutionProvider::Cpu);
        assert!((config.score_threshold - 0.7).abs() < 1e-6);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_image_bytes, 20 * 1024 * 1024);
        assert_eq!(config.otel_endpoint(), None);
    }

    #[test]
    fn test_environment_overrides() {
        let config = from_vars(&[
            ("GATEWAY_PORT", "8080"),
            ("GATEWAY_LOG_LEVEL", "debug"),
            ("GATEWAY_ENVIRONMENT", "production"),
            ("GATEWAY_MODELS", "YOLOv5s,DETR"),
            ("GATEWAY_EXECUTION_PROVIDER", "cuda"),
            ("GATEWAY_OTEL_ENDPOINT", "http://localhost:4317"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.models, vec!["YOLOv5s", "DETR"]);
        assert_eq!(config.execution_provider, ExecutionProvider::Cuda);
        assert_eq!(config.otel_endpoint(), Some("http://localhost:4317"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(from_vars(&[("GATEWAY_ENVIRONMENT", "staging")]).is_err());
        assert!(from_vars(&[("GATEWAY_EXECUTION_PROVIDER", "tpu")]).is_err());
        assert!(from_vars(&[("GATEWAY_SCORE_THRESHOLD", "1.5")]).is_err());
        assert!(from_vars(&[("GATEWAY_PORT", "not-a-port")]).is_err());
        assert!(from_vars(&[("GATEWAY_FETCH_TIMEOUT_SECS", "0")]).is_err());
        assert!(from_vars(&[("GATEWAY_INTRA_THREADS", "0")]).is_err());
    }
}
