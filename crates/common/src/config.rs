use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Parses a user supplied environment name. Unknown names are rejected.
    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `development` or `production`.",
                other
            )),
        }
    }

    pub fn from_env() -> Self {
        env::var("ENVIRONMENT")
            .ok()
            .and_then(|value| Self::parse(&value).ok())
            .unwrap_or(Environment::Development)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_accepts_short_and_long_names() {
        assert_eq!(Environment::parse("prod"), Ok(Environment::Production));
        assert_eq!(Environment::parse("Production"), Ok(Environment::Production));
        assert_eq!(Environment::parse(" dev "), Ok(Environment::Development));
        assert!(Environment::parse("staging").is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults_to_development() {
        // SAFETY: serialized with the other env-mutating tests
        unsafe { env::remove_var("ENVIRONMENT") };
        assert_eq!(Environment::from_env(), Environment::Development);

        unsafe { env::set_var("ENVIRONMENT", "production") };
        assert_eq!(Environment::from_env(), Environment::Production);

        unsafe { env::set_var("ENVIRONMENT", "nonsense") };
        assert_eq!(Environment::from_env(), Environment::Development);

        unsafe { env::remove_var("ENVIRONMENT") };
    }
}
