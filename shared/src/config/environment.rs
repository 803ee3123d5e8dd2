//! Runtime environment and logging configuration

use serde::{Deserialize, Serialize};
use std::env;

/// Deployment environment the token store runs in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Read the environment from `TOKENS_ENV`, falling back to `ENVIRONMENT`
    /// and `RUST_ENV`. Unknown values resolve to development.
    pub fn from_env() -> Self {
        env::var("TOKENS_ENV")
            .or_else(|_| env::var("ENVIRONMENT"))
            .or_else(|_| env::var("RUST_ENV"))
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    /// Base name of the optional configuration file for this environment
    pub fn config_file(&self) -> &'static str {
        match self {
            Environment::Development => "config.development",
            Environment::Staging => "config.staging",
            Environment::Production => "config.production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" | "test" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

/// Logging configuration consumed by the tracing subscriber
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error or a full
    /// `EnvFilter` expression); `RUST_LOG` takes precedence when set
    pub level: String,

    /// Output format
    pub format: LogFormat,

    /// Emit ANSI colors (pretty/compact only)
    pub colored: bool,

    /// Include file and line of the callsite
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: LogFormat::Pretty,
            colored: true,
            source_location: false,
        }
    }
}

impl LoggingConfig {
    /// Logging preset for an environment
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Development => Self {
                level: String::from("debug"),
                format: LogFormat::Pretty,
                colored: true,
                source_location: true,
            },
            Environment::Staging => Self {
                level: String::from("info"),
                format: LogFormat::Json,
                colored: false,
                source_location: false,
            },
            Environment::Production => Self {
                level: String::from("warn"),
                format: LogFormat::Json,
                colored: false,
                source_location: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Stage".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_environment_display_round_trips() {
        for env in [Environment::Development, Environment::Staging, Environment::Production] {
            assert_eq!(env.to_string().parse::<Environment>().unwrap(), env);
        }
    }

    #[test]
    fn test_logging_presets() {
        let prod = LoggingConfig::for_environment(Environment::Production);
        assert_eq!(prod.format, LogFormat::Json);
        assert_eq!(prod.level, "warn");
        assert!(!prod.colored);

        let dev = LoggingConfig::for_environment(Environment::Development);
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(dev.source_location);
    }

    #[test]
    fn test_logging_config_partial_deserialize() {
        let config: LoggingConfig = serde_json::from_str(r#"{"format":"compact"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.level, "info");
    }
}
