//! Tracing subscriber installation

use tb_shared::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

use crate::InfrastructureError;

/// Install the global `tracing` subscriber described by `config`
///
/// `RUST_LOG` takes precedence over `config.level` when set. Fails if the
/// filter does not parse or a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let filter = build_filter(config, std::env::var("RUST_LOG").ok().as_deref())?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.colored && config.format != LogFormat::Json)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    installed.map_err(|e| InfrastructureError::Configuration(format!("Failed to install tracing subscriber: {}", e)))
}

/// Filter from `rust_log` if given, otherwise from `config.level`
pub fn build_filter(config: &LoggingConfig, rust_log: Option<&str>) -> Result<EnvFilter, InfrastructureError> {
    let directives = rust_log.filter(|value| !value.trim().is_empty()).unwrap_or(config.level.as_str());
    EnvFilter::try_new(directives)
        .map_err(|e| InfrastructureError::Configuration(format!("Invalid log filter '{}': {}", directives, e)))
}
