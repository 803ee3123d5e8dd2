//! Configuration loading for the token store
//!
//! Sources, lowest precedence first:
//! 1. The preset for the detected [`Environment`], with the plain
//!    `DATABASE_*` / `TOKENS_*` variables applied (see [`AppConfig::from_env`])
//! 2. An optional `config.<environment>.{toml,yaml,json}` file
//! 3. `TOKENS__SECTION__FIELD` variables, e.g. `TOKENS__DATABASE__MAX_CONNECTIONS=20`

use ::config::{Config, Environment as EnvironmentSource, File};
use tb_shared::validation::Validate;
use tb_shared::{AppConfig, Environment};

use crate::InfrastructureError;

/// Prefix of the nested environment overrides
pub const ENV_PREFIX: &str = "TOKENS";

/// Load and validate the application configuration
///
/// A `.env` file in the working directory is read first if present.
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env();
    let config = build_config(AppConfig::from_env(), environment.config_file(), env_overrides())?;

    tracing::debug!(
        environment = %config.environment,
        tokens_table = %config.database.tokens_table,
        "Configuration loaded"
    );
    Ok(config)
}

/// The `TOKENS__*` environment source
pub fn env_overrides() -> EnvironmentSource {
    EnvironmentSource::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Layer `file` (optional, extension detected) and `env` over `base`
pub fn build_config(
    base: AppConfig,
    file: &str,
    env: EnvironmentSource,
) -> Result<AppConfig, InfrastructureError> {
    let config: AppConfig = Config::builder()
        .add_source(Config::try_from(&base)?)
        .add_source(File::with_name(file).required(false))
        .add_source(env)
        .build()?
        .try_deserialize()?;

    config
        .validate()
        .map_err(|e| InfrastructureError::Configuration(e.to_string()))?;
    Ok(config)
}
