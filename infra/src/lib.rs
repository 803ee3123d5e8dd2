//! # Infrastructure Layer
//!
//! This crate implements the infrastructure layer for the token store,
//! following Clean Architecture principles. It provides the concrete pieces
//! the core crate only describes as traits.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Database**: MySQL token repository and connection pool using SQLx
//! - **Configuration**: layered loading of [`AppConfig`](tb_shared::AppConfig)
//! - **Telemetry**: `tracing-subscriber` installation
//!
//! ## Features
//!
//! - `mysql`: Enable MySQL database support (default)

// Re-export core types for convenience
pub use tb_core::errors::*;

/// Database module - MySQL implementations using SQLx
#[cfg(feature = "mysql")]
pub mod database;

/// Configuration loading from files and environment variables
pub mod config;

/// Tracing subscriber setup
pub mod telemetry;

pub use self::config::load_config;
pub use telemetry::init_tracing;

#[cfg(feature = "mysql")]
pub use services::{initialize, InfrastructureServices};

#[cfg(feature = "mysql")]
mod services {
    use tb_core::TokenService;
    use tb_shared::AppConfig;

    use crate::database::{DatabasePool, MySqlTokenRepository};
    use crate::InfrastructureError;

    /// Infrastructure service container
    #[derive(Clone)]
    pub struct InfrastructureServices {
        pub config: AppConfig,
        pub pool: DatabasePool,
        pub tokens: MySqlTokenRepository,
    }

    impl InfrastructureServices {
        /// Token service over the MySQL store using wall-clock time
        pub fn token_service(&self) -> TokenService<MySqlTokenRepository> {
            TokenService::new(self.tokens.clone(), self.config.tokens.clone())
        }
    }

    /// Initialize infrastructure services
    ///
    /// This function sets up:
    /// - The database connection pool
    /// - The MySQL token repository on the configured table
    pub async fn initialize(config: AppConfig) -> Result<InfrastructureServices, InfrastructureError> {
        tracing::info!(environment = %config.environment, "Initializing infrastructure services...");

        let pool = DatabasePool::new(config.database.clone()).await?;
        let tokens = MySqlTokenRepository::with_table(pool.get_pool().clone(), &config.database.tokens_table)
            .map_err(|e| InfrastructureError::Configuration(e.to_string()))?;

        tracing::info!("Infrastructure services initialized successfully");

        Ok(InfrastructureServices { config, pool, tokens })
    }
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration source could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Configuration(String),
}
