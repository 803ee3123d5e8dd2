//! Database configuration module

use serde::{Deserialize, Serialize};

/// Database configuration for the MySQL token store
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of idle connections kept open
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub connect_timeout: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout: u64,

    /// Maximum lifetime of a connection in seconds
    pub max_lifetime: u64,

    /// Table holding token records
    pub tokens_table: String,

    /// Log every SQL statement at debug level
    pub enable_logging: bool,

    /// Slow query threshold in milliseconds
    pub slow_query_threshold: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::from("mysql://localhost:3306/tokens"),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: 30,
            idle_timeout: 600,
            max_lifetime: 1800,
            tokens_table: String::from("tokens"),
            enable_logging: false,
            slow_query_threshold: 1000,
        }
    }
}

impl DatabaseConfig {
    /// Create from environment variables, keeping defaults for anything unset
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Override fields from `DATABASE_*` / `TOKENS_TABLE` variables that are
    /// set and parse
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.url = url;
        }
        if let Some(max) = std::env::var("DATABASE_MAX_CONNECTIONS").ok().and_then(|v| v.parse().ok()) {
            self.max_connections = max;
        }
        if let Some(timeout) = std::env::var("DATABASE_CONNECT_TIMEOUT").ok().and_then(|v| v.parse().ok()) {
            self.connect_timeout = timeout;
        }
        if let Ok(table) = std::env::var("TOKENS_TABLE") {
            self.tokens_table = table;
        }
        self
    }

    /// Create a new database configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the maximum number of connections
    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Use a different table for token records
    pub fn with_tokens_table(mut self, table: impl Into<String>) -> Self {
        self.tokens_table = table.into();
        self
    }

    /// Enable SQL query logging
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let config = DatabaseConfig::new("mysql://db:3306/app")
            .with_max_connections(25)
            .with_tokens_table("invite_tokens")
            .with_logging(true);

        assert_eq!(config.url, "mysql://db:3306/app");
        assert_eq!(config.max_connections, 25);
        assert_eq!(config.tokens_table, "invite_tokens");
        assert!(config.enable_logging);
        assert_eq!(config.min_connections, 1);
    }

    #[test]
    fn test_defaults_use_tokens_table() {
        assert_eq!(DatabaseConfig::default().tokens_table, "tokens");
    }
}
