//! Token policy configuration

use serde::{Deserialize, Serialize};

/// Defaults applied to newly created tokens and to periodic cleanup
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenPolicyConfig {
    /// Expiry applied when a new token does not specify one. `None` keeps
    /// such tokens non-expiring.
    pub default_expiry_minutes: Option<i64>,

    /// Usage limit applied when a new token does not specify one (0 = unlimited)
    pub default_max_usage_limit: u32,

    /// Whether expired tokens are purged by the cleanup service
    pub cleanup_enabled: bool,

    /// Minutes an expired token is retained before it may be purged
    pub cleanup_grace_minutes: i64,

    /// Seconds between background cleanup runs
    pub cleanup_interval_seconds: u64,
}

impl Default for TokenPolicyConfig {
    fn default() -> Self {
        Self {
            default_expiry_minutes: None,
            default_max_usage_limit: 0,
            cleanup_enabled: true,
            cleanup_grace_minutes: 7 * 24 * 60,
            cleanup_interval_seconds: 3600,
        }
    }
}

impl TokenPolicyConfig {
    /// Create from environment variables, keeping defaults for anything unset
    pub fn from_env() -> Self {
        Self::default().apply_env()
    }

    /// Override fields from `TOKENS_*` variables that are set and parse
    pub fn apply_env(mut self) -> Self {
        if let Some(minutes) = env_parse("TOKENS_DEFAULT_EXPIRY_MINUTES") {
            self.default_expiry_minutes = Some(minutes);
        }
        if let Some(limit) = env_parse("TOKENS_DEFAULT_MAX_USAGE") {
            self.default_max_usage_limit = limit;
        }
        if let Some(enabled) = env_parse("TOKENS_CLEANUP_ENABLED") {
            self.cleanup_enabled = enabled;
        }
        if let Some(grace) = env_parse("TOKENS_CLEANUP_GRACE_MINUTES") {
            self.cleanup_grace_minutes = grace;
        }
        if let Some(interval) = env_parse("TOKENS_CLEANUP_INTERVAL_SECONDS") {
            self.cleanup_interval_seconds = interval;
        }
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
