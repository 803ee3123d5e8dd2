//! Periodic purge of tokens that expired long enough ago
//!
//! Expired tokens are kept for a grace period so that late presentations
//! still resolve to `Expired` instead of `InvalidToken`.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tb_shared::TokenPolicyConfig;
use tracing::{error, info, warn};

use crate::errors::DomainError;
use crate::repositories::TokenRepository;
use crate::services::clock::{Clock, SystemClock};

/// Service for deleting expired tokens
pub struct TokenCleanupService<R: TokenRepository + 'static, C: Clock + 'static = SystemClock> {
    repository: Arc<R>,
    clock: C,
    policy: TokenPolicyConfig,
}

impl<R: TokenRepository> TokenCleanupService<R> {
    /// Create a new token cleanup service reading wall-clock time
    pub fn new(repository: Arc<R>, policy: TokenPolicyConfig) -> Self {
        Self::with_clock(repository, SystemClock, policy)
    }
}

impl<R: TokenRepository, C: Clock> TokenCleanupService<R, C> {
    pub fn with_clock(repository: Arc<R>, clock: C, policy: TokenPolicyConfig) -> Self {
        Self {
            repository,
            clock,
            policy,
        }
    }

    /// Tokens expiring strictly before this instant are eligible for deletion
    pub fn cutoff(&self) -> Result<DateTime<Utc>, DomainError> {
        Duration::try_minutes(self.policy.cleanup_grace_minutes)
            .and_then(|grace| self.clock.now().checked_sub_signed(grace))
            .ok_or_else(|| DomainError::overflow("cleanup_grace_minutes"))
    }

    /// Run a single cleanup cycle
    ///
    /// # Returns
    /// * `Ok(CleanupResult)` - Summary of the cycle, empty when disabled
    /// * `Err(DomainError)` - If the grace period is out of range
    pub async fn run_cleanup(&self) -> Result<CleanupResult, DomainError> {
        if !self.policy.cleanup_enabled {
            return Ok(CleanupResult::default());
        }

        let cutoff = self.cutoff()?;
        info!(%cutoff, "Starting token cleanup cycle");

        let mut result = CleanupResult::default();
        match self.repository.delete_expired_before(cutoff).await {
            Ok(count) => {
                result.expired_tokens_deleted = count;
                info!("Deleted {} expired tokens", count);
            }
            Err(e) => {
                error!("Failed to cleanup expired tokens: {}", e);
                result.errors.push(format!("Token cleanup error: {}", e));
            }
        }

        Ok(result)
    }

    /// Start the cleanup service as a background task
    ///
    /// Runs [`run_cleanup`](Self::run_cleanup) every
    /// `cleanup_interval_seconds` on the current tokio runtime.
    pub fn start_background_task(self: Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if !self.policy.cleanup_enabled {
            warn!("Token cleanup service is disabled");
            return None;
        }

        let interval = std::time::Duration::from_secs(self.policy.cleanup_interval_seconds.max(1));

        Some(tokio::spawn(async move {
            info!(
                "Token cleanup service started - will run every {} seconds",
                interval.as_secs()
            );

            let mut interval_timer = tokio::time::interval(interval);

            loop {
                interval_timer.tick().await;

                match self.run_cleanup().await {
                    Ok(result) => {
                        if !result.errors.is_empty() {
                            warn!("Cleanup completed with errors: {:?}", result.errors);
                        }
                    }
                    Err(e) => {
                        error!("Token cleanup cycle failed: {}", e);
                    }
                }
            }
        }))
    }
}

/// Result of a cleanup operation
#[derive(Debug, Default)]
pub struct CleanupResult {
    /// Number of expired tokens deleted
    pub expired_tokens_deleted: usize,
    /// Any errors encountered during cleanup
    pub errors: Vec<String>,
}

impl CleanupResult {
    /// Check if the cleanup was successful (no errors)
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
