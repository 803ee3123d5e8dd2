//! Main token service implementation

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tb_shared::TokenPolicyConfig;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::entities::token::{add_minutes, NewTokenBuilder, Token};
use crate::domain::value_objects::TokenQuery;
use crate::errors::{DomainError, TokenError};
use crate::repositories::{TokenRepository, TokenStream};
use crate::services::clock::{Clock, SystemClock};

/// Applies the token rules that need the store or the clock
///
/// [`Token`] stays a plain record; every change to persisted state goes
/// through this service and is written to the repository explicitly.
pub struct TokenService<R: TokenRepository, C: Clock = SystemClock> {
    repository: R,
    clock: C,
    policy: TokenPolicyConfig,
}

impl<R: TokenRepository> TokenService<R> {
    /// Creates a token service reading wall-clock time
    pub fn new(repository: R, policy: TokenPolicyConfig) -> Self {
        Self::with_clock(repository, SystemClock, policy)
    }
}

impl<R: TokenRepository, C: Clock> TokenService<R, C> {
    /// Creates a token service with an explicit clock
    pub fn with_clock(repository: R, clock: C, policy: TokenPolicyConfig) -> Self {
        Self {
            repository,
            clock,
            policy,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn policy(&self) -> &TokenPolicyConfig {
        &self.policy
    }

    /// Current instant according to the injected clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Validates and stores a new token
    ///
    /// Relative expirations are measured from the clock; unset expiry and
    /// usage limit fall back to the configured policy.
    pub async fn create(&self, builder: NewTokenBuilder) -> Result<Token, DomainError> {
        let new_token = builder.build(self.now(), &self.policy)?;
        let token = self.repository.create(new_token).await.map_err(|e| {
            error!("Failed to create token: {}", e);
            e
        })?;

        info!(
            token_id = %token.id,
            token_type = %token.token_type,
            expired_at = ?token.expired_at,
            max_usage_limit = token.max_usage_limit,
            "Token created"
        );
        Ok(token)
    }

    /// Loads a token by identifier
    ///
    /// # Returns
    /// * `Err(DomainError::NotFound)` - No token with this identifier
    pub async fn find(&self, id: Uuid) -> Result<Token, DomainError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("token {}", id)))
    }

    /// Looks a token up by its value
    pub async fn find_by_token(
        &self,
        value: &str,
        token_type: Option<&str>,
    ) -> Result<Option<Token>, DomainError> {
        self.repository.find_by_token(value, token_type).await
    }

    /// Records one use of the token
    ///
    /// The store performs a single atomic increment; the caller's copy is
    /// updated only after the store accepted it.
    pub async fn use_token<'t>(&self, token: &'t mut Token) -> Result<&'t mut Token, DomainError> {
        self.repository.increment_usage(token.id).await.map_err(|e| {
            error!(token_id = %token.id, "Failed to record token use: {}", e);
            e
        })?;

        token.usage_count = token.usage_count.saturating_add(1);
        token.updated_at = self.now();
        debug!(token_id = %token.id, usage_count = token.usage_count, "Token used");
        Ok(token)
    }

    pub fn has_expired(&self, token: &Token) -> bool {
        token.has_expired_at(self.now())
    }

    pub fn is_valid(&self, token: &Token) -> bool {
        token.is_valid_at(self.now())
    }

    /// Sets the expiration to now and saves it
    pub async fn mark_as_expired<'t>(&self, token: &'t mut Token) -> Result<&'t mut Token, DomainError> {
        let now = self.now();
        self.store_expiration(token, now).await?;
        info!(token_id = %token.id, "Token marked as expired");
        Ok(token)
    }

    /// Moves the expiration by `minutes` and saves it
    ///
    /// A token without an expiration is treated as expiring now, so the
    /// result is `now + minutes`. Negative values move the expiration back.
    pub async fn add_minutes<'t>(
        &self,
        token: &'t mut Token,
        minutes: i64,
    ) -> Result<&'t mut Token, DomainError> {
        let base = token.expired_at.unwrap_or_else(|| self.now());
        let expired_at = add_minutes(base, minutes)?;
        self.store_expiration(token, expired_at).await?;
        debug!(token_id = %token.id, %expired_at, "Token expiration moved");
        Ok(token)
    }

    /// Streams tokens matching `query` that are valid now
    pub fn valid_tokens(&self, query: TokenQuery) -> TokenStream<'_> {
        let query = query.valid_at(self.now());
        Box::pin(async_stream::stream! {
            let mut tokens = self.repository.query(&query);
            while let Some(token) = tokens.next().await {
                yield token;
            }
        })
    }

    /// Counts tokens matching `query` that are valid now
    pub async fn count_valid(&self, query: TokenQuery) -> Result<usize, DomainError> {
        self.repository.count(&query.valid_at(self.now())).await
    }

    /// Consumes one use of the token presented as `value`
    ///
    /// The use is recorded with a conditional increment, so concurrent
    /// consumers can never push a token past its limit.
    ///
    /// # Returns
    /// * `Ok(Token)` - The token with the use recorded
    /// * `Err(TokenError::InvalidToken)` - No such token
    /// * `Err(TokenError::Expired)` - The token expired
    /// * `Err(TokenError::UsageLimitExceeded)` - No uses left
    pub async fn consume(&self, value: &str, token_type: Option<&str>) -> Result<Token, DomainError> {
        let now = self.now();
        let mut token = self
            .repository
            .find_by_token(value, token_type)
            .await?
            .ok_or(TokenError::InvalidToken)?;

        if !self.repository.increment_usage_if_valid(token.id, now).await? {
            // Re-read: the stored state explains the rejection better than our copy
            let current = self.repository.find_by_id(token.id).await?.unwrap_or(token);
            let reason = Self::rejection_reason(&current, now);
            warn!(token_id = %current.id, "Token rejected: {}", reason);
            return Err(reason.into());
        }

        token.usage_count = token.usage_count.saturating_add(1);
        token.updated_at = now;
        debug!(token_id = %token.id, usage_count = token.usage_count, "Token consumed");
        Ok(token)
    }

    fn rejection_reason(token: &Token, now: DateTime<Utc>) -> TokenError {
        if token.has_exceed_max_usage() {
            TokenError::UsageLimitExceeded {
                limit: token.max_usage_limit,
            }
        } else if token.expired_at.is_some_and(|at| at <= now) {
            TokenError::Expired
        } else {
            TokenError::InvalidToken
        }
    }

    /// Writes `expired_at` alone and updates the caller's copy only on success
    async fn store_expiration(&self, token: &mut Token, expired_at: DateTime<Utc>) -> Result<(), DomainError> {
        let now = self.now();
        self.repository
            .set_expired_at(token.id, expired_at, now)
            .await
            .map_err(|e| {
                error!(token_id = %token.id, "Failed to save token expiration: {}", e);
                e
            })?;
        token.expired_at = Some(expired_at);
        token.updated_at = now;
        Ok(())
    }
}
