//! Store-agnostic query specification for token records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::{OwnerRef, Token};

/// Specification of the tokens a caller wants from a store
///
/// All set clauses are AND-combined. Backends either translate the clauses
/// into their native query language or evaluate [`matches`](Self::matches).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenQuery {
    /// Keep only tokens valid at this instant: under their usage limit and
    /// with no expiration or an expiration strictly after the instant
    pub valid_at: Option<DateTime<Utc>>,

    /// Exact token value
    pub token: Option<String>,

    /// Token type discriminator
    pub token_type: Option<String>,

    /// Owning entity
    pub owner: Option<OwnerRef>,

    /// Maximum number of records to return
    pub limit: Option<u64>,
}

impl TokenQuery {
    /// Match every token
    pub fn new() -> Self {
        Self::default()
    }

    /// Match tokens valid at `now`
    pub fn valid(now: DateTime<Utc>) -> Self {
        Self::new().valid_at(now)
    }

    pub fn valid_at(mut self, now: DateTime<Utc>) -> Self {
        self.valid_at = Some(now);
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    pub fn with_owner(mut self, owner: OwnerRef) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// In-memory evaluation of every clause except `limit`
    pub fn matches(&self, token: &Token) -> bool {
        if let Some(now) = self.valid_at {
            if !Self::within_usage_limit(token) || !Self::unexpired_at(token, now) {
                return false;
            }
        }
        if self.token.as_deref().is_some_and(|value| value != token.token) {
            return false;
        }
        if self.token_type.as_deref().is_some_and(|kind| kind != token.token_type) {
            return false;
        }
        if let Some(owner) = &self.owner {
            if token.tokenable.as_ref() != Some(owner) {
                return false;
            }
        }
        true
    }

    // max_usage_limit = 0 OR usage_count < max_usage_limit
    fn within_usage_limit(token: &Token) -> bool {
        token.max_usage_limit == 0 || token.usage_count < token.max_usage_limit
    }

    // expired_at IS NULL OR expired_at > now
    fn unexpired_at(token: &Token, now: DateTime<Utc>) -> bool {
        token.expired_at.map_or(true, |expired_at| expired_at > now)
    }
}
