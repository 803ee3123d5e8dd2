//! In-memory implementation of TokenRepository
//!
//! Backs tests and single-process deployments. Writes take an exclusive lock
//! on the whole map, which makes `increment_usage` atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::token::{NewToken, Token};
use crate::domain::value_objects::TokenQuery;
use crate::errors::DomainError;

use super::r#trait::{TokenRepository, TokenStream};

/// In-memory token repository
#[derive(Clone, Default)]
pub struct InMemoryTokenRepository {
    tokens: Arc<RwLock<HashMap<Uuid, Token>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryTokenRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `DomainError::StoreWrite`
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Insert a token as-is, keeping its id and counters
    pub async fn insert(&self, token: Token) {
        self.tokens.write().await.insert(token.id, token);
    }

    /// Number of stored tokens
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::store_write("in-memory store is read-only"));
        }
        Ok(())
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn create(&self, new_token: NewToken) -> Result<Token, DomainError> {
        self.check_writable()?;

        let now = Utc::now();
        let token = Token {
            id: Uuid::new_v4(),
            token: new_token.token,
            expired_at: new_token.expired_at,
            usage_count: 0,
            max_usage_limit: new_token.max_usage_limit,
            data: new_token.data,
            token_type: new_token.token_type,
            tokenable: new_token.tokenable,
            created_at: now,
            updated_at: now,
        };

        self.tokens.write().await.insert(token.id, token.clone());
        Ok(token)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Token>, DomainError> {
        Ok(self.tokens.read().await.get(&id).cloned())
    }

    async fn find_by_token(
        &self,
        token: &str,
        token_type: Option<&str>,
    ) -> Result<Option<Token>, DomainError> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .values()
            .filter(|t| t.token == token)
            .filter(|t| token_type.map_or(true, |kind| t.token_type == kind))
            .max_by_key(|t| (t.created_at, t.id))
            .cloned())
    }

    async fn increment_usage(&self, id: Uuid) -> Result<(), DomainError> {
        self.check_writable()?;

        let mut tokens = self.tokens.write().await;
        let token = tokens
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("token {}", id)))?;

        token.usage_count = token
            .usage_count
            .checked_add(1)
            .ok_or_else(|| DomainError::overflow("usage_count"))?;
        token.updated_at = Utc::now();
        Ok(())
    }

    async fn increment_usage_if_valid(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, DomainError> {
        self.check_writable()?;

        let mut tokens = self.tokens.write().await;
        let Some(token) = tokens.get_mut(&id) else {
            return Ok(false);
        };
        if !TokenQuery::valid(now).matches(token) {
            return Ok(false);
        }

        token.usage_count = token
            .usage_count
            .checked_add(1)
            .ok_or_else(|| DomainError::overflow("usage_count"))?;
        token.updated_at = now;
        Ok(true)
    }

    async fn set_expired_at(
        &self,
        id: Uuid,
        expired_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.check_writable()?;

        let mut tokens = self.tokens.write().await;
        let stored = tokens
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found(format!("token {}", id)))?;

        stored.expired_at = Some(expired_at);
        stored.updated_at = updated_at;
        Ok(())
    }

    async fn save(&self, token: &Token) -> Result<(), DomainError> {
        self.check_writable()?;

        let mut tokens = self.tokens.write().await;
        let stored = tokens
            .get_mut(&token.id)
            .ok_or_else(|| DomainError::not_found(format!("token {}", token.id)))?;

        *stored = Token {
            usage_count: stored.usage_count,
            ..token.clone()
        };
        Ok(())
    }

    fn query<'a>(&'a self, query: &'a TokenQuery) -> TokenStream<'a> {
        Box::pin(async_stream::stream! {
            let mut matching: Vec<Token> = {
                let tokens = self.tokens.read().await;
                tokens.values().filter(|t| query.matches(t)).cloned().collect()
            };
            matching.sort_by_key(|t| (t.created_at, t.id));

            let limit = query
                .limit
                .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));
            for token in matching.into_iter().take(limit) {
                yield Ok::<Token, DomainError>(token);
            }
        })
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        self.check_writable()?;
        Ok(self.tokens.write().await.remove(&id).is_some())
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError> {
        self.check_writable()?;

        let mut tokens = self.tokens.write().await;
        let initial_count = tokens.len();
        tokens.retain(|_, token| !token.expired_at.is_some_and(|at| at < cutoff));
        Ok(initial_count - tokens.len())
    }
}
