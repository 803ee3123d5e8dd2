//! Token repository trait defining the record store contract for tokens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use uuid::Uuid;

use crate::domain::entities::token::{NewToken, Token};
use crate::domain::value_objects::TokenQuery;
use crate::errors::DomainError;

/// Lazy sequence of tokens produced by [`TokenRepository::query`]
pub type TokenStream<'a> = BoxStream<'a, Result<Token, DomainError>>;

/// Repository trait for Token entity persistence operations
///
/// Implementations are the system of record for token state. Business rules
/// live in [`Token`] and [`TokenService`](crate::services::TokenService);
/// the repository only stores, loads and filters.
///
/// # Consistency
/// - `increment_usage` must be a single atomic operation at the store, never
///   a read followed by a write
/// - `query` must apply every clause of the [`TokenQuery`] at the store
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persist a new token and assign its identifier
    ///
    /// # Returns
    /// * `Ok(Token)` - The stored token with id and timestamps set
    /// * `Err(DomainError::StoreWrite)` - The write failed
    ///
    /// # Example
    /// ```no_run
    /// # use chrono::Utc;
    /// # use tb_core::domain::entities::token::NewToken;
    /// # use tb_core::repositories::TokenRepository;
    /// # async fn example(repo: &impl TokenRepository) -> Result<(), Box<dyn std::error::Error>> {
    /// let new_token = NewToken::builder("8f2c1e", "invite")
    ///     .expires_in_minutes(60)
    ///     .max_usage(1)
    ///     .build(Utc::now(), &Default::default())?;
    ///
    /// let token = repo.create(new_token).await?;
    /// println!("Token stored with ID: {}", token.id);
    /// # Ok(())
    /// # }
    /// ```
    async fn create(&self, token: NewToken) -> Result<Token, DomainError>;

    /// Find a token by its identifier
    ///
    /// # Returns
    /// * `Ok(Some(Token))` - Token found
    /// * `Ok(None)` - No token with this identifier
    /// * `Err(DomainError)` - The read failed
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Token>, DomainError>;

    /// Find the most recently created token with this value, optionally
    /// restricted to one token type
    async fn find_by_token(
        &self,
        token: &str,
        token_type: Option<&str>,
    ) -> Result<Option<Token>, DomainError>;

    /// Atomically add one to `usage_count`
    ///
    /// # Returns
    /// * `Ok(())` - Incremented
    /// * `Err(DomainError::NotFound)` - No token with this identifier
    /// * `Err(DomainError::Overflow)` - The counter is already at `u32::MAX`
    /// * `Err(DomainError::StoreWrite)` - The write failed
    async fn increment_usage(&self, id: Uuid) -> Result<(), DomainError>;

    /// Atomically add one to `usage_count` only if the token is valid at
    /// `now` under the same rule as [`TokenQuery::valid`]
    ///
    /// # Returns
    /// * `Ok(true)` - Incremented
    /// * `Ok(false)` - Token missing, expired or at its usage limit
    /// * `Err(DomainError::StoreWrite)` - The write failed
    async fn increment_usage_if_valid(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, DomainError>;

    /// Write only `expired_at` and `updated_at`, leaving every other column
    /// as stored
    ///
    /// # Returns
    /// * `Ok(())` - Written
    /// * `Err(DomainError::NotFound)` - No token with this identifier
    /// * `Err(DomainError::StoreWrite)` - The write failed
    async fn set_expired_at(
        &self,
        id: Uuid,
        expired_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Write every mutable field of an existing token
    ///
    /// `usage_count` is left as stored; only the increment operations change
    /// it, so saving a stale copy never loses recorded uses.
    ///
    /// # Returns
    /// * `Ok(())` - Saved
    /// * `Err(DomainError::NotFound)` - The token no longer exists
    /// * `Err(DomainError::StoreWrite)` - The write failed
    async fn save(&self, token: &Token) -> Result<(), DomainError>;

    /// Stream the tokens matching `query`
    ///
    /// # Example
    /// ```no_run
    /// # use chrono::Utc;
    /// # use futures::TryStreamExt;
    /// # use tb_core::domain::value_objects::TokenQuery;
    /// # use tb_core::repositories::TokenRepository;
    /// # async fn example(repo: &impl TokenRepository) -> Result<(), Box<dyn std::error::Error>> {
    /// let query = TokenQuery::valid(Utc::now()).with_type("invite");
    /// let mut tokens = repo.query(&query);
    /// while let Some(token) = tokens.try_next().await? {
    ///     println!("{} has {:?} uses left", token.id, token.remaining_uses());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn query<'a>(&'a self, query: &'a TokenQuery) -> TokenStream<'a>;

    /// Delete a token
    ///
    /// # Returns
    /// * `Ok(true)` - Deleted
    /// * `Ok(false)` - Token not found
    async fn delete(&self, id: Uuid) -> Result<bool, DomainError>;

    /// Delete tokens whose expiration lies strictly before `cutoff`
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of tokens deleted
    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DomainError>;

    /// Count the tokens matching `query`
    async fn count(&self, query: &TokenQuery) -> Result<usize, DomainError> {
        self.query(query)
            .try_fold(0usize, |count, _| async move { Ok(count + 1) })
            .await
    }
}
