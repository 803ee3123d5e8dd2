//! Registry of owner loaders keyed by owner kind

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::domain::entities::owner::{OwnerKind, OwnerRef};
use crate::domain::entities::token::Token;
use crate::errors::DomainError;

/// Loads owners of one kind by identifier
///
/// `O` is the caller's owner type, typically an enum over the entities
/// tokens can be attached to. Async closures taking the id as `String`
/// implement this trait directly.
#[async_trait]
pub trait OwnerLoader<O>: Send + Sync {
    /// # Returns
    /// * `Ok(Some(O))` - Owner found
    /// * `Ok(None)` - No owner with this id
    async fn load(&self, id: &str) -> Result<Option<O>, DomainError>;
}

#[async_trait]
impl<O, F, Fut> OwnerLoader<O> for F
where
    O: Send + 'static,
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<O>, DomainError>> + Send,
{
    async fn load(&self, id: &str) -> Result<Option<O>, DomainError> {
        (self)(id.to_string()).await
    }
}

/// Maps each [`OwnerKind`] to the loader that resolves it
pub struct OwnerRegistry<O> {
    loaders: HashMap<OwnerKind, Arc<dyn OwnerLoader<O>>>,
}

impl<O> Default for OwnerRegistry<O> {
    fn default() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }
}

impl<O: Send + 'static> OwnerRegistry<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the loader for `kind`
    pub fn register(mut self, kind: OwnerKind, loader: impl OwnerLoader<O> + 'static) -> Self {
        self.loaders.insert(kind, Arc::new(loader));
        self
    }

    pub fn is_registered(&self, kind: &OwnerKind) -> bool {
        self.loaders.contains_key(kind)
    }

    /// Load the entity `owner` points at
    ///
    /// # Returns
    /// * `Err(DomainError::UnknownOwnerKind)` - No loader for the kind
    /// * `Err(DomainError::NotFound)` - The loader found nothing
    pub async fn resolve(&self, owner: &OwnerRef) -> Result<O, DomainError> {
        let loader = self
            .loaders
            .get(&owner.kind)
            .ok_or_else(|| DomainError::UnknownOwnerKind {
                kind: owner.kind.to_string(),
            })?;

        loader
            .load(&owner.id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("owner {}", owner)))
    }

    /// Load the owner of `token`, `Ok(None)` when the token has none
    pub async fn resolve_owner_of(&self, token: &Token) -> Result<Option<O>, DomainError> {
        match &token.tokenable {
            Some(owner) => self.resolve(owner).await.map(Some),
            None => Ok(None),
        }
    }
}
