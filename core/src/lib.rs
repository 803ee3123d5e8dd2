//! # Token Builder Core
//!
//! Core business logic and domain layer for usage-limited, expirable tokens.
//! This crate contains the token entity and its validity rules, the query
//! specification, repository interfaces with an in-memory implementation,
//! and the services that apply rules against a store and a clock.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::{NewToken, NewTokenBuilder, OwnerKind, OwnerRef, Token, TokenQuery};
pub use errors::{DomainError, DomainResult, TokenError};
pub use repositories::{InMemoryTokenRepository, TokenRepository, TokenStream};
pub use services::{
    CleanupResult, Clock, FixedClock, OwnerLoader, OwnerRegistry, SystemClock, TokenCleanupService,
    TokenService,
};
