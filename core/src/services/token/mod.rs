//! Token service module
//!
//! This module handles the token operations that need the store or the clock:
//! - Recording uses with atomic increments
//! - Expiring tokens and moving their expiration
//! - Validity queries and consumption of presented tokens
//! - Background cleanup of expired tokens

mod cleanup;
mod service;

#[cfg(test)]
mod tests;

pub use cleanup::{CleanupResult, TokenCleanupService};
pub use service::TokenService;
