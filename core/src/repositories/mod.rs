//! Repository contracts and the in-memory token store.

pub mod token;

pub use token::{InMemoryTokenRepository, TokenRepository, TokenStream};
