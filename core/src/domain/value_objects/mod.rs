//! Value objects describing queries over token records.

pub mod token_query;

pub use token_query::TokenQuery;
