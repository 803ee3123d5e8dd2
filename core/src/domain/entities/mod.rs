//! Domain entities representing core business objects.

pub mod owner;
pub mod token;

#[cfg(test)]
mod tests;

pub use owner::{CustomKind, OwnerKind, OwnerRef};
pub use token::{NewToken, NewTokenBuilder, Token};
