//! Domain-specific error types and error handling.

mod types;

#[cfg(test)]
mod tests;

pub use types::TokenError;

use tb_shared::validation::ValidationErrors;
use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Store write failed: {message}")]
    StoreWrite { message: String },

    #[error("Store read failed: {message}")]
    StoreRead { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Numeric overflow on {field}")]
    Overflow { field: String },

    #[error("No owner loader registered for kind: {kind}")]
    UnknownOwnerKind { kind: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl DomainError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    pub fn store_write(message: impl std::fmt::Display) -> Self {
        Self::StoreWrite { message: message.to_string() }
    }

    pub fn store_read(message: impl std::fmt::Display) -> Self {
        Self::StoreRead { message: message.to_string() }
    }

    pub fn overflow(field: impl Into<String>) -> Self {
        Self::Overflow { field: field.into() }
    }

    /// Whether the error means the record does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<ValidationErrors> for DomainError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation { message: errors.to_string() }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
