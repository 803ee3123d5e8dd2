//! Unit tests for domain error types

use tb_shared::validation::ValidationErrors;

use crate::errors::{DomainError, TokenError};

#[test]
fn test_domain_error_messages() {
    assert_eq!(
        DomainError::not_found("token 42").to_string(),
        "Resource not found: token 42"
    );
    assert_eq!(
        DomainError::store_write("connection reset").to_string(),
        "Store write failed: connection reset"
    );
    assert_eq!(
        DomainError::overflow("usage_count").to_string(),
        "Numeric overflow on usage_count"
    );
}

#[test]
fn test_token_error_is_transparent() {
    let error: DomainError = TokenError::UsageLimitExceeded { limit: 3 }.into();
    assert_eq!(error.to_string(), "Token usage limit of 3 reached");
    assert!(matches!(
        error,
        DomainError::Token(TokenError::UsageLimitExceeded { limit: 3 })
    ));
}

#[test]
fn test_is_not_found() {
    assert!(DomainError::not_found("x").is_not_found());
    assert!(!DomainError::store_read("x").is_not_found());
    assert!(!DomainError::Token(TokenError::InvalidToken).is_not_found());
}

#[test]
fn test_validation_errors_conversion() {
    let mut errors = ValidationErrors::new();
    errors.add_error("token", "must not be empty", "required");

    let error: DomainError = errors.into();
    match error {
        DomainError::Validation { message } => assert_eq!(message, "token: must not be empty"),
        other => panic!("unexpected error: {other:?}"),
    }
}
