//! Common validation utilities

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Token type discriminators: short, printable, no whitespace
static TOKEN_TYPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:-]{1,64}$").expect("valid token type pattern"));

/// Plain SQL identifiers (table and column names)
static SQL_IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("valid identifier pattern"));

/// Upper bound on stored token values, matching `VARCHAR(255)`
pub const MAX_TOKEN_LENGTH: usize = 255;

/// Validation error with field-level details
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub code: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Collection of validation errors
#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>, code: impl Into<String>) {
        self.errors.push(ValidationError::new(field, message, code));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// Trait for types that can be validated
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Common validation functions
pub mod validators {
    use super::{MAX_TOKEN_LENGTH, SQL_IDENTIFIER_PATTERN, TOKEN_TYPE_PATTERN};

    /// Check if a string is not empty
    pub fn not_empty(value: &str) -> bool {
        !value.trim().is_empty()
    }

    /// Check if a string length is within bounds
    pub fn length_between(value: &str, min: usize, max: usize) -> bool {
        let len = value.len();
        len >= min && len <= max
    }

    /// A storable token value: non-blank and within the column size
    pub fn is_valid_token_value(value: &str) -> bool {
        not_empty(value) && length_between(value, 1, MAX_TOKEN_LENGTH)
    }

    pub fn is_valid_token_type(value: &str) -> bool {
        TOKEN_TYPE_PATTERN.is_match(value)
    }

    pub fn is_sql_identifier(value: &str) -> bool {
        SQL_IDENTIFIER_PATTERN.is_match(value)
    }
}
