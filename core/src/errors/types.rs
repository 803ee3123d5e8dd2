//! Errors raised when a token is presented for consumption

use thiserror::Error;

/// Reasons a presented token value is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    Expired,

    #[error("Token usage limit of {limit} reached")]
    UsageLimitExceeded { limit: u32 },
}
