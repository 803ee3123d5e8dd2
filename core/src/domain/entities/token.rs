//! Usage-limited, expirable token records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tb_shared::validation::{validators, Validate, ValidationErrors};
use tb_shared::TokenPolicyConfig;
use uuid::Uuid;

use super::owner::OwnerRef;
use crate::errors::DomainError;

/// Token record as persisted by a [`TokenRepository`](crate::repositories::TokenRepository)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Identifier assigned by the store on creation
    pub id: Uuid,

    /// Opaque token value
    pub token: String,

    /// Expiration instant; `None` never expires
    pub expired_at: Option<DateTime<Utc>>,

    /// Number of times the token has been used
    pub usage_count: u32,

    /// Maximum number of uses; 0 means unlimited
    pub max_usage_limit: u32,

    /// Caller payload, opaque to this crate
    #[serde(default)]
    pub data: Value,

    /// Discriminator such as `invite` or `password_reset`
    #[serde(rename = "type")]
    pub token_type: String,

    /// Entity this token is attached to
    pub tokenable: Option<OwnerRef>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Token {
    /// Whether the token has been used at least once
    pub fn has_used(&self) -> bool {
        self.usage_count > 0
    }

    /// Whether `now` is strictly after the expiration instant.
    /// Tokens without an expiration never expire.
    pub fn has_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expired_at {
            Some(expired_at) => now > expired_at,
            None => false,
        }
    }

    /// Whether a usage limit is enforced
    pub fn has_max_usage_limit(&self) -> bool {
        self.max_usage_limit > 0
    }

    /// Whether the usage limit has been reached
    pub fn has_exceed_max_usage(&self) -> bool {
        self.has_max_usage_limit() && self.usage_count >= self.max_usage_limit
    }

    /// A token is valid when it is neither expired nor over its usage limit
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !(self.has_expired_at(now) || self.has_exceed_max_usage())
    }

    /// Uses left before the limit is reached, `None` when unlimited
    pub fn remaining_uses(&self) -> Option<u32> {
        self.has_max_usage_limit()
            .then(|| self.max_usage_limit.saturating_sub(self.usage_count))
    }

    /// Time left until expiration, zero once expired, `None` when the
    /// token never expires
    pub fn time_until_expiration(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.expired_at.map(|expired_at| {
            if expired_at > now {
                expired_at - now
            } else {
                Duration::zero()
            }
        })
    }
}

/// Fields supplied by the caller when creating a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewToken {
    pub token: String,
    pub token_type: String,
    pub expired_at: Option<DateTime<Utc>>,
    pub max_usage_limit: u32,
    pub data: Value,
    pub tokenable: Option<OwnerRef>,
}

impl NewToken {
    /// Start building a token with the given value and type
    pub fn builder(token: impl Into<String>, token_type: impl Into<String>) -> NewTokenBuilder {
        NewTokenBuilder {
            token: token.into(),
            token_type: token_type.into(),
            expiry: None,
            max_usage_limit: None,
            data: Value::Null,
            tokenable: None,
        }
    }
}

impl Validate for NewToken {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if !validators::is_valid_token_value(&self.token) {
            errors.add_error("token", "must be non-blank and at most 255 bytes", "invalid_token");
        }
        if !validators::is_valid_token_type(&self.token_type) {
            errors.add_error(
                "type",
                "must be 1-64 characters of letters, digits, '_', '.', ':' or '-'",
                "invalid_type",
            );
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expiry {
    At(DateTime<Utc>),
    InMinutes(i64),
    Never,
}

/// Builder for [`NewToken`]
///
/// Relative expirations and policy defaults are resolved in [`build`](Self::build),
/// against the instant the caller supplies.
#[derive(Debug, Clone)]
pub struct NewTokenBuilder {
    token: String,
    token_type: String,
    expiry: Option<Expiry>,
    max_usage_limit: Option<u32>,
    data: Value,
    tokenable: Option<OwnerRef>,
}

impl NewTokenBuilder {
    /// Expire at a fixed instant
    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expiry = Some(Expiry::At(at));
        self
    }

    /// Expire the given number of minutes after creation
    pub fn expires_in_minutes(mut self, minutes: i64) -> Self {
        self.expiry = Some(Expiry::InMinutes(minutes));
        self
    }

    /// Never expire, even when the policy sets a default expiry
    pub fn never_expires(mut self) -> Self {
        self.expiry = Some(Expiry::Never);
        self
    }

    /// Limit the number of uses; 0 means unlimited
    pub fn max_usage(mut self, limit: u32) -> Self {
        self.max_usage_limit = Some(limit);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn owner(mut self, owner: OwnerRef) -> Self {
        self.tokenable = Some(owner);
        self
    }

    /// Resolve the builder into a validated [`NewToken`]
    ///
    /// Unset expiry and usage limit fall back to `policy`; relative expiry
    /// is measured from `now`.
    pub fn build(self, now: DateTime<Utc>, policy: &TokenPolicyConfig) -> Result<NewToken, DomainError> {
        let expiry = match self.expiry {
            Some(expiry) => expiry,
            None => policy
                .default_expiry_minutes
                .map_or(Expiry::Never, Expiry::InMinutes),
        };
        let expired_at = match expiry {
            Expiry::At(at) => Some(at),
            Expiry::InMinutes(minutes) => Some(add_minutes(now, minutes)?),
            Expiry::Never => None,
        };

        let token = NewToken {
            token: self.token,
            token_type: self.token_type,
            expired_at,
            max_usage_limit: self.max_usage_limit.unwrap_or(policy.default_max_usage_limit),
            data: self.data,
            tokenable: self.tokenable,
        };
        token.validate()?;
        Ok(token)
    }
}

/// `at + minutes`, failing instead of panicking when out of range
pub(crate) fn add_minutes(at: DateTime<Utc>, minutes: i64) -> Result<DateTime<Utc>, DomainError> {
    Duration::try_minutes(minutes)
        .and_then(|delta| at.checked_add_signed(delta))
        .ok_or_else(|| DomainError::overflow("expired_at"))
}
