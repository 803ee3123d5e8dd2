//! Polymorphic owner references for tokens.

use serde::{Deserialize, Serialize};

/// Kind of entity a token is attached to
///
/// Persisted as a lowercase string in `tokenable_type`. Names without a
/// dedicated variant round-trip through `Other`; build kinds with
/// `OwnerKind::from` so one name always maps to one variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OwnerKind {
    User,
    Organization,
    Other(CustomKind),
}

/// Owner kind name with no dedicated [`OwnerKind`] variant
///
/// Only `OwnerKind::from` constructs it, so it never holds `"user"` or
/// `"organization"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomKind(String);

impl CustomKind {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl OwnerKind {
    pub fn as_str(&self) -> &str {
        match self {
            OwnerKind::User => "user",
            OwnerKind::Organization => "organization",
            OwnerKind::Other(kind) => kind.as_str(),
        }
    }
}

impl From<&str> for OwnerKind {
    fn from(value: &str) -> Self {
        match value {
            "user" => OwnerKind::User,
            "organization" => OwnerKind::Organization,
            other => OwnerKind::Other(CustomKind(other.to_string())),
        }
    }
}

impl From<String> for OwnerKind {
    fn from(value: String) -> Self {
        OwnerKind::from(value.as_str())
    }
}

impl From<OwnerKind> for String {
    fn from(kind: OwnerKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged reference to the entity owning a token
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    /// Owner entity kind (`tokenable_type`)
    pub kind: OwnerKind,

    /// Owner identifier (`tokenable_id`), kept as text so numeric and UUID
    /// keys both fit
    pub id: String,
}

impl OwnerRef {
    pub fn new(kind: impl Into<OwnerKind>, id: impl ToString) -> Self {
        Self {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    pub fn user(id: impl ToString) -> Self {
        Self::new(OwnerKind::User, id)
    }

    pub fn organization(id: impl ToString) -> Self {
        Self::new(OwnerKind::Organization, id)
    }
}

impl std::fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.kind, self.id)
    }
}
