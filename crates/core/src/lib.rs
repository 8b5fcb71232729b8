//! Shared primitives for all Rust crates in idbridge.

#![forbid(unsafe_code)]

/// Cloud tenancy identifiers shared across services.
pub mod tenancy;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use tenancy::{DirectoryTenantId, SubscriptionId};

/// Result type used across idbridge crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated against an external API.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but blocked by the external API policy.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Role name has no entry in the role definition catalog.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// Assignment scope kind was declared without the parameter it needs.
    #[error("missing scope parameter: {0}")]
    MissingScopeParameter(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_role_message_names_the_role() {
        let error = AppError::UnknownRole("role 'Auditor' is not in the catalog".to_owned());
        assert_eq!(
            error.to_string(),
            "unknown role: role 'Auditor' is not in the catalog"
        );
    }
}
