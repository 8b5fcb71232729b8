use std::str::FromStr;

use idbridge_core::{AppError, SubscriptionId};
use idbridge_domain::UserDeclaration;
use serde::{Deserialize, Serialize};

/// Declared RBAC state for one subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbacConfiguration {
    /// Root scope anchor.
    #[serde(alias = "subscriptionId")]
    pub subscription_id: SubscriptionId,
    /// Ordered user declarations.
    #[serde(default)]
    pub users: Vec<UserDeclaration>,
}

/// Behavior when the directory lookup itself fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupFailurePolicy {
    /// Treat the failure as "not found" and create the principal.
    ///
    /// A transient failure may then attempt a duplicate creation, which the
    /// directory rejects when it enforces uniqueness.
    #[default]
    TreatAsMissing,
    /// Propagate the lookup error and abort the user.
    Fail,
}

impl LookupFailurePolicy {
    /// Returns a stable configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TreatAsMissing => "treat_as_missing",
            Self::Fail => "fail",
        }
    }
}

impl FromStr for LookupFailurePolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "treat_as_missing" => Ok(Self::TreatAsMissing),
            "fail" => Ok(Self::Fail),
            other => Err(AppError::Validation(format!(
                "lookup failure policy must be 'treat_as_missing' or 'fail', got '{other}'"
            ))),
        }
    }
}

/// Source of the initial credential for newly created principals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialPolicy {
    /// Generate a random credential when none is declared.
    #[default]
    GenerateWhenAbsent,
    /// Refuse to create principals without a declared credential.
    RequireExplicit,
}

impl CredentialPolicy {
    /// Returns a stable configuration value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GenerateWhenAbsent => "generate_when_absent",
            Self::RequireExplicit => "require_explicit",
        }
    }
}

impl FromStr for CredentialPolicy {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "generate_when_absent" => Ok(Self::GenerateWhenAbsent),
            "require_explicit" => Ok(Self::RequireExplicit),
            other => Err(AppError::Validation(format!(
                "credential policy must be 'generate_when_absent' or 'require_explicit', got '{other}'"
            ))),
        }
    }
}

/// Tunables of the reconciler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcilerOptions {
    /// Directory lookup failure handling.
    pub lookup_failure_policy: LookupFailurePolicy,
    /// Initial credential handling.
    pub credential_policy: CredentialPolicy,
}
