use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, AppResult};

/// Subscription identifier anchoring every management scope path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubscriptionId(String);

impl SubscriptionId {
    /// Creates a validated subscription identifier.
    ///
    /// The value is trimmed and must not contain `/`, since it is embedded
    /// verbatim into scope paths.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "subscription id must not be empty".to_owned(),
            ));
        }

        if trimmed.contains('/') {
            return Err(AppError::Validation(format!(
                "subscription id '{trimmed}' must not contain '/'"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the underlying identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the `/subscriptions/{id}` root scope path.
    #[must_use]
    pub fn scope_path(&self) -> String {
        format!("/subscriptions/{}", self.0)
    }
}

impl TryFrom<String> for SubscriptionId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubscriptionId> for String {
    fn from(value: SubscriptionId) -> Self {
        value.0
    }
}

impl Display for SubscriptionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Directory tenant identifier of the cloud identity tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectoryTenantId(Uuid);

impl DirectoryTenantId {
    /// Creates a tenant identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl FromStr for DirectoryTenantId {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid tenant id '{value}': {error}")))
    }
}

impl Display for DirectoryTenantId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{DirectoryTenantId, SubscriptionId};

    #[test]
    fn subscription_scope_path_is_rooted() {
        let subscription_id = SubscriptionId::new(" sub1 ").unwrap_or_else(|_| unreachable!());
        assert_eq!(subscription_id.scope_path(), "/subscriptions/sub1");
    }

    #[test]
    fn subscription_id_rejects_path_separators() {
        assert!(SubscriptionId::new("sub1/resourceGroups/rg").is_err());
        assert!(SubscriptionId::new("  ").is_err());
    }

    #[test]
    fn tenant_id_formats_as_uuid() {
        let tenant_id = DirectoryTenantId::from_str("72f988bf-86f1-41af-91ab-2d7cd011db47")
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(tenant_id.to_string().len(), 36);
    }

    #[test]
    fn tenant_id_rejects_non_uuid_values() {
        assert!(DirectoryTenantId::from_str("contoso").is_err());
    }
}
