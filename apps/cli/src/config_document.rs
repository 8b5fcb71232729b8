use std::collections::BTreeMap;
use std::path::Path;

use idbridge_application::{FederationSettings, RbacConfiguration};
use idbridge_core::{AppError, AppResult, SubscriptionId};
use idbridge_domain::{AssignmentDeclaration, ProfileCatalog, RoleDefinitionCatalog, UserDeclaration};
use serde::Deserialize;

/// Declarative configuration document read from `IDBRIDGE_CONFIG_PATH`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigDocument {
    #[serde(alias = "subscriptionId")]
    pub subscription_id: Option<SubscriptionId>,
    #[serde(default)]
    pub users: Vec<UserDeclaration>,
    /// Presets added to or replacing the built-in profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Vec<AssignmentDeclaration>>,
    /// Role definition ids added to or replacing the built-in roles.
    #[serde(default)]
    pub roles: BTreeMap<String, String>,
    #[serde(default)]
    pub federation: Option<FederationSettings>,
}

impl ConfigDocument {
    pub async fn read(path: &Path) -> AppResult<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|error| {
            AppError::Validation(format!(
                "failed to read configuration '{}': {error}",
                path.display()
            ))
        })?;

        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw)
            .map_err(|error| AppError::Validation(format!("invalid configuration document: {error}")))
    }

    pub fn rbac_configuration(&self) -> AppResult<RbacConfiguration> {
        let subscription_id = self.subscription_id.clone().ok_or_else(|| {
            AppError::Validation("configuration requires 'subscription_id' for rbac".to_owned())
        })?;

        Ok(RbacConfiguration {
            subscription_id,
            users: self.users.clone(),
        })
    }

    pub fn federation_settings(&self) -> AppResult<&FederationSettings> {
        self.federation.as_ref().ok_or_else(|| {
            AppError::Validation("configuration requires a 'federation' section".to_owned())
        })
    }

    pub fn profile_catalog(&self) -> ProfileCatalog {
        ProfileCatalog::builtin().with_profiles(self.profiles.clone())
    }

    pub fn role_catalog(&self) -> RoleDefinitionCatalog {
        RoleDefinitionCatalog::builtin().with_roles(self.roles.clone())
    }
}
