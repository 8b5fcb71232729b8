use std::collections::BTreeMap;

use idbridge_core::{AppError, AppResult, SubscriptionId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Built-in role definition identifiers shipped with the management API.
pub const BUILTIN_ROLE_DEFINITIONS: &[(&str, &str)] = &[
    ("Owner", "8e3af657-a8ff-443c-a75c-2fe8c4bcb635"),
    ("Contributor", "b24988ac-6180-42a0-ab88-20f7382dd24c"),
    ("Reader", "acdd72a7-3385-48ef-bd42-f606fba81ae7"),
];

/// Resource-hierarchy level a role assignment applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// The whole subscription.
    #[default]
    Subscription,
    /// One resource group inside the subscription.
    #[serde(alias = "resourceGroup")]
    ResourceGroup,
    /// A single resource addressed by its full path.
    Resource,
}

impl ScopeKind {
    /// Returns the token used in configuration documents, e.g. `resourceGroup`.
    #[must_use]
    pub fn declared_name(&self) -> &'static str {
        match self {
            Self::Subscription => "subscription",
            Self::ResourceGroup => "resourceGroup",
            Self::Resource => "resource",
        }
    }
}

/// One desired role binding, as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentDeclaration {
    /// Role name resolved through the role definition catalog.
    #[serde(alias = "roleName")]
    pub role_name: String,
    /// Scope level of the assignment.
    #[serde(default, alias = "scopeType")]
    pub scope_type: ScopeKind,
    /// Resource group name, required for resource group scopes.
    #[serde(
        default,
        alias = "resourceGroupName",
        skip_serializing_if = "Option::is_none"
    )]
    pub resource_group_name: Option<String>,
    /// Full resource path, required for resource scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl AssignmentDeclaration {
    /// Declares a role at subscription scope.
    #[must_use]
    pub fn subscription(role_name: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            scope_type: ScopeKind::Subscription,
            resource_group_name: None,
            scope: None,
        }
    }

    /// Declares a role on one resource group.
    #[must_use]
    pub fn resource_group(
        role_name: impl Into<String>,
        resource_group_name: impl Into<String>,
    ) -> Self {
        Self {
            role_name: role_name.into(),
            scope_type: ScopeKind::ResourceGroup,
            resource_group_name: Some(resource_group_name.into()),
            scope: None,
        }
    }

    /// Declares a role on one resource addressed by its full path.
    #[must_use]
    pub fn resource(role_name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            role_name: role_name.into(),
            scope_type: ScopeKind::Resource,
            resource_group_name: None,
            scope: Some(scope.into()),
        }
    }

    /// Resolves the scope path this assignment applies to.
    ///
    /// `principal_identifier` only feeds the error message.
    pub fn resolve_scope(
        &self,
        subscription_id: &SubscriptionId,
        principal_identifier: &str,
    ) -> AppResult<String> {
        match self.scope_type {
            ScopeKind::Subscription => Ok(subscription_id.scope_path()),
            ScopeKind::ResourceGroup => {
                let resource_group_name = self
                    .resource_group_name
                    .as_deref()
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .ok_or_else(|| self.missing_parameter(principal_identifier, "resource_group_name"))?;

                Ok(format!(
                    "{}/resourceGroups/{resource_group_name}",
                    subscription_id.scope_path()
                ))
            }
            ScopeKind::Resource => self
                .scope
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
                .ok_or_else(|| self.missing_parameter(principal_identifier, "scope")),
        }
    }

    /// Returns the engine-facing logical name for this assignment.
    #[must_use]
    pub fn logical_name(&self, principal_identifier: &str) -> String {
        let mut segments = vec![
            "rbac".to_owned(),
            principal_identifier.replace(['@', '.'], "-"),
            self.role_name.to_lowercase(),
            self.scope_type.declared_name().to_owned(),
        ];

        if let Some(resource_group_name) = self
            .resource_group_name
            .as_deref()
            .filter(|value| !value.trim().is_empty())
        {
            segments.push(resource_group_name.trim().to_owned());
        }

        segments.join("-")
    }

    fn missing_parameter(&self, principal_identifier: &str, parameter: &str) -> AppError {
        AppError::MissingScopeParameter(format!(
            "user '{principal_identifier}' assignment with role '{}' has scope type '{}' but no '{parameter}'",
            self.role_name,
            self.scope_type.declared_name()
        ))
    }
}

/// Role-name to role-definition-identifier table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleDefinitionCatalog {
    roles: BTreeMap<String, String>,
}

impl RoleDefinitionCatalog {
    /// Creates a catalog from explicit role mappings.
    #[must_use]
    pub fn new(roles: BTreeMap<String, String>) -> Self {
        Self { roles }
    }

    /// Returns the catalog of built-in role definitions.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_ROLE_DEFINITIONS
                .iter()
                .map(|(name, guid)| ((*name).to_owned(), (*guid).to_owned()))
                .collect(),
        )
    }

    /// Returns a catalog with additional or overriding role mappings.
    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = (String, String)>) -> Self {
        self.roles.extend(roles);
        self
    }

    /// Returns the role definition identifier for a role name.
    #[must_use]
    pub fn role_guid(&self, role_name: &str) -> Option<&str> {
        self.roles.get(role_name).map(String::as_str)
    }

    /// Resolves the full role definition path for a role name.
    ///
    /// There is no dynamic lookup: a role missing from the catalog is a hard
    /// failure until it is added to the configuration.
    pub fn resolve_role_definition(
        &self,
        subscription_id: &SubscriptionId,
        role_name: &str,
    ) -> AppResult<String> {
        let guid = self.role_guid(role_name).ok_or_else(|| {
            AppError::UnknownRole(format!(
                "role '{role_name}' is not in the role definition catalog; add it to the 'roles' configuration"
            ))
        })?;

        Ok(format!(
            "{}/providers/Microsoft.Authorization/roleDefinitions/{guid}",
            subscription_id.scope_path()
        ))
    }
}

impl Default for RoleDefinitionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Deterministic role assignment name derived from principal, role and scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentKey(String);

impl AssignmentKey {
    /// Derives the key for one `(principal, role definition, scope)` triple.
    ///
    /// The first 16 bytes of a SHA-256 digest over the `|`-joined triple are
    /// formatted as an 8-4-4-4-12 lowercase hex identifier.
    #[must_use]
    pub fn derive(principal_id: &str, role_definition_id: &str, scope: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(principal_id.as_bytes());
        hasher.update(b"|");
        hasher.update(role_definition_id.as_bytes());
        hasher.update(b"|");
        hasher.update(scope.as_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0_u8; 16];
        bytes.copy_from_slice(&digest[..16]);

        Self(Uuid::from_bytes(bytes).hyphenated().to_string())
    }

    /// Returns the formatted key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for AssignmentKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Principal type sent with every role assignment declaration.
pub const USER_PRINCIPAL_TYPE: &str = "User";

/// Fully resolved role assignment ready for the provisioning engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAssignment {
    /// Declared principal identifier (login name).
    pub principal_identifier: String,
    /// Directory object id of the principal.
    pub principal_id: String,
    /// Principal type, always `User`.
    pub principal_type: String,
    /// Declared role name.
    pub role_name: String,
    /// Full role definition path.
    pub role_definition_id: String,
    /// Scope path the role applies to.
    pub scope: String,
    /// Deterministic role assignment name.
    pub assignment_key: AssignmentKey,
    /// Stable logical name for engines that key resources by name.
    pub logical_name: String,
}

#[cfg(test)]
mod tests {
    use idbridge_core::{AppError, SubscriptionId};
    use proptest::prelude::*;

    use super::{AssignmentDeclaration, AssignmentKey, RoleDefinitionCatalog, ScopeKind};

    fn subscription() -> SubscriptionId {
        SubscriptionId::new("sub1").unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn subscription_scope_resolves_to_root() {
        let scope = AssignmentDeclaration::subscription("Reader")
            .resolve_scope(&subscription(), "alice@example.com");
        assert_eq!(scope.ok().as_deref(), Some("/subscriptions/sub1"));
    }

    #[test]
    fn resource_group_scope_requires_name() {
        let mut declaration = AssignmentDeclaration::resource_group("Contributor", "rg-infra");
        let scope = declaration.resolve_scope(&subscription(), "alice@example.com");
        assert_eq!(
            scope.ok().as_deref(),
            Some("/subscriptions/sub1/resourceGroups/rg-infra")
        );

        declaration.resource_group_name = None;
        let result = declaration.resolve_scope(&subscription(), "alice@example.com");
        match result {
            Err(AppError::MissingScopeParameter(message)) => {
                assert!(message.contains("alice@example.com"));
                assert!(message.contains("Contributor"));
            }
            other => panic!("expected missing scope parameter, got {other:?}"),
        }
    }

    #[test]
    fn blank_resource_group_name_counts_as_missing() {
        let declaration = AssignmentDeclaration::resource_group("Reader", "  ");
        let result = declaration.resolve_scope(&subscription(), "bob@example.com");
        assert!(matches!(result, Err(AppError::MissingScopeParameter(_))));
    }

    #[test]
    fn resource_scope_is_used_verbatim() {
        let path = "/subscriptions/sub1/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/logs";
        let scope = AssignmentDeclaration::resource("Reader", path)
            .resolve_scope(&subscription(), "bob@example.com");
        assert_eq!(scope.ok().as_deref(), Some(path));

        let missing = AssignmentDeclaration {
            role_name: "Reader".to_owned(),
            scope_type: ScopeKind::Resource,
            resource_group_name: Some("ignored".to_owned()),
            scope: None,
        };
        assert!(matches!(
            missing.resolve_scope(&subscription(), "bob@example.com"),
            Err(AppError::MissingScopeParameter(_))
        ));
    }

    #[test]
    fn role_definition_path_uses_catalog_guid() {
        let path = RoleDefinitionCatalog::builtin()
            .resolve_role_definition(&subscription(), "Contributor");
        assert_eq!(
            path.ok().as_deref(),
            Some(
                "/subscriptions/sub1/providers/Microsoft.Authorization/roleDefinitions/b24988ac-6180-42a0-ab88-20f7382dd24c"
            )
        );
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result = RoleDefinitionCatalog::builtin()
            .resolve_role_definition(&subscription(), "Nonexistent");
        assert!(matches!(result, Err(AppError::UnknownRole(_))));
    }

    #[test]
    fn catalog_accepts_additional_roles() {
        let catalog = RoleDefinitionCatalog::builtin().with_roles([(
            "Storage Blob Data Reader".to_owned(),
            "2a2b9908-6ea1-4ae2-8e65-a410df84e7d1".to_owned(),
        )]);
        assert_eq!(
            catalog.role_guid("Storage Blob Data Reader"),
            Some("2a2b9908-6ea1-4ae2-8e65-a410df84e7d1")
        );
        assert!(catalog.role_guid("Owner").is_some());
    }

    #[test]
    fn scope_kind_defaults_to_subscription_and_accepts_camel_case() {
        let parsed: AssignmentDeclaration =
            serde_json::from_str(r#"{"roleName":"Reader","scopeType":"resourceGroup","resourceGroupName":"rg"}"#)
                .unwrap_or_else(|_| unreachable!());
        assert_eq!(parsed.scope_type, ScopeKind::ResourceGroup);

        let defaulted: AssignmentDeclaration =
            serde_json::from_str(r#"{"role_name":"Reader"}"#).unwrap_or_else(|_| unreachable!());
        assert_eq!(defaulted.scope_type, ScopeKind::Subscription);
    }

    #[test]
    fn logical_name_includes_resource_group() {
        let declaration = AssignmentDeclaration::resource_group("Contributor", "rg-infra");
        assert_eq!(
            declaration.logical_name("alice@example.com"),
            "rbac-alice-example-com-contributor-resourceGroup-rg-infra"
        );
    }

    #[test]
    fn logical_name_keeps_declared_scope_token_and_role_text() {
        assert_eq!(
            AssignmentDeclaration::subscription("Reader").logical_name("bob@example.com"),
            "rbac-bob-example-com-reader-subscription"
        );

        let resource = AssignmentDeclaration::resource(
            "Key Vault Reader",
            "/subscriptions/sub1/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv",
        );
        assert_eq!(
            resource.logical_name("bob@example.com"),
            "rbac-bob-example-com-key vault reader-resource"
        );

        let blank_group = AssignmentDeclaration::resource_group("Reader", "  ");
        assert_eq!(
            blank_group.logical_name("bob@example.com"),
            "rbac-bob-example-com-reader-resourceGroup"
        );
    }

    #[test]
    fn assignment_key_has_guid_shape() {
        let key = AssignmentKey::derive("p", "r", "s");
        let groups: Vec<usize> = key.as_str().split('-').map(str::len).collect();
        assert_eq!(groups, vec![8, 4, 4, 4, 12]);
        assert!(
            key.as_str()
                .chars()
                .all(|character| character == '-' || character.is_ascii_hexdigit())
        );
    }

    #[test]
    fn assignment_key_is_order_sensitive() {
        assert_ne!(
            AssignmentKey::derive("a", "b", "c"),
            AssignmentKey::derive("c", "b", "a")
        );
    }

    #[test]
    fn assignment_keys_do_not_collide_across_corpus() {
        let mut keys = std::collections::HashSet::new();
        let mut triples = 0_usize;

        for principal in 0..40 {
            for role in ["Owner", "Contributor", "Reader"] {
                for group in 0..25 {
                    let principal_id = format!("00000000-0000-0000-0000-{principal:012}");
                    let role_definition_id =
                        format!("/subscriptions/sub1/providers/Microsoft.Authorization/roleDefinitions/{role}");
                    let scope = format!("/subscriptions/sub1/resourceGroups/rg-{group}");
                    keys.insert(AssignmentKey::derive(&principal_id, &role_definition_id, &scope));
                    triples += 1;
                }
            }
        }

        assert_eq!(keys.len(), triples);
    }

    proptest! {
        #[test]
        fn assignment_key_is_deterministic(
            principal_id in "[a-f0-9-]{1,36}",
            role in "[A-Za-z/.-]{1,64}",
            scope in "[A-Za-z0-9/._-]{1,64}",
        ) {
            prop_assert_eq!(
                AssignmentKey::derive(&principal_id, &role, &scope),
                AssignmentKey::derive(&principal_id, &role, &scope)
            );
        }

        #[test]
        fn distinct_scopes_yield_distinct_keys(
            principal_id in "[a-f0-9]{8}",
            left in "[a-z0-9]{1,24}",
            right in "[a-z0-9]{1,24}",
        ) {
            prop_assume!(left != right);
            let role = "/subscriptions/sub1/providers/Microsoft.Authorization/roleDefinitions/reader";
            prop_assert_ne!(
                AssignmentKey::derive(&principal_id, role, &format!("/subscriptions/sub1/resourceGroups/{left}")),
                AssignmentKey::derive(&principal_id, role, &format!("/subscriptions/sub1/resourceGroups/{right}"))
            );
        }
    }
}
