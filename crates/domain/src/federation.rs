//! Declarative resources federating the cloud tenant with the identity broker.

use std::collections::HashSet;

use chrono::{DateTime, Days, Months, TimeDelta, Utc};
use idbridge_core::{AppError, AppResult, DirectoryTenantId, NonEmptyString};
use serde::{Deserialize, Serialize};

/// Well-known application id of Microsoft Graph.
pub const MICROSOFT_GRAPH_APP_ID: &str = "00000003-0000-0000-c000-000000000000";

/// Delegated `User.Read` permission id.
pub const GRAPH_USER_READ_SCOPE_ID: &str = "e1fe6dd8-ba31-4d61-89e7-88639da4683d";

/// Delegated `Group.Read.All` permission id.
pub const GRAPH_GROUP_READ_ALL_SCOPE_ID: &str = "5f8c59db-677d-491f-a6b8-5f174b11ec1d";

/// Single-tenant sign-in audience.
pub const SINGLE_TENANT_AUDIENCE: &str = "AzureADMyOrg";

/// Security groups created for cluster RBAC when none are configured.
pub const DEFAULT_SECURITY_GROUPS: &[&str] = &[
    "cluster-admins",
    "read-only",
    "namespace-admins",
    "security-team",
    "observability",
    "platform-team",
    "k8s-ops",
];

/// Alias of the broker identity provider pointing at the cloud tenant.
pub const DEFAULT_IDENTITY_PROVIDER_ALIAS: &str = "microsoft-entra";

const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
const GRAPH_USER_INFO_URL: &str = "https://graph.microsoft.com/oidc/userinfo";

/// Validity period of the application client secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretLifetime {
    /// Calendar years.
    Years(u32),
    /// Calendar months.
    Months(u32),
    /// Days.
    Days(u32),
    /// Hours.
    Hours(u32),
}

impl SecretLifetime {
    /// Parses `"2 years"`, `"6 months"`, `"90 days"` or `"17520h"`.
    pub fn parse(value: &str) -> AppResult<Self> {
        let normalized = value.trim().to_lowercase();
        let invalid = || {
            AppError::Validation(format!(
                "secret lifetime '{value}' must look like '2 years', '6 months', '90 days' or '17520h'"
            ))
        };

        let digits_end = normalized
            .find(|character: char| !character.is_ascii_digit())
            .unwrap_or(normalized.len());
        let (amount, unit) = normalized.split_at(digits_end);
        let amount = amount.parse::<u32>().map_err(|_| invalid())?;

        if amount == 0 {
            return Err(AppError::Validation(format!(
                "secret lifetime '{value}' must be greater than zero"
            )));
        }

        match unit.trim() {
            "h" | "hour" | "hours" => Ok(Self::Hours(amount)),
            "day" | "days" => Ok(Self::Days(amount)),
            "month" | "months" => Ok(Self::Months(amount)),
            "year" | "years" => Ok(Self::Years(amount)),
            _ => Err(invalid()),
        }
    }

    /// Returns the secret expiry relative to `now`.
    pub fn end_date(&self, now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
        let end_date = match *self {
            Self::Years(years) => years
                .checked_mul(12)
                .and_then(|months| now.checked_add_months(Months::new(months))),
            Self::Months(months) => now.checked_add_months(Months::new(months)),
            Self::Days(days) => now.checked_add_days(Days::new(u64::from(days))),
            Self::Hours(hours) => {
                TimeDelta::try_hours(i64::from(hours)).and_then(|delta| now.checked_add_signed(delta))
            }
        };

        end_date.ok_or_else(|| {
            AppError::Validation(format!("secret lifetime {self:?} overflows the calendar"))
        })
    }
}

impl Default for SecretLifetime {
    fn default() -> Self {
        Self::Years(2)
    }
}

/// Kind of permission requested from a resource application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceAccessType {
    /// Delegated permission.
    Scope,
    /// Application permission.
    Role,
}

/// One permission requested from a resource application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAccess {
    /// Permission id.
    pub id: String,
    /// Permission kind.
    #[serde(rename = "type")]
    pub access_type: ResourceAccessType,
}

/// Permissions requested from one resource application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredResourceAccess {
    /// Resource application id.
    pub resource_app_id: String,
    /// Requested permissions.
    pub resource_accesses: Vec<ResourceAccess>,
}

impl RequiredResourceAccess {
    /// Returns the Microsoft Graph permissions the broker needs to read users and groups.
    #[must_use]
    pub fn microsoft_graph_for_broker() -> Self {
        Self {
            resource_app_id: MICROSOFT_GRAPH_APP_ID.to_owned(),
            resource_accesses: vec![
                ResourceAccess {
                    id: GRAPH_USER_READ_SCOPE_ID.to_owned(),
                    access_type: ResourceAccessType::Scope,
                },
                ResourceAccess {
                    id: GRAPH_GROUP_READ_ALL_SCOPE_ID.to_owned(),
                    access_type: ResourceAccessType::Scope,
                },
            ],
        }
    }
}

/// Application registration representing the broker in the cloud tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRegistration {
    /// Application display name.
    pub display_name: String,
    /// Sign-in audience.
    pub sign_in_audience: String,
    /// Web redirect URIs.
    pub redirect_uris: Vec<String>,
    /// Group claim kinds emitted in tokens.
    pub group_membership_claims: Vec<String>,
    /// API permissions requested by the application.
    pub required_resource_accesses: Vec<RequiredResourceAccess>,
}

impl AppRegistration {
    /// Creates a single-tenant registration for the broker.
    pub fn for_broker(display_name: &str, redirect_uri: Option<&str>) -> AppResult<Self> {
        let display_name = NonEmptyString::new(display_name.trim())?;

        Ok(Self {
            display_name: display_name.into(),
            sign_in_audience: SINGLE_TENANT_AUDIENCE.to_owned(),
            redirect_uris: redirect_uri
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(|value| vec![value.to_owned()])
                .unwrap_or_default(),
            group_membership_claims: vec!["SecurityGroup".to_owned()],
            required_resource_accesses: vec![RequiredResourceAccess::microsoft_graph_for_broker()],
        })
    }
}

/// Service principal instantiating the application in the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePrincipalDeclaration {
    /// Display name of the backing application.
    pub application_display_name: String,
}

/// Client secret attached to the application registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecretDeclaration {
    /// Secret display name.
    pub display_name: String,
    /// Secret expiry.
    pub end_date: DateTime<Utc>,
}

/// Security group created in the cloud tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupDeclaration {
    /// Group display name.
    pub display_name: String,
    /// Group is usable for access control.
    pub security_enabled: bool,
    /// Group has a mailbox.
    pub mail_enabled: bool,
}

impl SecurityGroupDeclaration {
    /// Creates security-enabled, mail-disabled groups, rejecting duplicates.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> AppResult<Vec<Self>> {
        let mut seen = HashSet::new();
        let mut groups = Vec::new();

        for name in names {
            let display_name = NonEmptyString::new(name.trim())?;
            if !seen.insert(display_name.as_str().to_lowercase()) {
                return Err(AppError::Validation(format!(
                    "security group '{}' is declared more than once",
                    display_name.as_str()
                )));
            }

            groups.push(Self {
                display_name: display_name.into(),
                security_enabled: true,
                mail_enabled: false,
            });
        }

        Ok(groups)
    }
}

/// OpenID Connect endpoints of the cloud tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationEndpoints {
    /// Authorization endpoint.
    pub authorization_url: String,
    /// Token endpoint.
    pub token_url: String,
    /// User info endpoint.
    pub user_info_url: String,
    /// Token issuer.
    pub issuer: String,
    /// Discovery document URL.
    pub discovery_url: String,
}

impl FederationEndpoints {
    /// Builds the v2.0 endpoints for one tenant.
    #[must_use]
    pub fn for_tenant(tenant_id: DirectoryTenantId) -> Self {
        let issuer = format!("{LOGIN_BASE_URL}/{tenant_id}/v2.0");

        Self {
            authorization_url: format!("{LOGIN_BASE_URL}/{tenant_id}/oauth2/v2.0/authorize"),
            token_url: format!("{LOGIN_BASE_URL}/{tenant_id}/oauth2/v2.0/token"),
            user_info_url: GRAPH_USER_INFO_URL.to_owned(),
            discovery_url: format!("{issuer}/.well-known/openid-configuration"),
            issuer,
        }
    }
}

/// Claim-to-attribute mapper on the broker identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMapper {
    /// Mapper name.
    pub name: String,
    /// Source token claim.
    pub claim_name: String,
    /// Target broker user attribute.
    pub user_attribute: String,
}

impl AttributeMapper {
    fn new(name: &str, claim_name: &str, user_attribute: &str) -> Self {
        Self {
            name: name.to_owned(),
            claim_name: claim_name.to_owned(),
            user_attribute: user_attribute.to_owned(),
        }
    }

    /// Returns the name, email and surname mappers.
    #[must_use]
    pub fn standard_set() -> Vec<Self> {
        vec![
            Self::new("Import Name", "name", "firstName"),
            Self::new("Import Email", "email", "email"),
            Self::new("Import Surname", "family_name", "lastName"),
        ]
    }
}

/// OIDC identity provider declared in the broker realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProviderDeclaration {
    /// Broker realm id.
    pub realm: String,
    /// Provider alias, also part of the broker redirect URI.
    pub alias: String,
    /// Login button label.
    pub display_name: String,
    /// Application (client) id in the cloud tenant.
    pub client_id: String,
    /// Name of the plan output holding the client secret.
    pub client_secret_output: String,
    /// Tenant endpoints.
    pub endpoints: FederationEndpoints,
    /// Space-separated default scopes.
    pub default_scopes: String,
    /// Whether the broker stores upstream tokens.
    pub store_token: bool,
    /// Whether new users get the read-token role.
    pub add_read_token_role_on_create: bool,
    /// Whether upstream email addresses are trusted as verified.
    pub trust_email: bool,
    /// Claim mappers.
    pub mappers: Vec<AttributeMapper>,
}

impl IdentityProviderDeclaration {
    /// Creates the tenant-backed identity provider for a realm.
    pub fn for_tenant(
        realm: &str,
        client_id: &str,
        client_secret_output: &str,
        endpoints: FederationEndpoints,
    ) -> AppResult<Self> {
        Ok(Self {
            realm: NonEmptyString::new(realm.trim())?.into(),
            alias: DEFAULT_IDENTITY_PROVIDER_ALIAS.to_owned(),
            display_name: "Login with Microsoft".to_owned(),
            client_id: NonEmptyString::new(client_id.trim())?.into(),
            client_secret_output: client_secret_output.to_owned(),
            endpoints,
            default_scopes: "openid profile email".to_owned(),
            store_token: false,
            add_read_token_role_on_create: false,
            trust_email: true,
            mappers: AttributeMapper::standard_set(),
        })
    }

    /// Returns the broker endpoint the tenant redirects back to.
    #[must_use]
    pub fn broker_redirect_uri(&self, broker_base_url: &str) -> String {
        broker_redirect_uri(broker_base_url, &self.realm, &self.alias)
    }
}

/// Returns `{base}/realms/{realm}/broker/{alias}/endpoint`.
#[must_use]
pub fn broker_redirect_uri(broker_base_url: &str, realm: &str, alias: &str) -> String {
    format!(
        "{}/realms/{}/broker/{}/endpoint",
        broker_base_url.trim().trim_end_matches('/'),
        realm.trim(),
        alias
    )
}
