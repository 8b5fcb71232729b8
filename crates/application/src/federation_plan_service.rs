//! Federation planning between the cloud tenant and the identity broker.

use chrono::{DateTime, Utc};
use idbridge_core::{AppResult, DirectoryTenantId};
use idbridge_domain::{
    AppRegistration, ClientSecretDeclaration, DEFAULT_IDENTITY_PROVIDER_ALIAS,
    DEFAULT_SECURITY_GROUPS, FederationEndpoints, IdentityProviderDeclaration, SecretLifetime,
    SecurityGroupDeclaration, ServicePrincipalDeclaration, broker_redirect_uri,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const DEFAULT_APP_NAME: &str = "openCenter-idp-integration";
const DEFAULT_SECRET_LIFETIME: &str = "2 years";
const CLIENT_SECRET_DISPLAY_NAME: &str = "Keycloak Secret";
const CLIENT_SECRET_REFERENCE: &str = "client_secret.value";

/// Identity broker coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerSettings {
    /// Public base URL of the broker.
    pub base_url: String,
    /// Realm the identity provider is registered in.
    pub realm_id: String,
    /// Application client id issued by the tenant, once known.
    #[serde(default)]
    pub client_id: Option<String>,
}

/// Declared federation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationSettings {
    /// Directory tenant the broker federates with.
    pub tenant_id: DirectoryTenantId,
    /// App registration display name.
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Explicit redirect URI; defaults to the broker endpoint.
    #[serde(default)]
    pub redirect_uri: Option<String>,
    /// Client secret lifetime, e.g. `2 years` or `17520h`.
    #[serde(default = "default_secret_lifetime")]
    pub secret_lifetime: String,
    /// Security group names.
    #[serde(default = "default_security_groups")]
    pub security_groups: Vec<String>,
    /// Broker coordinates.
    pub broker: BrokerSettings,
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_owned()
}

fn default_secret_lifetime() -> String {
    DEFAULT_SECRET_LIFETIME.to_owned()
}

fn default_security_groups() -> Vec<String> {
    DEFAULT_SECURITY_GROUPS
        .iter()
        .map(|name| (*name).to_owned())
        .collect()
}

/// Declarative resources federating the tenant with the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FederationPlan {
    /// Tenant-side application.
    pub app_registration: AppRegistration,
    /// Service principal bound to the application.
    pub service_principal: ServicePrincipalDeclaration,
    /// Client secret with its computed expiry.
    pub client_secret: ClientSecretDeclaration,
    /// Security groups surfaced as group claims.
    pub security_groups: Vec<SecurityGroupDeclaration>,
    /// Tenant OIDC endpoints.
    pub endpoints: FederationEndpoints,
    /// Broker identity provider, planned once a client id is known.
    pub identity_provider: Option<IdentityProviderDeclaration>,
    /// Endpoint the tenant redirects back to.
    pub broker_redirect_uri: String,
    /// Non-fatal planning notes.
    pub warnings: Vec<String>,
}

/// Application service composing federation plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct FederationPlanService;

impl FederationPlanService {
    /// Creates a planner.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Composes the full federation plan for `settings` as of `now`.
    pub fn plan(
        &self,
        settings: &FederationSettings,
        now: DateTime<Utc>,
    ) -> AppResult<FederationPlan> {
        let lifetime = SecretLifetime::parse(&settings.secret_lifetime)?;
        let endpoints = FederationEndpoints::for_tenant(settings.tenant_id);
        let broker_redirect_uri = broker_redirect_uri(
            &settings.broker.base_url,
            &settings.broker.realm_id,
            DEFAULT_IDENTITY_PROVIDER_ALIAS,
        );

        let redirect_uri = settings
            .redirect_uri
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(broker_redirect_uri.as_str());
        let app_registration = AppRegistration::for_broker(&settings.app_name, Some(redirect_uri))?;

        let security_groups =
            SecurityGroupDeclaration::from_names(settings.security_groups.iter().map(String::as_str))?;

        let mut warnings = Vec::new();
        let identity_provider = match settings
            .broker
            .client_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            Some(client_id) => Some(IdentityProviderDeclaration::for_tenant(
                &settings.broker.realm_id,
                client_id,
                CLIENT_SECRET_REFERENCE,
                endpoints.clone(),
            )?),
            None => {
                warn!(
                    realm = %settings.broker.realm_id,
                    "broker client id not set; identity provider left out of the plan"
                );
                warnings.push(
                    "broker.client_id is not set; apply the app registration first, then re-plan with its client id"
                        .to_owned(),
                );
                None
            }
        };

        let plan = FederationPlan {
            service_principal: ServicePrincipalDeclaration {
                application_display_name: app_registration.display_name.clone(),
            },
            client_secret: ClientSecretDeclaration {
                display_name: CLIENT_SECRET_DISPLAY_NAME.to_owned(),
                end_date: lifetime.end_date(now)?,
            },
            app_registration,
            security_groups,
            endpoints,
            identity_provider,
            broker_redirect_uri,
            warnings,
        };

        info!(
            tenant_id = %settings.tenant_id,
            app_name = %plan.app_registration.display_name,
            security_groups = plan.security_groups.len(),
            identity_provider = plan.identity_provider.is_some(),
            "federation plan composed"
        );

        Ok(plan)
    }
}
