//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod federation;
mod principal;
mod profile;
mod rbac;

pub use federation::{
    AppRegistration, AttributeMapper, ClientSecretDeclaration, DEFAULT_IDENTITY_PROVIDER_ALIAS,
    DEFAULT_SECURITY_GROUPS, FederationEndpoints, GRAPH_GROUP_READ_ALL_SCOPE_ID,
    GRAPH_USER_READ_SCOPE_ID, IdentityProviderDeclaration, MICROSOFT_GRAPH_APP_ID,
    RequiredResourceAccess, ResourceAccess, ResourceAccessType, SINGLE_TENANT_AUDIENCE,
    SecretLifetime, SecurityGroupDeclaration, ServicePrincipalDeclaration, broker_redirect_uri,
};
pub use principal::{NormalizedUser, PrincipalRecord, UserDeclaration};
pub use profile::{ProfileCatalog, ProfileExpansion, merge_assignments};
pub use rbac::{
    AssignmentDeclaration, AssignmentKey, BUILTIN_ROLE_DEFINITIONS, ResolvedAssignment,
    RoleDefinitionCatalog, ScopeKind, USER_PRINCIPAL_TYPE,
};
