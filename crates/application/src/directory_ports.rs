use async_trait::async_trait;

use idbridge_core::AppResult;
use idbridge_domain::{PrincipalRecord, ResolvedAssignment};

/// Input payload for creating a user principal in the directory.
#[derive(Clone, PartialEq, Eq)]
pub struct CreatePrincipalInput {
    /// Login name of the new principal.
    pub principal_identifier: String,
    /// Display name.
    pub display_name: String,
    /// Mail alias.
    pub mail_nickname: String,
    /// Initial credential.
    pub password: String,
    /// Whether the account is enabled on creation.
    pub account_enabled: bool,
    /// Whether later evaluations must leave the credential untouched.
    pub credential_immutable: bool,
}

impl std::fmt::Debug for CreatePrincipalInput {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CreatePrincipalInput")
            .field("principal_identifier", &self.principal_identifier)
            .field("display_name", &self.display_name)
            .field("mail_nickname", &self.mail_nickname)
            .field("password", &"<redacted>")
            .field("account_enabled", &self.account_enabled)
            .field("credential_immutable", &self.credential_immutable)
            .finish()
    }
}

/// Directory port for principal lookup and creation.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// Finds an existing principal by login name.
    async fn find_principal(&self, principal_identifier: &str)
    -> AppResult<Option<PrincipalRecord>>;

    /// Creates a new principal and returns its directory record.
    async fn create_principal(&self, input: CreatePrincipalInput) -> AppResult<PrincipalRecord>;
}

/// Port receiving resolved role assignments for the provisioning engine.
#[async_trait]
pub trait RoleAssignmentSink: Send + Sync {
    /// Declares one role assignment.
    ///
    /// Implementations must be idempotent on `assignment_key`.
    async fn declare(&self, assignment: &ResolvedAssignment) -> AppResult<()>;
}
