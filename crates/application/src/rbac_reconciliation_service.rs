//! Role-assignment reconciliation.
//!
//! Maps declared users, profiles and explicit assignments onto a deterministic
//! set of role assignments. Every evaluation recomputes the full set; diffing
//! against live state is left to the provisioning engine behind the sink.

use std::collections::HashSet;
use std::sync::Arc;

use idbridge_core::{AppError, AppResult, SubscriptionId};
use idbridge_domain::{
    AssignmentDeclaration, AssignmentKey, ProfileCatalog, ProfileExpansion, ResolvedAssignment,
    RoleDefinitionCatalog, USER_PRINCIPAL_TYPE, UserDeclaration, merge_assignments,
};
use tracing::{info, warn};

use crate::directory_ports::{PrincipalDirectory, RoleAssignmentSink};

mod config;
mod principal;
mod report;


pub use config::{CredentialPolicy, LookupFailurePolicy, RbacConfiguration, ReconcilerOptions};
pub use report::{
    ManagedRbacEntry, ReconciliationReport, ReconciliationWarning, UserReconciliation,
};

/// Application service reconciling declared users into role assignments.
#[derive(Clone)]
pub struct RbacReconciliationService {
    directory: Arc<dyn PrincipalDirectory>,
    sink: Arc<dyn RoleAssignmentSink>,
    profiles: ProfileCatalog,
    roles: RoleDefinitionCatalog,
    options: ReconcilerOptions,
}

impl RbacReconciliationService {
    /// Creates a reconciler from its ports and injected catalogs.
    #[must_use]
    pub fn new(
        directory: Arc<dyn PrincipalDirectory>,
        sink: Arc<dyn RoleAssignmentSink>,
        profiles: ProfileCatalog,
        roles: RoleDefinitionCatalog,
        options: ReconcilerOptions,
    ) -> Self {
        Self {
            directory,
            sink,
            profiles,
            roles,
            options,
        }
    }

    /// Expands a profile name into its preset assignments.
    ///
    /// Absent or empty names yield nothing. Unknown names yield nothing and
    /// record exactly one `UnrecognizedProfile` warning.
    pub fn expand_profile(
        &self,
        principal_identifier: &str,
        profile: Option<&str>,
        warnings: &mut Vec<ReconciliationWarning>,
    ) -> Vec<AssignmentDeclaration> {
        match self.profiles.expand(profile) {
            ProfileExpansion::Unrecognized(profile) => {
                warn!(
                    principal = %principal_identifier,
                    profile = %profile,
                    "unknown RBAC profile, no preset assignments will be applied"
                );
                warnings.push(ReconciliationWarning::UnrecognizedProfile {
                    principal_identifier: principal_identifier.to_owned(),
                    profile,
                });
                Vec::new()
            }
            expansion => expansion.into_assignments(),
        }
    }

    /// Resolves the scope path of one assignment.
    pub fn resolve_scope(
        &self,
        subscription_id: &SubscriptionId,
        principal_identifier: &str,
        assignment: &AssignmentDeclaration,
    ) -> AppResult<String> {
        assignment.resolve_scope(subscription_id, principal_identifier)
    }

    /// Resolves the role definition path of a role name.
    pub fn resolve_role_definition(
        &self,
        subscription_id: &SubscriptionId,
        role_name: &str,
    ) -> AppResult<String> {
        self.roles.resolve_role_definition(subscription_id, role_name)
    }

    /// Derives the deterministic assignment key of one triple.
    #[must_use]
    pub fn derive_assignment_key(
        principal_id: &str,
        role_definition_id: &str,
        scope: &str,
    ) -> AssignmentKey {
        AssignmentKey::derive(principal_id, role_definition_id, scope)
    }

    /// Reconciles one user declaration and declares its assignments.
    ///
    /// Scopes and role definitions are validated before the directory is
    /// touched, so a malformed declaration never creates a principal.
    pub async fn reconcile_user(
        &self,
        subscription_id: &SubscriptionId,
        declaration: &UserDeclaration,
    ) -> AppResult<UserReconciliation> {
        let user = declaration.normalize()?;
        let mut warnings = Vec::new();

        let preset = self.expand_profile(
            &user.principal_identifier,
            user.profile.as_deref(),
            &mut warnings,
        );
        let assignments = merge_assignments(preset, &user.assignments);

        if assignments.is_empty() {
            warn!(
                principal = %user.principal_identifier,
                "user has no assignments after profile and explicit merge; skipping"
            );
            return Ok(UserReconciliation {
                principal_identifier: user.principal_identifier,
                principal_id: None,
                assignments: Vec::new(),
                warnings,
            });
        }

        let targets = assignments
            .iter()
            .map(|assignment| -> AppResult<_> {
                let scope =
                    self.resolve_scope(subscription_id, &user.principal_identifier, assignment)?;
                let role_definition_id =
                    self.resolve_role_definition(subscription_id, &assignment.role_name)?;
                Ok((assignment, role_definition_id, scope))
            })
            .collect::<AppResult<Vec<_>>>()?;

        let principal_id = self
            .resolve_or_create_principal(&user, &mut warnings)
            .await?;

        let resolved: Vec<ResolvedAssignment> = targets
            .into_iter()
            .map(|(assignment, role_definition_id, scope)| ResolvedAssignment {
                principal_identifier: user.principal_identifier.clone(),
                principal_id: principal_id.clone(),
                principal_type: USER_PRINCIPAL_TYPE.to_owned(),
                role_name: assignment.role_name.clone(),
                assignment_key: Self::derive_assignment_key(
                    &principal_id,
                    &role_definition_id,
                    &scope,
                ),
                logical_name: assignment.logical_name(&user.principal_identifier),
                role_definition_id,
                scope,
            })
            .collect();

        for assignment in &resolved {
            self.sink.declare(assignment).await?;
        }

        info!(
            principal = %user.principal_identifier,
            principal_id = %principal_id,
            assignment_count = resolved.len(),
            "declared role assignments for user"
        );

        Ok(UserReconciliation {
            principal_identifier: user.principal_identifier,
            principal_id: Some(principal_id),
            assignments: resolved,
            warnings,
        })
    }

    /// Reconciles every declared user in order.
    ///
    /// The first failing user aborts the run. Users declared before it stay
    /// declared; there is no rollback.
    pub async fn reconcile(
        &self,
        configuration: &RbacConfiguration,
    ) -> AppResult<ReconciliationReport> {
        ensure_unique_principals(&configuration.users)?;

        let mut report = ReconciliationReport {
            subscription_id: configuration.subscription_id.to_string(),
            assignments: Vec::new(),
            skipped_users: Vec::new(),
            warnings: Vec::new(),
            managed_rbac: self.managed_rbac(configuration),
        };

        for declaration in &configuration.users {
            let outcome = self
                .reconcile_user(&configuration.subscription_id, declaration)
                .await?;

            if outcome.is_skipped() {
                report.skipped_users.push(outcome.principal_identifier);
            }
            report.assignments.extend(outcome.assignments);
            report.warnings.extend(outcome.warnings);
        }

        info!(
            subscription_id = %configuration.subscription_id,
            users = configuration.users.len(),
            assignments = report.assignments.len(),
            skipped = report.skipped_users.len(),
            warnings = report.warnings.len(),
            "RBAC reconciliation finished"
        );

        Ok(report)
    }

    /// Summarizes declared state per user, skipped users included.
    #[must_use]
    pub fn managed_rbac(&self, configuration: &RbacConfiguration) -> Vec<ManagedRbacEntry> {
        configuration
            .users
            .iter()
            .map(|user| ManagedRbacEntry {
                upn: user.principal_identifier.clone(),
                profile: user.profile.clone(),
                assignments: merge_assignments(
                    self.profiles.expand(user.profile.as_deref()).into_assignments(),
                    &user.assignments,
                ),
            })
            .collect()
    }
}

fn ensure_unique_principals(users: &[UserDeclaration]) -> AppResult<()> {
    let mut seen = HashSet::new();

    for user in users {
        let key = user.principal_identifier.trim().to_lowercase();
        if !seen.insert(key) {
            return Err(AppError::Validation(format!(
                "user '{}' is declared more than once",
                user.principal_identifier.trim()
            )));
        }
    }

    Ok(())
}
