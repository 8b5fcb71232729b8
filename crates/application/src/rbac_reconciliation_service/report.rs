use idbridge_domain::{AssignmentDeclaration, ResolvedAssignment};
use serde::Serialize;

/// Non-fatal condition recorded during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconciliationWarning {
    /// The declared profile is not in the catalog; no preset was applied.
    UnrecognizedProfile {
        /// Affected principal.
        principal_identifier: String,
        /// Declared profile name.
        profile: String,
    },
    /// The directory lookup failed and the principal was treated as missing.
    LookupFailedTreatedAsMissing {
        /// Affected principal.
        principal_identifier: String,
        /// Lookup error message.
        error: String,
    },
    /// A random initial credential was generated for a new principal.
    CredentialGenerated {
        /// Affected principal.
        principal_identifier: String,
    },
}

/// Outcome of reconciling one user declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserReconciliation {
    /// Declared principal identifier.
    pub principal_identifier: String,
    /// Resolved directory object id, absent for skipped users.
    pub principal_id: Option<String>,
    /// Resolved assignments in declaration order.
    pub assignments: Vec<ResolvedAssignment>,
    /// Warnings raised for this user.
    pub warnings: Vec<ReconciliationWarning>,
}

impl UserReconciliation {
    /// Returns whether the user was skipped for having no assignments.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.principal_id.is_none()
    }
}

/// Declared RBAC state of one user, for operators and auditors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagedRbacEntry {
    /// Declared principal identifier.
    pub upn: String,
    /// Declared profile name.
    pub profile: Option<String>,
    /// Merged, unresolved assignments.
    pub assignments: Vec<AssignmentDeclaration>,
}

/// Result of one full reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    /// Subscription the run was anchored at.
    pub subscription_id: String,
    /// Every resolved assignment, in user then declaration order.
    pub assignments: Vec<ResolvedAssignment>,
    /// Users skipped for having no assignments.
    pub skipped_users: Vec<String>,
    /// Warnings raised during the run.
    pub warnings: Vec<ReconciliationWarning>,
    /// Declared state summary.
    pub managed_rbac: Vec<ManagedRbacEntry>,
}
