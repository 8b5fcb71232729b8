//! Application services and ports.

#![forbid(unsafe_code)]

mod directory_ports;
mod federation_plan_service;
mod rbac_reconciliation_service;

pub use directory_ports::{CreatePrincipalInput, PrincipalDirectory, RoleAssignmentSink};
pub use federation_plan_service::{
    BrokerSettings, FederationPlan, FederationPlanService, FederationSettings,
};
pub use rbac_reconciliation_service::{
    CredentialPolicy, LookupFailurePolicy, ManagedRbacEntry, RbacConfiguration,
    RbacReconciliationService, ReconcilerOptions, ReconciliationReport, ReconciliationWarning,
    UserReconciliation,
};
