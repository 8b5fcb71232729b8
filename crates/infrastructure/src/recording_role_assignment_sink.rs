use async_trait::async_trait;
use idbridge_application::RoleAssignmentSink;
use idbridge_core::AppResult;
use idbridge_domain::ResolvedAssignment;
use tokio::sync::Mutex;
use tracing::debug;

/// Sink that records declared assignments without provisioning them.
#[derive(Debug, Default)]
pub struct RecordingRoleAssignmentSink {
    declared: Mutex<Vec<ResolvedAssignment>>,
}

impl RecordingRoleAssignmentSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every assignment declared so far, in declaration order.
    pub async fn declared(&self) -> Vec<ResolvedAssignment> {
        self.declared.lock().await.clone()
    }
}

#[async_trait]
impl RoleAssignmentSink for RecordingRoleAssignmentSink {
    async fn declare(&self, assignment: &ResolvedAssignment) -> AppResult<()> {
        debug!(
            logical_name = %assignment.logical_name,
            assignment_key = %assignment.assignment_key,
            "recorded role assignment"
        );
        self.declared.lock().await.push(assignment.clone());
        Ok(())
    }
}
