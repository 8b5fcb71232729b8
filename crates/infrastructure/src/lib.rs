//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod arm_role_assignment_sink;
mod graph_principal_directory;
mod in_memory_principal_directory;
mod recording_role_assignment_sink;

pub use arm_role_assignment_sink::ArmRoleAssignmentSink;
pub use graph_principal_directory::GraphPrincipalDirectory;
pub use in_memory_principal_directory::InMemoryPrincipalDirectory;
pub use recording_role_assignment_sink::RecordingRoleAssignmentSink;
