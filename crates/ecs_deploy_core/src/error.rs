use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Kind of cluster resource a lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Vpc,
    PrivateSubnet,
    SecurityGroup,
    LogStream,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vpc => "vpc",
            Self::PrivateSubnet => "private subnet",
            Self::SecurityGroup => "security group",
            Self::LogStream => "log stream",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every way a deployment run can fail.
///
/// None of these are recovered locally: the pipeline returns the first one it
/// hits and the remaining steps are skipped.
#[derive(Debug, Error)]
pub enum DeployError {
    /// A lookup matched nothing.
    #[error("{resource} not found: {detail}")]
    NotFound {
        resource: ResourceKind,
        detail: String,
    },

    /// A lookup matched several resources while unique resolution was required.
    #[error("{resource} lookup is ambiguous: {detail}")]
    Ambiguous {
        resource: ResourceKind,
        detail: String,
    },

    /// A provider call failed for any reason other than "not found".
    #[error("{operation} failed: {message}")]
    Dependency { operation: String, message: String },

    /// The failure detector flagged the migration task.
    #[error("Migration failed: \n{log_text}")]
    MigrationFailed { task_id: String, log_text: String },

    /// The launched tasks were still running when the wait deadline passed.
    #[error("tasks [{}] did not stop within {}s", task_ids.join(", "), waited.as_secs())]
    WaitTimedOut {
        task_ids: Vec<String>,
        waited: Duration,
    },

    /// The run was interrupted while waiting for the tasks to stop.
    #[error("cancelled while waiting for tasks [{}]", task_ids.join(", "))]
    Cancelled { task_ids: Vec<String> },

    /// Region or prefix was missing or blank.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DeployError {
    pub fn not_found(resource: ResourceKind, detail: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            detail: detail.into(),
        }
    }

    pub fn ambiguous(resource: ResourceKind, detail: impl Into<String>) -> Self {
        Self::Ambiguous {
            resource,
            detail: detail.into(),
        }
    }

    pub fn dependency(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dependency {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Short machine-friendly code, used in status annotations and run reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Ambiguous { .. } => "ambiguous",
            Self::Dependency { .. } => "dependency_error",
            Self::MigrationFailed { .. } => "migration_failed",
            Self::WaitTimedOut { .. } => "wait_timed_out",
            Self::Cancelled { .. } => "cancelled",
            Self::Config(_) => "config_error",
        }
    }
}
