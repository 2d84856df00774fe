//! One-shot migration task: launch, wait for it to stop, read its log and
//! classify the result.

use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::DeployError;
use crate::failure::{FailureDetector, MigrationEvidence};
use crate::network::NetworkContext;
use crate::params::{
    migration_log_stream, DeploymentParameters, DEFAULT_LOG_STREAM_PREFIX,
    MIGRATION_TASK_STARTED_BY,
};
use crate::poll::{CancelFlag, PollPolicy};

pub const STOPPED_STATUS: &str = "STOPPED";
const MISSING_STATUS: &str = "MISSING";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLaunchRequest {
    pub cluster: String,
    pub task_definition: String,
    pub container: String,
    pub started_by: String,
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
    pub assign_public_ip: bool,
}

impl TaskLaunchRequest {
    pub fn for_migration(params: &DeploymentParameters, network: &NetworkContext) -> Self {
        Self {
            cluster: params.cluster().to_string(),
            task_definition: params.migration_task_definition().to_string(),
            container: params.container().to_string(),
            started_by: MIGRATION_TASK_STARTED_BY.to_string(),
            subnet_ids: network.private_subnet_ids().iter().cloned().collect(),
            security_group_ids: vec![network.security_group_id().to_string()],
            assign_public_ip: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskHandle {
    pub task_arn: String,
    pub task_id: String,
}

impl TaskHandle {
    pub fn from_arn(task_arn: impl Into<String>) -> Self {
        let task_arn = task_arn.into();
        let task_id = task_id_from_arn(&task_arn).to_string();
        Self { task_arn, task_id }
    }
}

/// Last `/`-separated segment of a task ARN.
pub fn task_id_from_arn(task_arn: &str) -> &str {
    task_arn.rsplit('/').next().unwrap_or(task_arn)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerExit {
    pub name: String,
    pub exit_code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    pub task_id: String,
    pub last_status: String,
    pub stopped_reason: Option<String>,
    pub containers: Vec<ContainerExit>,
}

impl TaskStatus {
    pub fn is_stopped(&self) -> bool {
        self.last_status == STOPPED_STATUS
    }

    pub fn exit_code_of(&self, container: &str) -> Option<i32> {
        self.containers
            .iter()
            .find(|exit| exit.name == container)
            .and_then(|exit| exit.exit_code)
    }
}

pub trait TaskRunner {
    fn run_task(&self, request: &TaskLaunchRequest) -> Result<Vec<TaskHandle>, DeployError>;

    fn describe_tasks(
        &self,
        cluster: &str,
        task_ids: &[String],
    ) -> Result<Vec<TaskStatus>, DeployError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPage {
    pub lines: Vec<String>,
    pub next_forward_token: Option<String>,
}

pub trait LogReader {
    /// Reads one page of a stream from its head; `token` is the forward token
    /// returned by the previous page.
    fn read_page(
        &self,
        log_group: &str,
        log_stream: &str,
        token: Option<&str>,
    ) -> Result<LogPage, DeployError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Launched,
    Polling,
    Stopped,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Launched => "launched",
            Self::Polling => "polling",
            Self::Stopped => "stopped",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationOutcome {
    pub succeeded: bool,
    pub task_id: String,
    pub exit_code: Option<i32>,
    pub log_lines: Vec<String>,
}

impl MigrationOutcome {
    pub fn log_text(&self) -> String {
        self.log_lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSettings {
    pub poll: PollPolicy,
    pub log_stream_prefix: String,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            poll: PollPolicy::default(),
            log_stream_prefix: DEFAULT_LOG_STREAM_PREFIX.to_string(),
        }
    }
}

pub struct MigrationRunner<'a> {
    tasks: &'a dyn TaskRunner,
    logs: &'a dyn LogReader,
    detector: &'a dyn FailureDetector,
    settings: MigrationSettings,
    cancel: CancelFlag,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(
        tasks: &'a dyn TaskRunner,
        logs: &'a dyn LogReader,
        detector: &'a dyn FailureDetector,
        settings: MigrationSettings,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            tasks,
            logs,
            detector,
            settings,
            cancel,
        }
    }

    pub fn run_and_await(
        &self,
        network: &NetworkContext,
        params: &DeploymentParameters,
    ) -> Result<MigrationOutcome, DeployError> {
        let request = TaskLaunchRequest::for_migration(params, network);
        let handles = self.tasks.run_task(&request)?;
        let Some(first) = handles.first() else {
            return Err(DeployError::dependency(
                "ecs:RunTask",
                format!(
                    "no task was started for task definition {}",
                    request.task_definition
                ),
            ));
        };
        let task_ids: Vec<String> = handles.iter().map(|h| h.task_id.clone()).collect();
        log_transition(&task_ids, TaskState::Launched);
        debug!(task_ids = ?task_ids, "db migration task started");

        let statuses = self.wait_until_stopped(params.cluster(), &task_ids)?;
        log_transition(&task_ids, TaskState::Stopped);

        let exit_code = statuses
            .iter()
            .find(|status| status.task_id == first.task_id)
            .and_then(|status| status.exit_code_of(params.container()));

        let log_stream = migration_log_stream(
            &self.settings.log_stream_prefix,
            params.container(),
            &first.task_id,
        );
        let log_lines = self.read_full_log(params.log_group(), &log_stream)?;

        let evidence = MigrationEvidence {
            log_lines: &log_lines,
            exit_code,
        };
        let failed = self.detector.is_failure(&evidence);
        let outcome = MigrationOutcome {
            succeeded: !failed,
            task_id: first.task_id.clone(),
            exit_code,
            log_lines,
        };
        debug!(log_stream = %log_stream, "{}", outcome.log_text());

        if failed {
            log_transition(&task_ids, TaskState::Failed);
            error!(
                task_id = %outcome.task_id,
                rule = %self.detector.describe(),
                "db migration failed"
            );
            return Err(DeployError::MigrationFailed {
                task_id: outcome.task_id.clone(),
                log_text: outcome.log_text(),
            });
        }

        log_transition(&task_ids, TaskState::Succeeded);
        info!(task_id = %outcome.task_id, exit_code = ?outcome.exit_code, "db migration completed");
        Ok(outcome)
    }

    /// Polls until every task reports `STOPPED`, the deadline passes or the
    /// run is cancelled.
    pub fn wait_until_stopped(
        &self,
        cluster: &str,
        task_ids: &[String],
    ) -> Result<Vec<TaskStatus>, DeployError> {
        let policy = self.settings.poll;
        let started_at = Instant::now();
        let mut polls = 0usize;

        loop {
            if self.cancel.is_cancelled() {
                return Err(DeployError::Cancelled {
                    task_ids: task_ids.to_vec(),
                });
            }

            let statuses = self.tasks.describe_tasks(cluster, task_ids)?;
            if polls == 0 {
                log_transition(task_ids, TaskState::Polling);
            }
            polls += 1;

            let mut pending = Vec::new();
            for task_id in task_ids {
                match statuses.iter().find(|status| &status.task_id == task_id) {
                    Some(status) if status.is_stopped() => {}
                    Some(status) => pending.push(format!("{task_id}={}", status.last_status)),
                    // Just-launched tasks can be missing from DescribeTasks for a while.
                    None => pending.push(format!("{task_id}={MISSING_STATUS}")),
                }
            }

            if pending.is_empty() {
                for status in &statuses {
                    debug!(
                        task_id = %status.task_id,
                        stopped_reason = status.stopped_reason.as_deref().unwrap_or(""),
                        "task stopped"
                    );
                }
                return Ok(statuses);
            }

            if policy.deadline_passed(started_at) {
                return Err(DeployError::WaitTimedOut {
                    task_ids: task_ids.to_vec(),
                    waited: started_at.elapsed(),
                });
            }

            debug!(polls, pending = ?pending, "waiting for tasks to stop");
            self.cancel.sleep(policy.interval);
        }
    }

    /// Reads a stream from its head, following forward tokens until the
    /// provider hands back the token it was given.
    pub fn read_full_log(
        &self,
        log_group: &str,
        log_stream: &str,
    ) -> Result<Vec<String>, DeployError> {
        let mut lines = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.logs.read_page(log_group, log_stream, token.as_deref())?;
            lines.extend(page.lines);

            match page.next_forward_token {
                Some(next) if token.as_deref() != Some(next.as_str()) => token = Some(next),
                _ => break,
            }
        }

        Ok(lines)
    }
}

fn log_transition(task_ids: &[String], state: TaskState) {
    debug!(task_ids = ?task_ids, state = state.as_str(), "migration task state");
}
