//! Reporting the run's outcome to whatever is hosting the binary.

use ecs_deploy_core::DeployError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusReporter {
    /// Emits workflow commands (`::error::`, `::debug::`) on stdout.
    GithubActions,
    Terminal,
}

impl StatusReporter {
    pub fn from_env() -> Self {
        match std::env::var("GITHUB_ACTIONS") {
            Ok(value) if value == "true" => Self::GithubActions,
            _ => Self::Terminal,
        }
    }

    /// Marks the run as failed with the error's message, which carries the
    /// migration log for migration failures.
    pub fn fail(self, error: &DeployError) {
        match self {
            Self::GithubActions => {
                println!("{}", workflow_command("debug", &format!("{error:?}")));
                println!("{}", workflow_command("error", &error.to_string()));
            }
            Self::Terminal => eprintln!("deployment failed: {error}"),
        }
    }
}

pub fn workflow_command(command: &str, message: &str) -> String {
    format!("::{command}::{}", escape_data(message))
}

/// Workflow command data must not contain raw `%`, CR or LF.
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_multiline_migration_log() {
        let error = DeployError::MigrationFailed {
            task_id: "5a1b2c3d".to_string(),
            log_text: "Migrating...\r\nrake aborted! 100% broken".to_string(),
        };

        assert_eq!(
            workflow_command("error", &error.to_string()),
            "::error::Migration failed: %0AMigrating...%0D%0Arake aborted! 100%25 broken"
        );
    }

    #[test]
    fn percent_is_escaped_before_line_breaks() {
        assert_eq!(escape_data("%0A\n"), "%250A%0A");
    }
}
