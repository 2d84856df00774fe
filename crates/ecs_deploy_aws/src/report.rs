use std::fs;
use std::path::Path;

use chrono::Utc;
use ecs_deploy_core::{DeployError, DeploymentReport};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub status: &'static str,
    pub finished_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<&'a DeploymentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RunError>,
}

#[derive(Debug, Serialize)]
pub struct RunError {
    pub error_code: String,
    pub error_message: String,
}

impl<'a> RunSummary<'a> {
    pub fn succeeded(report: &'a DeploymentReport) -> Self {
        Self {
            status: "succeeded",
            finished_at: Utc::now().to_rfc3339(),
            report: Some(report),
            error: None,
        }
    }

    pub fn failed(error: &DeployError) -> Self {
        Self {
            status: "failed",
            finished_at: Utc::now().to_rfc3339(),
            report: None,
            error: Some(RunError {
                error_code: error.code().to_string(),
                error_message: error.to_string(),
            }),
        }
    }
}

pub fn write_summary(path: &Path, summary: &RunSummary<'_>) -> Result<(), String> {
    let body = serde_json::to_vec_pretty(summary)
        .map_err(|error| format!("failed to serialize run summary: {error}"))?;
    fs::write(path, body)
        .map_err(|error| format!("failed to write run summary to {}: {error}", path.display()))
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    #[test]
    fn failed_summary_carries_error_code() {
        let error = DeployError::MigrationFailed {
            task_id: "5a1b2c3d".to_string(),
            log_text: "rake aborted!".to_string(),
        };
        let value = serde_json::to_value(RunSummary::failed(&error)).expect("summary serializes");

        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"]["error_code"], "migration_failed");
        assert_eq!(
            value["error"]["error_message"],
            "Migration failed: \nrake aborted!"
        );
        assert_eq!(value.get("report"), None);
    }

    #[test]
    fn summary_is_written_as_json() {
        let path = std::env::temp_dir().join(format!(
            "ecs-deploy-summary-{}.json",
            std::process::id()
        ));
        let error = DeployError::Config("region cannot be empty".to_string());

        write_summary(&path, &RunSummary::failed(&error)).expect("summary should be written");
        let body = fs::read(&path).expect("summary should be readable");
        let _ = fs::remove_file(&path);

        let value: Value = serde_json::from_slice(&body).expect("summary should parse");
        assert_eq!(value["error"]["error_code"], "config_error");
    }
}
