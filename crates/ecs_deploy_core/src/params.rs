use serde::Serialize;

use crate::error::DeployError;

pub const MIGRATION_TASK_STARTED_BY: &str = "db-migrate";
pub const DEFAULT_LOG_STREAM_PREFIX: &str = "dbmigrate";

/// Resource names for one deployment run.
///
/// Every name is derived from `resource_prefix` at construction time and the
/// value is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentParameters {
    region: String,
    resource_prefix: String,
    vpc_tag: String,
    security_group_name: String,
    cluster: String,
    container: String,
    api_service: String,
    worker_service: String,
    log_group: String,
    migration_task_definition: String,
}

impl DeploymentParameters {
    pub fn new(region: &str, resource_prefix: &str) -> Result<Self, DeployError> {
        let region = region.trim();
        if region.is_empty() {
            return Err(DeployError::Config("region cannot be empty".to_string()));
        }

        let prefix = resource_prefix.trim();
        if prefix.is_empty() {
            return Err(DeployError::Config(
                "resource prefix cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            region: region.to_string(),
            resource_prefix: prefix.to_string(),
            vpc_tag: vpc_tag(prefix),
            security_group_name: security_group_name(prefix),
            cluster: cluster_name(prefix),
            container: container_name(prefix),
            api_service: api_service_name(prefix),
            worker_service: worker_service_name(prefix),
            log_group: log_group_name(prefix),
            migration_task_definition: migration_task_definition(prefix),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn resource_prefix(&self) -> &str {
        &self.resource_prefix
    }

    pub fn vpc_tag(&self) -> &str {
        &self.vpc_tag
    }

    pub fn security_group_name(&self) -> &str {
        &self.security_group_name
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn api_service(&self) -> &str {
        &self.api_service
    }

    pub fn worker_service(&self) -> &str {
        &self.worker_service
    }

    pub fn log_group(&self) -> &str {
        &self.log_group
    }

    pub fn migration_task_definition(&self) -> &str {
        &self.migration_task_definition
    }
}

pub fn vpc_tag(prefix: &str) -> String {
    format!("{prefix}-vpc")
}

pub fn security_group_name(prefix: &str) -> String {
    format!("{prefix}-sg-ecs-tasks")
}

pub fn cluster_name(prefix: &str) -> String {
    format!("{prefix}-cluster")
}

pub fn container_name(prefix: &str) -> String {
    format!("{prefix}-container")
}

pub fn api_service_name(prefix: &str) -> String {
    format!("{prefix}-api-ecs-service")
}

pub fn worker_service_name(prefix: &str) -> String {
    format!("{prefix}-worker-ecs-service")
}

pub fn log_group_name(prefix: &str) -> String {
    format!("{prefix}/ecs")
}

pub fn migration_task_definition(prefix: &str) -> String {
    format!("{prefix}-task-db-migrate")
}

/// Log stream written by the awslogs driver for one task's container.
pub fn migration_log_stream(stream_prefix: &str, container: &str, task_id: &str) -> String {
    let trimmed = stream_prefix.trim_matches('/');
    format!("{trimmed}/{container}/{task_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_every_name_from_prefix() {
        let params = DeploymentParameters::new("eu-west-1", "acme").expect("params should build");

        assert_eq!(params.region(), "eu-west-1");
        assert_eq!(params.vpc_tag(), "acme-vpc");
        assert_eq!(params.security_group_name(), "acme-sg-ecs-tasks");
        assert_eq!(params.cluster(), "acme-cluster");
        assert_eq!(params.container(), "acme-container");
        assert_eq!(params.api_service(), "acme-api-ecs-service");
        assert_eq!(params.worker_service(), "acme-worker-ecs-service");
        assert_eq!(params.log_group(), "acme/ecs");
        assert_eq!(params.migration_task_definition(), "acme-task-db-migrate");
    }

    #[test]
    fn trims_inputs_before_deriving() {
        let params =
            DeploymentParameters::new(" us-east-1 ", "  shop ").expect("params should build");
        assert_eq!(params.region(), "us-east-1");
        assert_eq!(params.cluster(), "shop-cluster");
    }

    #[test]
    fn rejects_blank_prefix() {
        let error = DeploymentParameters::new("us-east-1", "   ").expect_err("prefix is blank");
        assert_eq!(
            error.to_string(),
            "invalid configuration: resource prefix cannot be empty"
        );
    }

    #[test]
    fn rejects_blank_region() {
        let error = DeploymentParameters::new("", "acme").expect_err("region is blank");
        assert!(matches!(error, DeployError::Config(_)));
    }

    #[test]
    fn log_stream_follows_awslogs_layout() {
        assert_eq!(
            migration_log_stream("dbmigrate", "acme-container", "0f1e2d"),
            "dbmigrate/acme-container/0f1e2d"
        );
        assert_eq!(
            migration_log_stream("/dbmigrate/", "acme-container", "0f1e2d"),
            "dbmigrate/acme-container/0f1e2d"
        );
    }
}
