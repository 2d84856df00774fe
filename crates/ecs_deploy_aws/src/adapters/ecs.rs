use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, ContainerOverride, Failure, LaunchType,
    NetworkConfiguration, Task, TaskOverride,
};
use ecs_deploy_core::error::DeployError;
use ecs_deploy_core::migration::{
    task_id_from_arn, ContainerExit, TaskHandle, TaskLaunchRequest, TaskRunner, TaskStatus,
};
use ecs_deploy_core::services::{ServiceDeploymentRequest, ServiceUpdater};
use tracing::{debug, warn};

use super::{block_on, dependency_error};

#[derive(Debug, Clone)]
pub struct EcsTaskRunner {
    client: aws_sdk_ecs::Client,
}

impl EcsTaskRunner {
    pub fn new(client: aws_sdk_ecs::Client) -> Self {
        Self { client }
    }
}

impl TaskRunner for EcsTaskRunner {
    fn run_task(&self, request: &TaskLaunchRequest) -> Result<Vec<TaskHandle>, DeployError> {
        let network = network_configuration(request)?;
        let overrides = TaskOverride::builder()
            .container_overrides(ContainerOverride::builder().name(&request.container).build())
            .build();

        let output = block_on(
            self.client
                .run_task()
                .cluster(&request.cluster)
                .task_definition(&request.task_definition)
                .launch_type(LaunchType::Fargate)
                .started_by(&request.started_by)
                .network_configuration(network)
                .overrides(overrides)
                .send(),
        )
        .map_err(|error| dependency_error("ecs:RunTask", error))?;

        let handles: Vec<TaskHandle> = output
            .tasks()
            .iter()
            .filter_map(Task::task_arn)
            .map(TaskHandle::from_arn)
            .collect();

        if !output.failures().is_empty() {
            let summary = summarize_failures(output.failures());
            if handles.is_empty() {
                return Err(DeployError::dependency("ecs:RunTask", summary));
            }
            warn!(failures = %summary, "run task reported partial failures");
        }

        Ok(handles)
    }

    fn describe_tasks(
        &self,
        cluster: &str,
        task_ids: &[String],
    ) -> Result<Vec<TaskStatus>, DeployError> {
        let output = block_on(
            self.client
                .describe_tasks()
                .cluster(cluster)
                .set_tasks(Some(task_ids.to_vec()))
                .send(),
        )
        .map_err(|error| dependency_error("ecs:DescribeTasks", error))?;

        if !output.failures().is_empty() {
            debug!(failures = %summarize_failures(output.failures()), "describe tasks reported failures");
        }

        Ok(output.tasks().iter().filter_map(task_status_from_sdk).collect())
    }
}

#[derive(Debug, Clone)]
pub struct EcsServiceUpdater {
    client: aws_sdk_ecs::Client,
}

impl EcsServiceUpdater {
    pub fn new(client: aws_sdk_ecs::Client) -> Self {
        Self { client }
    }
}

impl ServiceUpdater for EcsServiceUpdater {
    fn force_new_deployment(&self, request: &ServiceDeploymentRequest) -> Result<(), DeployError> {
        let output = block_on(
            self.client
                .update_service()
                .cluster(&request.cluster_name)
                .service(&request.service_name)
                .force_new_deployment(true)
                .send(),
        )
        .map_err(|error| dependency_error("ecs:UpdateService", error))?;

        let deployment_id = output
            .service()
            .and_then(|service| service.deployments().first())
            .and_then(|deployment| deployment.id());
        debug!(
            service = %request.service_name,
            deployment_id = deployment_id.unwrap_or("unknown"),
            "update service accepted"
        );
        Ok(())
    }
}

fn network_configuration(request: &TaskLaunchRequest) -> Result<NetworkConfiguration, DeployError> {
    let assign_public_ip = if request.assign_public_ip {
        AssignPublicIp::Enabled
    } else {
        AssignPublicIp::Disabled
    };

    let awsvpc = AwsVpcConfiguration::builder()
        .set_subnets(Some(request.subnet_ids.clone()))
        .set_security_groups(Some(request.security_group_ids.clone()))
        .assign_public_ip(assign_public_ip)
        .build()
        .map_err(|error| {
            DeployError::dependency(
                "ecs:RunTask",
                format!("invalid awsvpc configuration: {error}"),
            )
        })?;

    Ok(NetworkConfiguration::builder()
        .awsvpc_configuration(awsvpc)
        .build())
}

fn task_status_from_sdk(task: &Task) -> Option<TaskStatus> {
    let task_arn = task.task_arn()?;
    Some(TaskStatus {
        task_id: task_id_from_arn(task_arn).to_string(),
        last_status: task.last_status().unwrap_or_default().to_string(),
        stopped_reason: task.stopped_reason().map(str::to_string),
        containers: task
            .containers()
            .iter()
            .map(|container| ContainerExit {
                name: container.name().unwrap_or_default().to_string(),
                exit_code: container.exit_code(),
            })
            .collect(),
    })
}

fn summarize_failures(failures: &[Failure]) -> String {
    failures
        .iter()
        .map(|failure| {
            format!(
                "{}: {}",
                failure.arn().unwrap_or("unknown"),
                failure
                    .reason()
                    .or(failure.detail())
                    .unwrap_or("no reason given")
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}
