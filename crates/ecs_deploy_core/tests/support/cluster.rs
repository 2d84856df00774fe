#![allow(dead_code)]

use std::sync::Mutex;

use ecs_deploy_core::error::DeployError;
use ecs_deploy_core::migration::{
    ContainerExit, LogPage, LogReader, TaskHandle, TaskLaunchRequest, TaskRunner, TaskStatus,
    STOPPED_STATUS,
};
use ecs_deploy_core::network::{NetworkProvider, SecurityGroup, Subnet, Vpc};
use ecs_deploy_core::services::{ServiceDeploymentRequest, ServiceUpdater};

/// In-memory stand-in for EC2, ECS and CloudWatch Logs that records every
/// call in order.
pub struct FakeCluster {
    pub vpcs: Vec<Vpc>,
    pub subnets: Vec<Subnet>,
    pub security_groups: Vec<SecurityGroup>,
    pub task_arns: Vec<String>,
    /// Number of describe calls that report RUNNING before the tasks stop.
    /// `usize::MAX` keeps them running forever.
    pub running_polls: usize,
    /// Number of initial describe calls that do not know the tasks yet.
    pub missing_polls: usize,
    pub exit_code: Option<i32>,
    pub log_pages: Vec<Vec<String>>,
    pub rejected_service: Option<String>,
    pub vpc_lookup_error: Option<String>,
    calls: Mutex<Vec<String>>,
    describe_calls: Mutex<usize>,
    launches: Mutex<Vec<TaskLaunchRequest>>,
}

impl FakeCluster {
    /// Network with one public and one private subnet and a single matching
    /// security group for prefix `acme`.
    pub fn acme() -> Self {
        Self {
            vpcs: vec![Vpc {
                vpc_id: "vpc-0acme".to_string(),
            }],
            subnets: vec![
                Subnet {
                    subnet_id: "subnet-public".to_string(),
                    map_public_ip_on_launch: Some(true),
                },
                Subnet {
                    subnet_id: "subnet-private".to_string(),
                    map_public_ip_on_launch: Some(false),
                },
            ],
            security_groups: vec![
                SecurityGroup {
                    group_id: "sg-0alb".to_string(),
                    group_name: "acme-sg-alb".to_string(),
                    name_tag: None,
                },
                SecurityGroup {
                    group_id: "sg-0tasks".to_string(),
                    group_name: "acme-sg-ecs-tasks".to_string(),
                    name_tag: None,
                },
            ],
            task_arns: vec![
                "arn:aws:ecs:eu-west-1:123456789012:task/acme-cluster/5a1b2c3d".to_string(),
            ],
            running_polls: 0,
            missing_polls: 0,
            exit_code: Some(0),
            log_pages: vec![vec!["Migrating...".to_string(), "Done".to_string()]],
            rejected_service: None,
            vpc_lookup_error: None,
            calls: Mutex::new(Vec::new()),
            describe_calls: Mutex::new(0),
            launches: Mutex::new(Vec::new()),
        }
    }

    pub fn with_log(mut self, lines: &[&str]) -> Self {
        self.log_pages = vec![lines.iter().map(|line| line.to_string()).collect()];
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("poisoned mutex").clone()
    }

    pub fn calls_starting_with(&self, operation: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(operation))
            .collect()
    }

    pub fn launches(&self) -> Vec<TaskLaunchRequest> {
        self.launches.lock().expect("poisoned mutex").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("poisoned mutex").push(call);
    }
}

impl NetworkProvider for FakeCluster {
    fn find_vpcs_by_name_tag(&self, name_tag: &str) -> Result<Vec<Vpc>, DeployError> {
        self.record(format!("ec2:DescribeVpcs Name={name_tag}"));
        if let Some(message) = &self.vpc_lookup_error {
            return Err(DeployError::dependency("ec2:DescribeVpcs", message.clone()));
        }
        Ok(self.vpcs.clone())
    }

    fn list_subnets(&self, vpc_id: &str) -> Result<Vec<Subnet>, DeployError> {
        self.record(format!("ec2:DescribeSubnets {vpc_id}"));
        Ok(self.subnets.clone())
    }

    fn list_security_groups(&self, vpc_id: &str) -> Result<Vec<SecurityGroup>, DeployError> {
        self.record(format!("ec2:DescribeSecurityGroups {vpc_id}"));
        Ok(self.security_groups.clone())
    }
}

impl TaskRunner for FakeCluster {
    fn run_task(&self, request: &TaskLaunchRequest) -> Result<Vec<TaskHandle>, DeployError> {
        self.record(format!("ecs:RunTask {}", request.task_definition));
        self.launches
            .lock()
            .expect("poisoned mutex")
            .push(request.clone());
        Ok(self
            .task_arns
            .iter()
            .map(|arn| TaskHandle::from_arn(arn.as_str()))
            .collect())
    }

    fn describe_tasks(
        &self,
        cluster: &str,
        task_ids: &[String],
    ) -> Result<Vec<TaskStatus>, DeployError> {
        self.record(format!("ecs:DescribeTasks {cluster}"));
        let mut count = self.describe_calls.lock().expect("poisoned mutex");
        let call = *count;
        *count = call.saturating_add(1);
        if call < self.missing_polls {
            return Ok(Vec::new());
        }
        let stopped = call >= self.missing_polls.saturating_add(self.running_polls);

        Ok(task_ids
            .iter()
            .map(|task_id| TaskStatus {
                task_id: task_id.clone(),
                last_status: if stopped {
                    STOPPED_STATUS.to_string()
                } else {
                    "RUNNING".to_string()
                },
                stopped_reason: stopped.then(|| "Essential container in task exited".to_string()),
                containers: vec![ContainerExit {
                    name: "acme-container".to_string(),
                    exit_code: if stopped { self.exit_code } else { None },
                }],
            })
            .collect())
    }
}

impl LogReader for FakeCluster {
    fn read_page(
        &self,
        log_group: &str,
        log_stream: &str,
        token: Option<&str>,
    ) -> Result<LogPage, DeployError> {
        self.record(format!("logs:GetLogEvents {log_group} {log_stream}"));
        let index = token
            .and_then(|value| value.strip_prefix("f/"))
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(0);

        match self.log_pages.get(index) {
            Some(lines) => Ok(LogPage {
                lines: lines.clone(),
                next_forward_token: Some(format!("f/{}", index + 1)),
            }),
            // End of stream: the provider echoes the token it was given.
            None => Ok(LogPage {
                lines: Vec::new(),
                next_forward_token: token.map(str::to_string),
            }),
        }
    }
}

impl ServiceUpdater for FakeCluster {
    fn force_new_deployment(&self, request: &ServiceDeploymentRequest) -> Result<(), DeployError> {
        self.record(format!(
            "ecs:UpdateService {} {}",
            request.cluster_name, request.service_name
        ));
        if self.rejected_service.as_deref() == Some(request.service_name.as_str()) {
            return Err(DeployError::dependency(
                "ecs:UpdateService",
                format!("service {} is not active", request.service_name),
            ));
        }
        Ok(())
    }
}
