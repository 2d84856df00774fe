use std::future::Future;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_ec2::error::DisplayErrorContext;
use ecs_deploy_core::error::DeployError;

pub mod ec2;
pub mod ecs;
pub mod logs;

use ec2::Ec2NetworkProvider;
use ecs::{EcsServiceUpdater, EcsTaskRunner};
use logs::CloudWatchLogReader;

/// One client per provider service, all built from the same SDK config.
#[derive(Clone)]
pub struct AwsClients {
    pub network: Ec2NetworkProvider,
    pub tasks: EcsTaskRunner,
    pub logs: CloudWatchLogReader,
    pub services: EcsServiceUpdater,
}

impl AwsClients {
    pub fn new(config: &SdkConfig) -> Self {
        let ecs_client = aws_sdk_ecs::Client::new(config);
        Self {
            network: Ec2NetworkProvider::new(aws_sdk_ec2::Client::new(config)),
            tasks: EcsTaskRunner::new(ecs_client.clone()),
            logs: CloudWatchLogReader::new(aws_sdk_cloudwatchlogs::Client::new(config)),
            services: EcsServiceUpdater::new(ecs_client),
        }
    }
}

/// Credentials come from the default provider chain; the region is pinned to
/// the deployment's region.
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// Runs an SDK future to completion from synchronous pipeline code.
///
/// Requires a multi-threaded tokio runtime.
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Keeps the full SDK error chain in the message.
pub(crate) fn dependency_error<E>(operation: &str, error: E) -> DeployError
where
    E: std::error::Error,
{
    DeployError::dependency(operation, DisplayErrorContext(error).to_string())
}
