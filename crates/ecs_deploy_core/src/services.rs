use tracing::info;

use crate::error::DeployError;
use crate::params::DeploymentParameters;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDeploymentRequest {
    pub service_name: String,
    pub cluster_name: String,
}

pub trait ServiceUpdater {
    /// Asks the scheduler to restart the service on its current task definition.
    fn force_new_deployment(&self, request: &ServiceDeploymentRequest) -> Result<(), DeployError>;
}

pub struct ServiceDeployer<'a> {
    updater: &'a dyn ServiceUpdater,
}

impl<'a> ServiceDeployer<'a> {
    pub fn new(updater: &'a dyn ServiceUpdater) -> Self {
        Self { updater }
    }

    /// Redeploys the API service, then the worker service. Stops at the first
    /// rejected request and returns the names of the accepted ones.
    pub fn redeploy_all(&self, params: &DeploymentParameters) -> Result<Vec<String>, DeployError> {
        let mut deployed = Vec::with_capacity(2);
        for (role, service) in [
            ("api", params.api_service()),
            ("worker", params.worker_service()),
        ] {
            let request = ServiceDeploymentRequest {
                service_name: service.to_string(),
                cluster_name: params.cluster().to_string(),
            };
            self.updater.force_new_deployment(&request)?;
            info!(role, service, cluster = params.cluster(), "service redeployment requested");
            deployed.push(request.service_name);
        }
        Ok(deployed)
    }
}
