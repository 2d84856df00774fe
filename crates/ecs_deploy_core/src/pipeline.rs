use serde::Serialize;
use tracing::{info, info_span};

use crate::error::DeployError;
use crate::migration::{MigrationOutcome, MigrationRunner};
use crate::network::{NetworkContext, NetworkResolver};
use crate::params::DeploymentParameters;
use crate::services::ServiceDeployer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentReport {
    pub parameters: DeploymentParameters,
    pub network: NetworkContext,
    pub migration: MigrationOutcome,
    /// Services whose redeployment request was accepted, in request order.
    pub redeployed_services: Vec<String>,
}

/// Resolves the network, runs the migration and, when it succeeds, redeploys
/// the services. The first error aborts every later step.
///
/// Passing `None` for `deployer` stops after the migration.
pub fn run_deployment(
    params: &DeploymentParameters,
    resolver: &NetworkResolver<'_>,
    runner: &MigrationRunner<'_>,
    deployer: Option<&ServiceDeployer<'_>>,
) -> Result<DeploymentReport, DeployError> {
    let span = info_span!(
        "deployment",
        prefix = params.resource_prefix(),
        region = params.region()
    );
    let _entered = span.enter();

    let network = resolver.resolve_network(params.vpc_tag(), params.security_group_name())?;
    let migration = runner.run_and_await(&network, params)?;

    let redeployed_services = match deployer {
        Some(deployer) => deployer.redeploy_all(params)?,
        None => {
            info!("service redeployment skipped");
            Vec::new()
        }
    };

    Ok(DeploymentReport {
        parameters: params.clone(),
        network,
        migration,
        redeployed_services,
    })
}
