use std::process::ExitCode;

use clap::Parser;
use ecs_deploy_aws::adapters::{load_sdk_config, AwsClients};
use ecs_deploy_aws::config::Cli;
use ecs_deploy_aws::report::{write_summary, RunSummary};
use ecs_deploy_aws::status::StatusReporter;
use ecs_deploy_aws::telemetry::init_tracing;
use ecs_deploy_core::failure::FailureDetector;
use ecs_deploy_core::migration::MigrationRunner;
use ecs_deploy_core::network::NetworkResolver;
use ecs_deploy_core::poll::CancelFlag;
use ecs_deploy_core::services::ServiceDeployer;
use ecs_deploy_core::{run_deployment, DeployError};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let reporter = StatusReporter::from_env();
    if let Err(message) = init_tracing(cli.log_format) {
        eprintln!("{message}");
    }

    let params = match cli.deployment_parameters() {
        Ok(value) => value,
        Err(error) => return fail(&cli, reporter, &error),
    };

    let sdk_config = load_sdk_config(params.region()).await;
    let clients = AwsClients::new(&sdk_config);

    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling the migration wait");
            on_signal.cancel();
        }
    });

    let detector = cli.failure_detector();
    let resolver = NetworkResolver::new(&clients.network, cli.lookup_policy());
    let runner = MigrationRunner::new(
        &clients.tasks,
        &clients.logs,
        &detector,
        cli.migration_settings(),
        cancel,
    );
    let deployer = ServiceDeployer::new(&clients.services);

    info!(
        prefix = params.resource_prefix(),
        region = params.region(),
        failure_rule = %detector.describe(),
        "starting deployment"
    );

    match run_deployment(
        &params,
        &resolver,
        &runner,
        (!cli.skip_services).then_some(&deployer),
    ) {
        Ok(report) => {
            if let Some(path) = &cli.report_path {
                if let Err(message) = write_summary(path, &RunSummary::succeeded(&report)) {
                    warn!("{message}");
                }
            }
            info!(services = ?report.redeployed_services, "deployment finished");
            ExitCode::SUCCESS
        }
        Err(error) => fail(&cli, reporter, &error),
    }
}

fn fail(cli: &Cli, reporter: StatusReporter, error: &DeployError) -> ExitCode {
    error!(code = error.code(), "{error}");
    reporter.fail(error);
    if let Some(path) = &cli.report_path {
        if let Err(message) = write_summary(path, &RunSummary::failed(error)) {
            warn!("{message}");
        }
    }
    ExitCode::FAILURE
}
