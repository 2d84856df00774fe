use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use ecs_deploy_core::error::DeployError;
use ecs_deploy_core::failure::{AnyDetector, ExitCodeDetector, MarkerDetector};
use ecs_deploy_core::migration::MigrationSettings;
use ecs_deploy_core::network::LookupPolicy;
use ecs_deploy_core::params::DEFAULT_LOG_STREAM_PREFIX;
use ecs_deploy_core::poll::PollPolicy;
use ecs_deploy_core::DeploymentParameters;

// ── CLI definition ─────────────────────────────────────────────────

/// Every flag can also come from the environment, so the binary runs
/// unchanged as a GitHub Actions step (`INPUT_*` variables).
#[derive(Debug, Parser)]
#[command(
    name = "ecs_deploy",
    about = "Run the database migration task, then redeploy the API and worker services",
    long_about = "Resolves the private network of the cluster, runs the one-shot\n\
                  db-migrate task, checks its log for failure and, only when it\n\
                  succeeded, forces new deployments of the API and worker services."
)]
pub struct Cli {
    /// AWS region of every resource (falls back to AWS_REGION)
    #[arg(long, env = "INPUT_AWS_REGION")]
    pub region: Option<String>,

    /// Prefix every resource name is derived from
    #[arg(long, env = "INPUT_AWS_RESOURCE_PREFIX")]
    pub resource_prefix: String,

    /// Seconds between task status polls
    #[arg(long, env = "INPUT_POLL_INTERVAL_SECS", default_value_t = 6)]
    pub poll_interval_secs: u64,

    /// Upper bound on the wait for the migration task to stop (0 = no bound)
    #[arg(long, env = "INPUT_WAIT_TIMEOUT_SECS", default_value_t = 600)]
    pub wait_timeout_secs: u64,

    /// awslogs stream prefix configured on the migration task definition
    #[arg(long, env = "INPUT_LOG_STREAM_PREFIX", default_value = DEFAULT_LOG_STREAM_PREFIX)]
    pub log_stream_prefix: String,

    /// Log substring that marks the migration as failed (repeatable)
    #[arg(long = "failure-marker", env = "INPUT_FAILURE_MARKER")]
    pub failure_markers: Vec<String>,

    /// Also fail when the migration container exits with a non-zero code
    #[arg(long, env = "INPUT_FAIL_ON_EXIT_CODE")]
    pub fail_on_exit_code: bool,

    /// Fail instead of picking the first match when a lookup is ambiguous
    #[arg(long, env = "INPUT_STRICT_LOOKUP")]
    pub strict_lookup: bool,

    /// Run the migration only, without redeploying services
    #[arg(long, env = "INPUT_SKIP_SERVICES")]
    pub skip_services: bool,

    /// Write a JSON summary of the run to this path
    #[arg(long, env = "INPUT_REPORT_PATH")]
    pub report_path: Option<PathBuf>,

    #[arg(value_enum, long, env = "LOG_FORMAT", default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

// ── resolution ─────────────────────────────────────────────────────

impl Cli {
    pub fn deployment_parameters(&self) -> Result<DeploymentParameters, DeployError> {
        let region = self
            .region
            .clone()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| std::env::var("AWS_REGION").ok())
            .unwrap_or_default();
        DeploymentParameters::new(&region, &self.resource_prefix)
    }

    pub fn lookup_policy(&self) -> LookupPolicy {
        if self.strict_lookup {
            LookupPolicy::RequireUnique
        } else {
            LookupPolicy::FirstMatch
        }
    }

    pub fn migration_settings(&self) -> MigrationSettings {
        let timeout = match self.wait_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        MigrationSettings {
            poll: PollPolicy {
                interval: Duration::from_secs(self.poll_interval_secs),
                timeout,
            },
            log_stream_prefix: self.log_stream_prefix.clone(),
        }
    }

    /// Configured markers (or the default one), plus the exit-code rule when
    /// enabled.
    pub fn failure_detector(&self) -> AnyDetector {
        let markers = self
            .failure_markers
            .iter()
            .filter(|marker| !marker.trim().is_empty());

        let mut detector = AnyDetector::new();
        for marker in markers {
            detector = detector.with(MarkerDetector::new(marker.clone()));
        }
        if detector.is_empty() {
            detector = detector.with(MarkerDetector::default());
        }
        if self.fail_on_exit_code {
            detector = detector.with(ExitCodeDetector);
        }
        detector
    }
}

#[cfg(test)]
mod tests {
    use ecs_deploy_core::failure::{FailureDetector, MigrationEvidence};

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["ecs_deploy"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn defaults_follow_native_waiter_limits() {
        let cli = parse(&["--region", "eu-west-1", "--resource-prefix", "acme"]);
        let settings = cli.migration_settings();

        assert_eq!(settings.poll.interval, Duration::from_secs(6));
        assert_eq!(settings.poll.timeout, Some(Duration::from_secs(600)));
        assert_eq!(settings.log_stream_prefix, "dbmigrate");
        assert_eq!(cli.lookup_policy(), LookupPolicy::FirstMatch);
        assert!(!cli.skip_services);
    }

    #[test]
    fn zero_timeout_means_unbounded() {
        let cli = parse(&[
            "--region",
            "eu-west-1",
            "--resource-prefix",
            "acme",
            "--wait-timeout-secs",
            "0",
        ]);
        assert_eq!(cli.migration_settings().poll.timeout, None);
    }

    #[test]
    fn parameters_derive_from_prefix() {
        let cli = parse(&["--region", "eu-west-1", "--resource-prefix", "acme"]);
        let params = cli
            .deployment_parameters()
            .expect("parameters should resolve");
        assert_eq!(params.cluster(), "acme-cluster");
        assert_eq!(params.region(), "eu-west-1");
    }

    #[test]
    fn default_detector_uses_rake_marker() {
        let cli = parse(&["--region", "eu-west-1", "--resource-prefix", "acme"]);
        let detector = cli.failure_detector();
        let log = vec!["rake aborted!".to_string()];

        assert!(detector.is_failure(&MigrationEvidence {
            log_lines: &log,
            exit_code: Some(0),
        }));
        assert_eq!(detector.describe(), "log contains \"rake aborted\"");
    }

    #[test]
    fn custom_markers_replace_the_default() {
        let cli = parse(&[
            "--region",
            "eu-west-1",
            "--resource-prefix",
            "acme",
            "--failure-marker",
            "Migration failed",
            "--failure-marker",
            "PG::",
            "--fail-on-exit-code",
            "--strict-lookup",
        ]);
        let detector = cli.failure_detector();
        let log = vec!["rake aborted!".to_string()];

        assert!(!detector.is_failure(&MigrationEvidence {
            log_lines: &log,
            exit_code: Some(0),
        }));
        assert!(detector.is_failure(&MigrationEvidence {
            log_lines: &log,
            exit_code: Some(3),
        }));
        assert_eq!(cli.lookup_policy(), LookupPolicy::RequireUnique);
    }
}
