//! Provider-agnostic core of the migrate-then-redeploy pipeline.
//!
//! This crate owns resource naming, network resolution, migration task
//! supervision and service redeployment ordering. It talks to the cluster only
//! through the provider traits declared next to each component and excludes
//! AWS SDK and runtime concerns.
//! See `crates/ecs_deploy_aws` for the SDK-backed implementations.

pub mod error;
pub mod failure;
pub mod migration;
pub mod network;
pub mod params;
pub mod pipeline;
pub mod poll;
pub mod services;

pub use error::{DeployError, ResourceKind};
pub use params::DeploymentParameters;
pub use pipeline::{run_deployment, DeploymentReport};
