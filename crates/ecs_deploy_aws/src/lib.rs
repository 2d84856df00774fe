//! AWS SDK adapters and command-line surface for the migrate-and-redeploy
//! pipeline.
//!
//! This crate owns client construction, SDK request shapes, status reporting
//! to the host (GitHub Actions or a plain terminal) and logging setup. The
//! orchestration itself lives in `ecs_deploy_core`.

pub mod adapters;
pub mod config;
pub mod report;
pub mod status;
pub mod telemetry;
