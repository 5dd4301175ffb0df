//! Deployment testing for zt: build a package with `zarf package create`,
//! deploy it to the current cluster, run smoke checks, and remove it again.
//!
//! All external commands go through the [`CommandRunner`] seam so the flow
//! can be exercised without a cluster.

pub mod deployer;
pub mod namespace;
pub mod runner;
pub mod shutdown;

pub use deployer::{
    has_deployment_errors, ComponentTestResult, DeployConfig, Deployer, DeploymentResult,
};
pub use namespace::{sanitize_label, test_namespace, unique_suffix};
pub use runner::{CommandRunner, SystemRunner};
pub use shutdown::{install_signal_handler, request_shutdown, shutdown_requested};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("{tool} not available: {reason}")]
    ToolUnavailable { tool: &'static str, reason: String },
    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}
