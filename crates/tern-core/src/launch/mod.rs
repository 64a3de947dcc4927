//! Launcher seam.
//!
//! The cluster resource manager is an external collaborator: the preparer
//! only needs it to allocate an application id, accept one
//! [`LaunchDescriptor`] and hand back a controller for the started master.
mod descriptor;
pub use descriptor::{LOG_DIR, LaunchDescriptor, LaunchDescriptorBuilder, STDERR, STDOUT};

use std::fmt;

use async_trait::async_trait;
use tern_model::{ApplicationId, ApplicationSpec};

use crate::error::LaunchError;

/// Entry point to a cluster resource manager.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Client name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Code artifact implementing this client, packaged with the master.
    fn client_artifact(&self) -> Option<&str> {
        None
    }

    /// Allocate an application id for `spec` submitted as `user`.
    ///
    /// Called before any staging so the id can be embedded in the launch environment.
    async fn create_launcher(
        &self,
        user: &str,
        spec: &ApplicationSpec,
    ) -> Result<Box<dyn ProcessLauncher>, LaunchError>;
}

/// One-shot launcher bound to an allocated application id.
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    fn application_id(&self) -> &ApplicationId;

    /// Submit the master. The launcher is consumed: an id is launched at most once.
    async fn launch(
        self: Box<Self>,
        descriptor: LaunchDescriptor,
    ) -> Result<Box<dyn ProcessController>, LaunchError>;
}

/// Observed state of a launched master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Running,
    Exited { code: Option<i32> },
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Running => f.write_str("running"),
            ProcessStatus::Exited { code: Some(c) } => write!(f, "exited({c})"),
            ProcessStatus::Exited { code: None } => f.write_str("exited(signal)"),
        }
    }
}

/// Handle to a launched master.
#[async_trait]
pub trait ProcessController: Send + Sync {
    fn application_id(&self) -> &ApplicationId;

    async fn status(&self) -> Result<ProcessStatus, LaunchError>;

    /// Wait until the master exits.
    async fn wait(&self) -> Result<ProcessStatus, LaunchError>;

    /// Stop the master; a no-op if it already exited.
    async fn kill(&self) -> Result<(), LaunchError>;
}
