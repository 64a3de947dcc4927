use std::{
    io::Cursor,
    path::{Path, PathBuf},
    process::Stdio,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, trace};

use tern_core::{
    error::LaunchError,
    launch::{ClusterClient, LOG_DIR, LaunchDescriptor, ProcessController, ProcessLauncher},
    storage::{Location, SharedStorage},
};
use tern_model::{
    ApplicationId, ApplicationSpec, ENV_CONF_DIR, Env, ResourceDescriptor, is_path_segment,
};

use crate::{
    config::LocalClusterConfig,
    controller::LocalController,
    limits::attach_limits,
};

/// File the serialized credentials are written to inside the working directory.
pub const CREDENTIALS_FILE: &str = "credentials.store";

/// Points the master at [`CREDENTIALS_FILE`].
pub const ENV_CREDENTIALS_FILE: &str = "TERN_CREDENTIALS_FILE";

/// Log directory inside the working directory; replaces `<LOG_DIR>`.
pub const LOGS_DIR: &str = "logs";

pub const ENV_LOG_DIR: &str = "TERN_LOG_DIR";

/// Cluster of one host: masters run as subprocesses of the submitter.
///
/// Application ids follow `application_<start-ms>_<seq>`, with the sequence
/// counting from 1 for each cluster instance.
pub struct LocalCluster {
    config: LocalClusterConfig,
    storage: Arc<dyn SharedStorage>,
    started_ms: u128,
    seq: AtomicU32,
}

impl LocalCluster {
    pub fn new(config: LocalClusterConfig, storage: Arc<dyn SharedStorage>) -> Self {
        let started_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        Self {
            config,
            storage,
            started_ms,
            seq: AtomicU32::new(0),
        }
    }

    pub fn config(&self) -> &LocalClusterConfig {
        &self.config
    }

    fn next_id(&self) -> ApplicationId {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        ApplicationId::new(format!("application_{}_{seq:04}", self.started_ms))
    }
}

#[async_trait]
impl ClusterClient for LocalCluster {
    fn name(&self) -> &'static str {
        "local"
    }

    fn client_artifact(&self) -> Option<&str> {
        self.config.client_artifact.as_deref()
    }

    async fn create_launcher(
        &self,
        user: &str,
        spec: &ApplicationSpec,
    ) -> Result<Box<dyn ProcessLauncher>, LaunchError> {
        let id = self.next_id();
        info!(application_id = %id, user, app = %spec.name, "application id allocated");
        Ok(Box::new(LocalLauncher {
            work_dir: self.config.work_root.join(id.as_str()),
            id,
            config: self.config.clone(),
            storage: self.storage.clone(),
        }))
    }
}

/// Starts one master in `<work_root>/<application id>`.
pub struct LocalLauncher {
    id: ApplicationId,
    work_dir: PathBuf,
    config: LocalClusterConfig,
    storage: Arc<dyn SharedStorage>,
}

impl LocalLauncher {
    fn admit(&self, descriptor: &LaunchDescriptor) -> Result<(), LaunchError> {
        if descriptor.memory_mb() > self.config.max_memory_mb {
            return Err(LaunchError::SubmissionRejected(format!(
                "requested {} MB exceeds the {} MB maximum",
                descriptor.memory_mb(),
                self.config.max_memory_mb
            )));
        }
        if descriptor.virtual_cores() > self.config.max_virtual_cores {
            return Err(LaunchError::SubmissionRejected(format!(
                "requested {} virtual cores exceeds the maximum of {}",
                descriptor.virtual_cores(),
                self.config.max_virtual_cores
            )));
        }
        Ok(())
    }

    /// Copy one resource from shared storage into the working directory.
    /// Archives are unpacked into a directory named after the resource.
    async fn localize(&self, resource: &ResourceDescriptor) -> Result<(), LaunchError> {
        let name = resource.name();
        if !is_path_segment(name) {
            return Err(LaunchError::InvalidDescriptor(format!(
                "resource name '{name}' is not a plain file name"
            )));
        }
        if !self.storage.owns(resource.uri()) {
            return Err(LaunchError::InvalidDescriptor(format!(
                "resource '{name}' is not in shared storage: {}",
                resource.uri()
            )));
        }

        let data = self
            .storage
            .read(&Location::new(resource.uri().clone()))
            .await?;
        let target = self.work_dir.join(name);
        trace!(resource = name, bytes = data.len(), archive = resource.is_archive(), "localizing");

        if resource.is_archive() {
            tokio::task::spawn_blocking(move || {
                tar::Archive::new(Cursor::new(data)).unpack(&target)
            })
            .await
            .map_err(std::io::Error::from)??;
        } else {
            tokio::fs::write(&target, data).await?;
        }
        Ok(())
    }

    fn environment(&self, descriptor: &LaunchDescriptor, log_dir: &Path) -> Env {
        let conf_dir = self.config.conf_dir.as_deref().unwrap_or(&self.work_dir);
        descriptor
            .env()
            .clone()
            .with(ENV_CONF_DIR, conf_dir.display().to_string())
            .with(
                ENV_CREDENTIALS_FILE,
                self.work_dir.join(CREDENTIALS_FILE).display().to_string(),
            )
            .with(ENV_LOG_DIR, log_dir.display().to_string())
    }
}

#[async_trait]
impl ProcessLauncher for LocalLauncher {
    fn application_id(&self) -> &ApplicationId {
        &self.id
    }

    #[instrument(name = "launch", skip_all, fields(application_id = %self.id))]
    async fn launch(
        self: Box<Self>,
        descriptor: LaunchDescriptor,
    ) -> Result<Box<dyn ProcessController>, LaunchError> {
        self.admit(&descriptor)?;

        let log_dir = self.work_dir.join(LOGS_DIR);
        tokio::fs::create_dir_all(&log_dir).await?;
        for resource in descriptor.resources() {
            self.localize(resource).await?;
        }
        tokio::fs::write(self.work_dir.join(CREDENTIALS_FILE), descriptor.credentials()).await?;

        let env = self.environment(&descriptor, &log_dir);
        let logs = log_dir.display().to_string();
        let resolve = |token: &str| env.expand(&token.replace(LOG_DIR, &logs));

        let mut tokens = descriptor.command().iter().map(|t| resolve(t));
        let program = tokens
            .next()
            .ok_or_else(|| LaunchError::InvalidDescriptor("command is empty".into()))?;
        let args: Vec<String> = tokens.collect();

        let stdout = tokio::fs::File::create(resolve(descriptor.stdout())).await?;
        let stderr = tokio::fs::File::create(resolve(descriptor.stderr())).await?;

        let mut cmd = Command::new(&program);
        cmd.args(&args)
            .current_dir(&self.work_dir)
            .envs(env.to_map())
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout.into_std().await))
            .stderr(Stdio::from(stderr.into_std().await));

        let mut limits = self.config.limits.clone();
        if self.config.enforce_memory {
            limits = limits.with_memory_mb(descriptor.memory_mb());
        }
        attach_limits(&mut cmd, &limits);

        debug!(%program, ?args, work_dir = %self.work_dir.display(), "spawning master");
        let child = cmd
            .spawn()
            .map_err(|e| LaunchError::SubmissionRejected(format!("failed to start '{program}': {e}")))?;
        info!(pid = ?child.id(), "master started");

        Ok(Box::new(LocalController::new(self.id, child)))
    }
}
