use std::{
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use tokio::process::Child;
use tracing::{debug, info};

use tern_core::{
    error::LaunchError,
    launch::{ProcessController, ProcessStatus},
};
use tern_model::ApplicationId;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Controller of a master running as a local subprocess.
pub struct LocalController {
    id: ApplicationId,
    child: Mutex<Child>,
}

impl LocalController {
    pub(crate) fn new(id: ApplicationId, child: Child) -> Self {
        Self {
            id,
            child: Mutex::new(child),
        }
    }

    /// OS process id, `None` once the process has been reaped.
    pub fn pid(&self) -> Option<u32> {
        self.child().ok().and_then(|child| child.id())
    }

    fn child(&self) -> Result<MutexGuard<'_, Child>, LaunchError> {
        self.child
            .lock()
            .map_err(|_| LaunchError::Controller("process handle poisoned".into()))
    }
}

#[async_trait]
impl ProcessController for LocalController {
    fn application_id(&self) -> &ApplicationId {
        &self.id
    }

    async fn status(&self) -> Result<ProcessStatus, LaunchError> {
        let status = match self.child()?.try_wait()? {
            Some(exit) => ProcessStatus::Exited { code: exit.code() },
            None => ProcessStatus::Running,
        };
        Ok(status)
    }

    async fn wait(&self) -> Result<ProcessStatus, LaunchError> {
        loop {
            let status = self.status().await?;
            if status != ProcessStatus::Running {
                info!(application_id = %self.id, %status, "master exited");
                return Ok(status);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn kill(&self) -> Result<(), LaunchError> {
        {
            let mut child = self.child()?;
            if child.try_wait()?.is_some() {
                return Ok(());
            }
            debug!(application_id = %self.id, pid = ?child.id(), "killing master");
            child.start_kill()?;
        }
        self.wait().await.map(|_| ())
    }
}
