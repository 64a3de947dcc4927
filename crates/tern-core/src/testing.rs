//! Fixtures shared by unit tests.
use std::{
    collections::BTreeMap,
    io,
    path::Path,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU32, Ordering},
    },
};

use async_trait::async_trait;
use tern_model::{ApplicationId, ApplicationSpec, ResourceUri};

use crate::{
    bundle::{ArtifactNode, DependencyGraph},
    error::LaunchError,
    fetch::{ResourceFetcher, unsupported},
    launch::{ClusterClient, LaunchDescriptor, ProcessController, ProcessLauncher, ProcessStatus},
};

/// Fetcher serving fixed contents by URI.
#[derive(Clone, Default)]
pub(crate) struct MapFetcher {
    files: BTreeMap<String, Vec<u8>>,
}

impl MapFetcher {
    pub(crate) fn with(mut self, uri: &str, data: Vec<u8>) -> Self {
        self.files.insert(uri.to_string(), data);
        self
    }
}

#[async_trait]
impl ResourceFetcher for MapFetcher {
    fn name(&self) -> &'static str {
        "map"
    }

    fn supports(&self, uri: &ResourceUri) -> bool {
        matches!(uri.scheme(), None | Some("file"))
    }

    async fn fetch(&self, uri: &ResourceUri) -> io::Result<Vec<u8>> {
        if !self.supports(uri) {
            return Err(unsupported(self, uri));
        }
        self.files
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, uri.to_string()))
    }
}

/// Graph used by preparer tests; every node is backed by a file in `dir`.
///
/// `app.a` and `app.b` share `lib.shared`, which cycles back to `app.b`.
pub(crate) fn graph(dir: &Path) -> DependencyGraph {
    let node = |id: &str| {
        let path = dir.join(id);
        std::fs::write(&path, id).unwrap();
        ArtifactNode::new(id, path)
    };
    DependencyGraph::new()
        .with(node("tern.master").requires(["tern.common"]))
        .with(node("tern.container").requires(["tern.common"]))
        .with(node("tern.common"))
        .with(node("tern.client.fake"))
        .with(node("tern.launcher"))
        .with(node("app.a").requires(["lib.shared"]))
        .with(node("app.b").requires(["lib.shared"]))
        .with(node("app.handler"))
        .with(node("lib.shared").requires(["app.b"]))
        .with(node("lib.extra"))
}

/// Cluster that records launch descriptors instead of starting anything.
#[derive(Default)]
pub(crate) struct FakeCluster {
    pub(crate) launched: Arc<Mutex<Vec<LaunchDescriptor>>>,
    pub(crate) reject: Option<String>,
    next: AtomicU32,
}

impl FakeCluster {
    pub(crate) fn rejecting(reason: &str) -> Self {
        Self {
            reject: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn launched(&self) -> Vec<LaunchDescriptor> {
        self.launched.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn client_artifact(&self) -> Option<&str> {
        Some("tern.client.fake")
    }

    async fn create_launcher(
        &self,
        _user: &str,
        _spec: &ApplicationSpec,
    ) -> Result<Box<dyn ProcessLauncher>, LaunchError> {
        let seq = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Box::new(FakeLauncher {
            id: ApplicationId::new(format!("application_0_{seq:04}")),
            launched: self.launched.clone(),
            reject: self.reject.clone(),
        }))
    }
}

struct FakeLauncher {
    id: ApplicationId,
    launched: Arc<Mutex<Vec<LaunchDescriptor>>>,
    reject: Option<String>,
}

#[async_trait]
impl ProcessLauncher for FakeLauncher {
    fn application_id(&self) -> &ApplicationId {
        &self.id
    }

    async fn launch(
        self: Box<Self>,
        descriptor: LaunchDescriptor,
    ) -> Result<Box<dyn ProcessController>, LaunchError> {
        if let Some(reason) = &self.reject {
            return Err(LaunchError::SubmissionRejected(reason.clone()));
        }
        self.launched.lock().unwrap().push(descriptor);
        Ok(Box::new(FakeController { id: self.id }))
    }
}

struct FakeController {
    id: ApplicationId,
}

#[async_trait]
impl ProcessController for FakeController {
    fn application_id(&self) -> &ApplicationId {
        &self.id
    }

    async fn status(&self) -> Result<ProcessStatus, LaunchError> {
        Ok(ProcessStatus::Running)
    }

    async fn wait(&self) -> Result<ProcessStatus, LaunchError> {
        Ok(ProcessStatus::Exited { code: Some(0) })
    }

    async fn kill(&self) -> Result<(), LaunchError> {
        Ok(())
    }
}
