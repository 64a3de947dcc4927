use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    ResourceDescriptor,
    error::{ModelError, ModelResult},
};

/// Well-known artifacts produced while preparing a submission.
///
/// Each key maps to a fixed file name: the name the artifact carries once it
/// is localized into the master's working directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKey {
    /// Code closure of the master process.
    MasterPackage,
    /// Code closure shared by every worker process.
    WorkerPackage,
    /// Dependency-free bootstrap launcher.
    LauncherPackage,
    /// Rewritten application specification.
    Spec,
    /// Application and per-unit arguments.
    Arguments,
    /// Extra runtime options, only present when non-empty.
    RuntimeOptions,
    /// Logging configuration template for launched processes.
    LoggingTemplate,
    /// Artifacts the master must localize for its workers.
    LocalizeManifest,
}

impl ArtifactKey {
    pub const ALL: [ArtifactKey; 8] = [
        ArtifactKey::MasterPackage,
        ArtifactKey::WorkerPackage,
        ArtifactKey::LauncherPackage,
        ArtifactKey::Spec,
        ArtifactKey::Arguments,
        ArtifactKey::RuntimeOptions,
        ArtifactKey::LoggingTemplate,
        ArtifactKey::LocalizeManifest,
    ];

    /// Key as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKey::MasterPackage => "master-package",
            ArtifactKey::WorkerPackage => "worker-package",
            ArtifactKey::LauncherPackage => "launcher-package",
            ArtifactKey::Spec => "spec",
            ArtifactKey::Arguments => "arguments",
            ArtifactKey::RuntimeOptions => "runtime-options",
            ArtifactKey::LoggingTemplate => "logging-template",
            ArtifactKey::LocalizeManifest => "localize-manifest",
        }
    }

    /// File name on the receiving side.
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKey::MasterPackage => "master.tar",
            ArtifactKey::WorkerPackage => "worker.tar",
            ArtifactKey::LauncherPackage => "launcher.tar",
            ArtifactKey::Spec => "spec.json",
            ArtifactKey::Arguments => "arguments.json",
            ArtifactKey::RuntimeOptions => "runtime.opts",
            ArtifactKey::LoggingTemplate => "logging-template.json",
            ArtifactKey::LocalizeManifest => "localize.json",
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKey {
    type Err = ModelError;
    fn from_str(s: &str) -> ModelResult<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| ModelError::UnknownArtifact(s.to_string()))
    }
}

/// Staged artifacts accumulated across pipeline stages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactMap(BTreeMap<ArtifactKey, ResourceDescriptor>);

impl ArtifactMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact, replacing any previous entry for the key.
    pub fn insert(&mut self, key: ArtifactKey, descriptor: ResourceDescriptor) {
        self.0.insert(key, descriptor);
    }

    pub fn get(&self, key: ArtifactKey) -> Option<&ResourceDescriptor> {
        self.0.get(&key)
    }

    pub fn contains(&self, key: ArtifactKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = ArtifactKey> + '_ {
        self.0.keys().copied()
    }

    /// Descriptors in key order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.0.values()
    }

    /// Descriptors whose key is in `include`, in key order.
    pub fn select(&self, include: &[ArtifactKey]) -> Vec<ResourceDescriptor> {
        self.0
            .iter()
            .filter(|(k, _)| include.contains(k))
            .map(|(_, d)| d.clone())
            .collect()
    }
}
