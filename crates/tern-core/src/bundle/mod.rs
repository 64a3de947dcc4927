//! Dependency closure bundler.
//!
//! Packages the transitive code closure of a set of entry points into one
//! self-contained archive. The dependency graph is static: it is loaded or
//! assembled before submission and never discovered at runtime.
mod archive;
pub use archive::MANIFEST_ENTRY;

mod graph;
pub use graph::{ArtifactNode, DependencyGraph};

use std::{io, sync::Arc};

use tokio::task::spawn_blocking;
use tracing::{debug, instrument};

use crate::error::BundleError;

/// Archive member holding the launcher's extra class paths.
pub const CLASSPATH_ENTRY: &str = "classpath";

/// What to package.
#[derive(Clone, Debug, Default)]
pub struct BundleRequest {
    entries: Vec<String>,
    resources: Vec<(String, Vec<u8>)>,
    files: Vec<(String, Vec<u8>)>,
    restrict_to: Option<String>,
}

impl BundleRequest {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add a resource packaged verbatim under `resources/<name>`.
    pub fn with_resource(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.resources.push((name.into(), data));
        self
    }

    /// Add a root-level member.
    pub fn with_file(mut self, name: impl Into<String>, data: Vec<u8>) -> Self {
        self.files.push((name.into(), data));
        self
    }

    /// Require every packaged artifact to live under `prefix`.
    pub fn restrict_to(mut self, prefix: impl Into<String>) -> Self {
        self.restrict_to = Some(prefix.into());
        self
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// A built archive.
#[derive(Clone, Debug)]
pub struct Bundle {
    pub bytes: Vec<u8>,
    /// Packaged artifact ids in closure order.
    pub artifacts: Vec<String>,
}

/// Computes closures over a shared [`DependencyGraph`] and packages them.
#[derive(Clone)]
pub struct Bundler {
    graph: Arc<DependencyGraph>,
    excludes: Vec<String>,
}

impl Bundler {
    pub fn new(graph: Arc<DependencyGraph>) -> Self {
        Self {
            graph,
            excludes: Vec::new(),
        }
    }

    /// Skip artifacts whose id starts with one of `prefixes`; they are provided by the runtime.
    pub fn with_excludes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(prefixes.into_iter().map(Into::into));
        self
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Transitive closure of `entries`, each artifact once.
    pub fn closure<S: AsRef<str>>(&self, entries: &[S]) -> Result<Vec<ArtifactNode>, BundleError> {
        Ok(self
            .graph
            .closure(entries, &self.excludes)?
            .into_iter()
            .cloned()
            .collect())
    }

    /// Resolve the closure, then build the archive off the async runtime.
    ///
    /// Nothing is written anywhere: a resolution failure leaves no trace.
    #[instrument(level = "debug", skip_all, fields(entries = ?request.entries))]
    pub async fn create_bundle(&self, request: BundleRequest) -> Result<Bundle, BundleError> {
        let closure = self.closure(request.entries.as_slice())?;

        if let Some(prefix) = &request.restrict_to {
            if let Some(foreign) = closure.iter().find(|n| !n.id.starts_with(prefix.as_str())) {
                return Err(BundleError::LauncherHasDependencies {
                    artifact: foreign.id.clone(),
                });
            }
        }

        let artifacts: Vec<String> = closure.iter().map(|n| n.id.clone()).collect();
        let bytes = spawn_blocking(move || {
            archive::write_archive(&request.entries, &closure, &request.resources, &request.files)
        })
        .await
        .map_err(io::Error::from)??;

        debug!(artifacts = artifacts.len(), bytes = bytes.len(), "bundle created");
        Ok(Bundle { bytes, artifacts })
    }
}
