use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tracing::trace;

use tern_core::fetch::{ResourceFetcher, unsupported};
use tern_model::ResourceUri;

/// Reads `file://` URIs and bare paths from the submitting host.
#[derive(Debug, Clone, Default)]
pub struct LocalFetcher {
    base: Option<PathBuf>,
}

impl LocalFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative bare paths against `dir` instead of the working directory.
    pub fn with_base(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base = Some(dir.into());
        self
    }

    fn path_of(&self, uri: &ResourceUri) -> PathBuf {
        let path = Path::new(uri.path());
        match &self.base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl ResourceFetcher for LocalFetcher {
    fn name(&self) -> &'static str {
        "local-file"
    }

    fn supports(&self, uri: &ResourceUri) -> bool {
        match uri.scheme() {
            None => true,
            Some("file") => uri.authority().is_empty() || uri.authority() == "localhost",
            Some(_) => false,
        }
    }

    async fn fetch(&self, uri: &ResourceUri) -> io::Result<Vec<u8>> {
        if !self.supports(uri) {
            return Err(unsupported(self, uri));
        }
        let path = self.path_of(uri);
        trace!(path = %path.display(), "fetching local resource");
        tokio::fs::read(&path).await
    }
}
