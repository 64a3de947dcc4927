use std::io;

use async_trait::async_trait;
use tern_model::ResourceUri;

/// Reads resources that live outside the shared storage.
///
/// Used by the localizer for every declared resource the shared storage does
/// not already own, and by the bundler for caller-supplied extra resources.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetcher name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Returns `true` if this fetcher can read `uri`.
    fn supports(&self, uri: &ResourceUri) -> bool;

    /// Full content of `uri`.
    ///
    /// Fails with [`io::ErrorKind::Unsupported`] when [`Self::supports`] is `false`.
    async fn fetch(&self, uri: &ResourceUri) -> io::Result<Vec<u8>>;
}

/// Error returned for a URI the fetcher cannot read.
pub fn unsupported(fetcher: &dyn ResourceFetcher, uri: &ResourceUri) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("fetcher '{}' cannot read '{uri}'", fetcher.name()),
    )
}
