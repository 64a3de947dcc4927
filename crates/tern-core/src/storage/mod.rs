//! Shared storage seam.
//!
//! Staged artifacts must be readable by processes on other hosts, so they are
//! written through a [`SharedStorage`] rather than to the local filesystem.
//! Concrete backends live outside this crate; [`MemoryStorage`] is provided
//! for tests and dry runs.
mod location;
pub use location::Location;

mod memory;
pub use memory::MemoryStorage;

use std::io;

use async_trait::async_trait;
use tern_model::{ResourceDescriptor, ResourceUri};

/// Metadata of a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// Last modification, milliseconds since the Unix epoch.
    pub modified_ms: u64,
    pub len: u64,
}

/// Storage addressable from every host of the cluster.
#[async_trait]
pub trait SharedStorage: Send + Sync {
    /// Backend name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// URI scheme of locations produced by this storage.
    fn scheme(&self) -> &str;

    /// Authority of locations produced by this storage, empty when unused.
    fn authority(&self) -> &str {
        ""
    }

    /// Identity owning the staged files; exported to the master as its file-system user.
    fn owner(&self) -> &str;

    /// Root location of the submitting identity.
    fn home(&self) -> Location {
        self.resolve("/")
    }

    /// Location of an absolute path inside this storage.
    fn resolve(&self, path: &str) -> Location {
        Location::new(ResourceUri::from_parts(self.scheme(), self.authority(), path))
    }

    /// Whether `uri` already points into this storage.
    fn owns(&self, uri: &ResourceUri) -> bool {
        uri.scheme() == Some(self.scheme()) && uri.authority() == self.authority()
    }

    /// Write `data`, replacing any previous content. Readers never observe a partial write.
    async fn write(&self, location: &Location, data: Vec<u8>) -> io::Result<()>;

    async fn read(&self, location: &Location) -> io::Result<Vec<u8>>;

    async fn stat(&self, location: &Location) -> io::Result<Stat>;
}

/// Write `data` under a unique name derived from `name` inside `dir`.
///
/// Returns a staged descriptor carrying the logical `name`, the written
/// location and the size/mtime reported by the storage after the write.
pub async fn stage_bytes(
    storage: &dyn SharedStorage,
    dir: &Location,
    name: &str,
    data: Vec<u8>,
) -> io::Result<ResourceDescriptor> {
    let location = dir.temp_file(name);
    storage.write(&location, data).await?;
    let stat = storage.stat(&location).await?;
    Ok(ResourceDescriptor::staged(
        name,
        location.into_uri(),
        stat.modified_ms,
        stat.len,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn staged_descriptor_reflects_written_bytes() {
        let storage = MemoryStorage::new("alice");
        let dir = storage.resolve("/app/r1");

        let d = stage_bytes(&storage, &dir, "spec.json", b"{}".to_vec())
            .await
            .unwrap();

        assert_eq!(d.name(), "spec.json");
        assert_eq!(d.size_bytes(), Some(2));
        assert!(d.uri().path().starts_with("/app/r1/spec."));
        assert!(d.uri().path().ends_with(".json"));
        assert_eq!(storage.read(&Location::new(d.uri().clone())).await.unwrap(), b"{}");
    }

    #[test]
    fn owns_checks_scheme_and_authority() {
        let storage = MemoryStorage::new("alice");
        assert!(storage.owns(&"mem:///x/y".parse().unwrap()));
        assert!(!storage.owns(&"mem://other/x/y".parse().unwrap()));
        assert!(!storage.owns(&"file:///x/y".parse().unwrap()));
        assert!(!storage.owns(&"/x/y".parse().unwrap()));
    }
}
