use std::{
    io,
    path::{Component, Path, PathBuf},
    time::UNIX_EPOCH,
};

use async_trait::async_trait;
use tracing::trace;
use uuid::Uuid;

use tern_core::storage::{Location, SharedStorage, Stat};

use crate::error::LocalError;

/// Shared storage backed by a directory visible to every process on this host.
///
/// Locations look like `shared:///<path>` and map to `<root>/<path>`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    owner: String,
}

impl LocalStorage {
    pub const SCHEME: &'static str = "shared";

    pub fn new(root: impl Into<PathBuf>, owner: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            owner: owner.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of `location`.
    ///
    /// Locations of another scheme and paths with `..` segments are rejected.
    pub fn file_path(&self, location: &Location) -> Result<PathBuf, LocalError> {
        if !self.owns(location.uri()) {
            return Err(LocalError::PathEscape(location.to_string()));
        }
        let relative = Path::new(location.path().trim_start_matches('/'));
        let mut out = self.root.clone();
        for part in relative.components() {
            match part {
                Component::Normal(p) => out.push(p),
                Component::CurDir => {}
                _ => return Err(LocalError::PathEscape(location.to_string())),
            }
        }
        Ok(out)
    }

    fn path_of(&self, location: &Location) -> io::Result<PathBuf> {
        self.file_path(location)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
    }
}

#[async_trait]
impl SharedStorage for LocalStorage {
    fn name(&self) -> &'static str {
        "local"
    }

    fn scheme(&self) -> &str {
        Self::SCHEME
    }

    fn owner(&self) -> &str {
        &self.owner
    }

    async fn write(&self, location: &Location, data: Vec<u8>) -> io::Result<()> {
        let path = self.path_of(location)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Rename is atomic within one directory, readers see old or new content only.
        let tmp = path.with_file_name(format!(
            ".{}.{}.part",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("object"),
            Uuid::new_v4().simple()
        ));
        tokio::fs::write(&tmp, &data).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }

        trace!(path = %path.display(), bytes = data.len(), "object written");
        Ok(())
    }

    async fn read(&self, location: &Location) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.path_of(location)?).await
    }

    async fn stat(&self, location: &Location) -> io::Result<Stat> {
        let meta = tokio::fs::metadata(self.path_of(location)?).await?;
        let modified_ms = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Ok(Stat {
            modified_ms,
            len: meta.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_core::storage::stage_bytes;
    use tern_model::ResourceUri;

    #[tokio::test]
    async fn write_then_read_and_stat() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "alice");
        let loc = storage.resolve("/app/r1/spec.json");

        storage.write(&loc, b"{}".to_vec()).await.unwrap();

        assert_eq!(storage.read(&loc).await.unwrap(), b"{}");
        assert_eq!(storage.stat(&loc).await.unwrap().len, 2);
        assert!(dir.path().join("app/r1/spec.json").is_file());
    }

    #[tokio::test]
    async fn overwrite_leaves_no_partial_files() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "alice");
        let loc = storage.resolve("/a/x.bin");

        storage.write(&loc, vec![1; 10]).await.unwrap();
        storage.write(&loc, vec![2; 4]).await.unwrap();

        assert_eq!(storage.read(&loc).await.unwrap(), vec![2; 4]);
        let names: Vec<_> = std::fs::read_dir(dir.path().join("a"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["x.bin".to_string()]);
    }

    #[tokio::test]
    async fn stage_bytes_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "alice");

        let d = stage_bytes(&storage, &storage.resolve("/app/r1"), "cfg.yaml", vec![b'c'; 120])
            .await
            .unwrap();

        assert_eq!(d.size_bytes(), Some(120));
        assert!(d.last_modified().unwrap() > 0);
        assert_eq!(d.uri().scheme(), Some("shared"));
    }

    #[test]
    fn rejects_escaping_and_foreign_locations() {
        let storage = LocalStorage::new("/srv/tern", "alice");

        let up = Location::new(ResourceUri::from_parts("shared", "", "/a/../../etc/passwd"));
        assert!(matches!(storage.file_path(&up), Err(LocalError::PathEscape(_))));

        let foreign = Location::new(ResourceUri::from_parts("mem", "", "/a"));
        assert!(storage.file_path(&foreign).is_err());

        let ok = storage.resolve("/a/./b");
        assert_eq!(storage.file_path(&ok).unwrap(), PathBuf::from("/srv/tern/a/b"));
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "alice");
        let err = storage.stat(&storage.resolve("/nope")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
