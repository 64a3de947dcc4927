use std::{
    collections::BTreeMap,
    io,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;

use super::{Location, SharedStorage, Stat};

struct Object {
    data: Vec<u8>,
    modified_ms: u64,
}

/// In-process [`SharedStorage`] keyed by path.
///
/// Only reachable from the current process; intended for tests and dry runs.
pub struct MemoryStorage {
    owner: String,
    objects: Mutex<BTreeMap<String, Object>>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub const SCHEME: &'static str = "mem";

    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            objects: Mutex::new(BTreeMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Seed an object without counting it as a write.
    pub fn insert(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.objects().insert(
            path.to_string(),
            Object {
                data: data.into(),
                modified_ms: now_ms(),
            },
        );
    }

    /// Stored paths in lexical order.
    pub fn paths(&self) -> Vec<String> {
        self.objects().keys().cloned().collect()
    }

    /// Number of [`SharedStorage::write`] calls served so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<String, Object>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn not_found(location: &Location) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("{location} not found"))
}

#[async_trait]
impl SharedStorage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn scheme(&self) -> &str {
        Self::SCHEME
    }

    fn owner(&self) -> &str {
        &self.owner
    }

    async fn write(&self, location: &Location, data: Vec<u8>) -> io::Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.objects().insert(
            location.path().to_string(),
            Object {
                data,
                modified_ms: now_ms(),
            },
        );
        Ok(())
    }

    async fn read(&self, location: &Location) -> io::Result<Vec<u8>> {
        self.objects()
            .get(location.path())
            .map(|o| o.data.clone())
            .ok_or_else(|| not_found(location))
    }

    async fn stat(&self, location: &Location) -> io::Result<Stat> {
        self.objects()
            .get(location.path())
            .map(|o| Stat {
                modified_ms: o.modified_ms,
                len: o.data.len() as u64,
            })
            .ok_or_else(|| not_found(location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_stat() {
        let storage = MemoryStorage::new("alice");
        let loc = storage.resolve("/a/b.txt");

        storage.write(&loc, b"hello".to_vec()).await.unwrap();

        let stat = storage.stat(&loc).await.unwrap();
        assert_eq!(stat.len, 5);
        assert!(stat.modified_ms > 0);
        assert_eq!(storage.write_count(), 1);
        assert_eq!(storage.paths(), vec!["/a/b.txt"]);
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let storage = MemoryStorage::new("alice");
        let err = storage.stat(&storage.resolve("/nope")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn seeded_objects_are_not_counted() {
        let storage = MemoryStorage::new("alice");
        storage.insert("/shared/lib.tgz", vec![0u8; 10]);

        assert_eq!(storage.write_count(), 0);
        let stat = storage.stat(&storage.resolve("/shared/lib.tgz")).await.unwrap();
        assert_eq!(stat.len, 10);
    }
}
