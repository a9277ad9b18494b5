//! In-process store.
//!
//! Clones share the same object, so several controllers built over clones of
//! one `MemoryStore` behave like independent writers sharing a remote file.

use super::{RemoteStore, Revision, Snapshot, StoreError, StoreResult};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct Object {
    bytes: Option<Vec<u8>>,
    version: u64,
}

impl Object {
    fn revision(&self) -> Option<Revision> {
        self.bytes
            .as_ref()
            .map(|_| Revision::new(format!("rev-{}", self.version)))
    }
}

/// A store backed by shared memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    object: Arc<Mutex<Object>>,
    puts: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `bytes`.
    pub fn with_snapshot(bytes: Vec<u8>) -> Self {
        Self {
            object: Arc::new(Mutex::new(Object {
                bytes: Some(bytes),
                version: 1,
            })),
            puts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `conditional_put` calls received, successful or not.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Current stored bytes, if any.
    pub async fn contents(&self) -> Option<Vec<u8>> {
        self.object.lock().await.bytes.clone()
    }

    /// Overwrites the object unconditionally, as a misbehaving writer would.
    pub async fn force_replace(&self, bytes: Vec<u8>) -> Revision {
        let mut object = self.object.lock().await;
        object.bytes = Some(bytes);
        object.version += 1;
        Revision::new(format!("rev-{}", object.version))
    }

    /// Removes the object.
    pub async fn clear(&self) {
        self.object.lock().await.bytes = None;
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn fetch(&self) -> StoreResult<Snapshot> {
        let object = self.object.lock().await;
        match (&object.bytes, object.revision()) {
            (Some(bytes), Some(revision)) => Ok(Snapshot {
                bytes: bytes.clone(),
                revision,
            }),
            _ => Err(StoreError::NotFound),
        }
    }

    async fn conditional_put(
        &self,
        bytes: &[u8],
        expected: Option<&Revision>,
    ) -> StoreResult<Revision> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let mut object = self.object.lock().await;

        let actual = object.revision();
        if actual.as_ref() != expected {
            debug!("memory store conflict: expected {:?}, actual {:?}", expected, actual);
            return Err(StoreError::Conflict {
                expected: expected.cloned(),
                actual,
            });
        }

        object.bytes = Some(bytes.to_vec());
        object.version += 1;
        let revision = Revision::new(format!("rev-{}", object.version));
        debug!("memory store now at {}", revision);
        Ok(revision)
    }
}
