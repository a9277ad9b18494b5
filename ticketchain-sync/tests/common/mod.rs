//! Shared test helpers for sync tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use ticketchain_ledger::{Ledger, codec};
use ticketchain_sync::{
    MemoryStore, RemoteStore, Revision, Snapshot, StoreError, StoreResult, SyncConfig,
    SyncController,
};

/// Tight retry settings so failure paths finish quickly.
pub fn fast_config() -> SyncConfig {
    SyncConfig {
        max_attempts: 3,
        backoff_base_ms: 1,
        backoff_max_ms: 2,
        op_timeout_ms: 1_000,
    }
}

pub fn controller_over(store: Arc<dyn RemoteStore>) -> SyncController {
    SyncController::new(store, fast_config())
}

/// Decodes whatever the memory store currently holds.
pub async fn remote_ledger(store: &MemoryStore) -> Ledger {
    let bytes = store.contents().await.expect("store is empty");
    codec::decode(&bytes).expect("store holds a malformed snapshot")
}

/// Fails the first `fetches`/`puts` calls with a transport error without
/// touching the inner store, then delegates.
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing_fetches: AtomicUsize,
    failing_puts: AtomicUsize,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore, fetches: usize, puts: usize) -> Self {
        Self {
            inner,
            failing_fetches: AtomicUsize::new(fetches),
            failing_puts: AtomicUsize::new(puts),
        }
    }

    fn take(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl RemoteStore for FlakyStore {
    fn provider_name(&self) -> &'static str {
        "flaky"
    }

    async fn fetch(&self) -> StoreResult<Snapshot> {
        if Self::take(&self.failing_fetches) {
            return Err(StoreError::Transport("connection reset".into()));
        }
        self.inner.fetch().await
    }

    async fn conditional_put(
        &self,
        bytes: &[u8],
        expected: Option<&Revision>,
    ) -> StoreResult<Revision> {
        if Self::take(&self.failing_puts) {
            return Err(StoreError::Transport("connection reset".into()));
        }
        self.inner.conditional_put(bytes, expected).await
    }
}

/// Commits the first write, then stalls past any reasonable timeout before
/// acknowledging it.
pub struct SlowAckStore {
    pub inner: MemoryStore,
    pub stall: Duration,
    stalled: AtomicUsize,
}

impl SlowAckStore {
    pub fn new(inner: MemoryStore, stall: Duration) -> Self {
        Self {
            inner,
            stall,
            stalled: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteStore for SlowAckStore {
    fn provider_name(&self) -> &'static str {
        "slow-ack"
    }

    async fn fetch(&self) -> StoreResult<Snapshot> {
        self.inner.fetch().await
    }

    async fn conditional_put(
        &self,
        bytes: &[u8],
        expected: Option<&Revision>,
    ) -> StoreResult<Revision> {
        let revision = self.inner.conditional_put(bytes, expected).await?;
        if self.stalled.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(self.stall).await;
        }
        Ok(revision)
    }
}

/// Rejects every write as stale.
pub struct AlwaysConflictStore {
    pub inner: MemoryStore,
    pub puts: AtomicUsize,
}

impl AlwaysConflictStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            puts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteStore for AlwaysConflictStore {
    fn provider_name(&self) -> &'static str {
        "always-conflict"
    }

    async fn fetch(&self) -> StoreResult<Snapshot> {
        self.inner.fetch().await
    }

    async fn conditional_put(
        &self,
        _bytes: &[u8],
        expected: Option<&Revision>,
    ) -> StoreResult<Revision> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Conflict {
            expected: expected.cloned(),
            actual: Some(Revision::new("someone-else")),
        })
    }
}

/// Commits writes but reports every put as a transport failure, and stops
/// answering fetches once the first write has been committed.
pub struct LostAckStore {
    pub inner: MemoryStore,
    committed: AtomicUsize,
}

impl LostAckStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            committed: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RemoteStore for LostAckStore {
    fn provider_name(&self) -> &'static str {
        "lost-ack"
    }

    async fn fetch(&self) -> StoreResult<Snapshot> {
        if self.committed.load(Ordering::SeqCst) > 0 {
            return Err(StoreError::Transport("network down".into()));
        }
        self.inner.fetch().await
    }

    async fn conditional_put(
        &self,
        bytes: &[u8],
        expected: Option<&Revision>,
    ) -> StoreResult<Revision> {
        self.inner.conditional_put(bytes, expected).await?;
        self.committed.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Transport("network down".into()))
    }
}
