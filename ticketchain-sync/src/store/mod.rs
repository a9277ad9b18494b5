//! Remote store abstraction.
//!
//! A remote store holds one snapshot object plus a revision token, and
//! replaces the object only when the caller's token is still current. Stores
//! know nothing about blocks or ledgers; they move opaque bytes.

pub mod file;
pub mod memory;

pub use file::{FileStore, FileStoreConfig};
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by a [`RemoteStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Nothing has been persisted yet.
    #[error("snapshot not found")]
    NotFound,

    /// The object changed since the caller last observed it. Nothing was written.
    #[error("revision conflict: expected {expected:?}, found {actual:?}")]
    Conflict {
        expected: Option<Revision>,
        actual: Option<Revision>,
    },

    /// Network or I/O failure. For writes the outcome is unknown.
    #[error("transport error: {0}")]
    Transport(String),

    /// The operation did not finish in time. For writes the outcome is unknown.
    #[error("operation timed out")]
    Timeout,
}

impl StoreError {
    /// Returns true if a write that failed this way may still have landed.
    pub fn is_unknown_outcome(&self) -> bool {
        matches!(self, StoreError::Transport(_) | StoreError::Timeout)
    }
}

/// Opaque version marker of the stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fetched snapshot and the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub bytes: Vec<u8>,
    pub revision: Revision,
}

/// A shared object with a revision token and conditional replace.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Returns the name of the store backend.
    fn provider_name(&self) -> &'static str;

    /// Reads the current snapshot, or `NotFound` if nothing was written yet.
    async fn fetch(&self) -> StoreResult<Snapshot>;

    /// Replaces the snapshot only if its revision still equals `expected`.
    ///
    /// `expected = None` succeeds only while nothing has been written. On
    /// mismatch returns `Conflict` without writing.
    async fn conditional_put(
        &self,
        bytes: &[u8],
        expected: Option<&Revision>,
    ) -> StoreResult<Revision>;
}
