//! File-backed store.
//!
//! The snapshot lives in a single file that several processes may share (a
//! synced folder or a network mount). The revision token is the SHA-256 of the
//! file contents. Writers serialize on an exclusive lock of `<path>.lock`,
//! compare the current revision, and atomically replace the file via a
//! temp file and rename.

use super::{RemoteStore, Revision, Snapshot, StoreError, StoreResult};
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Path of the snapshot file.
    pub path: PathBuf,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/ledger.json"),
        }
    }
}

/// A store backed by one file on a (possibly shared) filesystem.
#[derive(Debug, Clone)]
pub struct FileStore {
    config: FileStoreConfig,
}

impl FileStore {
    pub fn new(config: FileStoreConfig) -> Self {
        Self { config }
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = OsString::from(self.config.path.as_os_str());
        name.push(suffix);
        PathBuf::from(name)
    }

    fn revision_of(bytes: &[u8]) -> Revision {
        Revision::new(hex::encode(Sha256::digest(bytes)))
    }

    fn read_current(path: &Path) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Transport(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Compare-and-replace under the exclusive lock. Runs on a blocking thread.
    fn put_locked(
        path: PathBuf,
        lock_path: PathBuf,
        tmp_path: PathBuf,
        bytes: Vec<u8>,
        expected: Option<Revision>,
    ) -> StoreResult<Revision> {
        let io_err = |what: &str, e: std::io::Error| StoreError::Transport(format!("{what}: {e}"));

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_err("failed to create store folder", e))?;
        }

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| io_err("failed to open lock file", e))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| io_err("failed to acquire lock", e))?;

        let actual = Self::read_current(&path)?.map(|b| Self::revision_of(&b));
        if actual != expected {
            debug!("file store conflict: expected {:?}, actual {:?}", expected, actual);
            return Err(StoreError::Conflict { expected, actual });
        }

        let mut tmp = File::create(&tmp_path).map_err(|e| io_err("failed to create temp file", e))?;
        tmp.write_all(&bytes)
            .and_then(|()| tmp.sync_all())
            .map_err(|e| io_err("failed to write temp file", e))?;
        fs::rename(&tmp_path, &path).map_err(|e| io_err("failed to replace snapshot", e))?;

        // Lock is released when `lock_file` drops.
        drop(lock_file);
        Ok(Self::revision_of(&bytes))
    }
}

#[async_trait]
impl RemoteStore for FileStore {
    fn provider_name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self) -> StoreResult<Snapshot> {
        match tokio::fs::read(&self.config.path).await {
            Ok(bytes) => {
                let revision = Self::revision_of(&bytes);
                debug!("Read {} bytes at revision {}", bytes.len(), revision);
                Ok(Snapshot { bytes, revision })
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::Transport(format!(
                "failed to read {}: {e}",
                self.config.path.display()
            ))),
        }
    }

    async fn conditional_put(
        &self,
        bytes: &[u8],
        expected: Option<&Revision>,
    ) -> StoreResult<Revision> {
        let path = self.config.path.clone();
        let lock_path = self.sibling(".lock");
        let tmp_path = self.sibling(".tmp");
        let bytes = bytes.to_vec();
        let expected = expected.cloned();

        let revision = tokio::task::spawn_blocking(move || {
            Self::put_locked(path, lock_path, tmp_path, bytes, expected)
        })
        .await
        .map_err(|e| StoreError::Transport(format!("write task failed: {e}")))??;

        info!("Wrote snapshot {} (revision {})", self.config.path.display(), revision);
        Ok(revision)
    }
}
