//! Sync configuration.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Retry and timeout settings for the sync controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum store attempts per `start` or `book` call.
    pub max_attempts: u32,
    /// Initial backoff after a transport failure (ms). Doubles per attempt.
    pub backoff_base_ms: u64,
    /// Upper bound on a single backoff (ms).
    pub backoff_max_ms: u64,
    /// Timeout for each store operation (ms).
    pub op_timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base_ms: 100,
            backoff_max_ms: 2_000,
            op_timeout_ms: 10_000,
        }
    }
}

impl SyncConfig {
    /// Loads a config from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let raw = std::fs::read(path).map_err(|e| {
            SyncError::Config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    /// Parses a config from JSON bytes.
    pub fn from_json(raw: &[u8]) -> SyncResult<Self> {
        let config: Self = serde_json::from_slice(raw)
            .map_err(|e| SyncError::Config(e.to_string()))?;
        Ok(config.sanitized())
    }

    fn sanitized(mut self) -> Self {
        self.max_attempts = self.max_attempts.max(1);
        self.backoff_max_ms = self.backoff_max_ms.max(self.backoff_base_ms);
        self
    }

    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }

    /// Backoff before the given retry (1-based), capped at `backoff_max_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let ms = self.backoff_base_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(ms.min(self.backoff_max_ms))
    }
}
