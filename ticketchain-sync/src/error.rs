//! Error types for the sync layer.

use crate::store::StoreError;
use thiserror::Error;
use ticketchain_ledger::{ChainError, DecodeError, EncodingError, LedgerError};

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the [`SyncController`](crate::SyncController).
///
/// Every variant leaves the in-memory ledger without the rejected booking.
/// Only [`SyncError::OutcomeUnknown`] leaves the shared store in doubt.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The booking request was rejected before any block was built.
    #[error("invalid booking: {0}")]
    InvalidBooking(String),

    /// `book`, `submit` or `reload` was called before a successful `start`.
    #[error("controller not started")]
    NotStarted,

    /// The payload cannot be canonicalized.
    #[error("encoding error: {0}")]
    Encoding(#[from] EncodingError),

    /// An internally built ledger broke a chain invariant.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// The remote snapshot is malformed, fails validation, or rewrote
    /// acknowledged history. Never repaired automatically.
    #[error("integrity failure: {0}")]
    Integrity(String),

    /// The store kept failing until the attempt budget ran out. Nothing from
    /// this request was stored.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: StoreError },

    /// A write timed out or failed in transit and no later read could tell
    /// whether it was stored. The block may be in the shared store already, so
    /// reload before booking again.
    #[error("outcome unknown after {attempts} attempts, block {block_hash} may be stored: {last}")]
    OutcomeUnknown {
        attempts: u32,
        block_hash: String,
        last: StoreError,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A store failure outside the retry loop.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    pub(crate) fn integrity_from_decode(err: DecodeError) -> Self {
        SyncError::Integrity(format!("remote snapshot undecodable: {err}"))
    }

    pub(crate) fn integrity_from_chain(err: ChainError) -> Self {
        SyncError::Integrity(format!("remote snapshot invalid at block {}: {err}", err.index()))
    }

    /// Returns true for failures that indicate corrupt data or a logic defect
    /// rather than a transient condition.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Chain(_) | SyncError::Integrity(_) | SyncError::Encoding(_)
        )
    }
}

impl From<LedgerError> for SyncError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Encoding(e) => SyncError::Encoding(e),
            LedgerError::Chain(e) => SyncError::Chain(e),
            LedgerError::Decode(e) => SyncError::integrity_from_decode(e),
        }
    }
}
