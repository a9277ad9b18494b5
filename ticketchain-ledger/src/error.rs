//! Error types for the ledger layer.

use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// A payload could not be brought into canonical form.
#[derive(Debug, Error)]
pub enum EncodingError {
    /// Non-integer numbers have no portable canonical text form.
    #[error("non-integer number {0} cannot be canonicalized")]
    FloatRejected(f64),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A chain-integrity invariant does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The ledger has no genesis block.
    #[error("ledger is empty")]
    Empty,

    /// The genesis block does not link to the sentinel hash.
    #[error("genesis block links to {found:?} instead of the sentinel")]
    GenesisLink { found: String },

    /// The first block does not carry the genesis payload.
    #[error("block 0 is not the genesis block")]
    GenesisPayload,

    /// A block's `previous_hash` does not match its predecessor's hash.
    #[error("block {index} links to {found} but predecessor hash is {expected}")]
    BrokenLink {
        index: usize,
        expected: String,
        found: String,
    },

    /// A block's stored hash differs from the hash recomputed from its fields.
    #[error("block {index} hash mismatch: stored {stored}, computed {computed}")]
    HashMismatch {
        index: usize,
        stored: String,
        computed: String,
    },

    /// A block's fields cannot be re-canonicalized for verification.
    #[error("block {index} cannot be re-hashed: {reason}")]
    Unhashable { index: usize, reason: String },
}

impl ChainError {
    /// Returns the index at which the chain breaks.
    pub fn index(&self) -> usize {
        match self {
            ChainError::Empty | ChainError::GenesisLink { .. } | ChainError::GenesisPayload => {
                0
            }
            ChainError::BrokenLink { index, .. }
            | ChainError::HashMismatch { index, .. }
            | ChainError::Unhashable { index, .. } => *index,
        }
    }
}

/// A persisted snapshot is structurally malformed.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Bytes are not a well-formed block sequence.
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors that can occur in ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
