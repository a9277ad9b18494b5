//! Tamper-evident booking ledger for TicketChain.
//!
//! This crate holds the data structure at the heart of TicketChain:
//! - [`Block`]: an immutable record whose SHA-256 hash binds it to its predecessor
//! - [`Ledger`]: the append-only block sequence and its integrity checks
//! - [`codec`]: the persisted snapshot format
//!
//! It has no knowledge of where snapshots are stored. Synchronization with a
//! shared store lives in `ticketchain-sync`.
//!
//! # Hashing
//!
//! A block's hash is the lowercase hex SHA-256 of the RFC 8785 canonical JSON
//! of `{"data", "previous_hash", "timestamp"}`. Any implementation that
//! canonicalizes the same way computes the same hashes.
//!
//! # Example
//!
//! ```
//! use ticketchain_ledger::{Ledger, Payload, Timestamp};
//! use serde_json::json;
//!
//! let ledger = Ledger::empty_with_genesis(Timestamp::now()).unwrap();
//! let ledger = ledger
//!     .append(Payload::from_fields([("name", json!("Alice"))]), Timestamp::now())
//!     .unwrap();
//!
//! assert_eq!(ledger.len(), 2);
//! assert!(ledger.validate().is_ok());
//! ```

mod block;
mod canonical;
pub mod codec;
mod error;
mod ledger;

pub use block::{Block, GENESIS_DATA, GENESIS_PREVIOUS_HASH, Payload, Timestamp, compute_hash};
pub use canonical::canonical_bytes;
pub use error::{ChainError, DecodeError, EncodingError, LedgerError, LedgerResult};
pub use ledger::Ledger;
