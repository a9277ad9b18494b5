//! Snapshot codec.
//!
//! A snapshot is a compact JSON array of block records, each with the fields
//! `timestamp`, `data`, `previous_hash`, `hash` in that order. Decoding is
//! purely structural; chain integrity is checked by [`Ledger::validate`].

use crate::block::Block;
use crate::error::{DecodeError, EncodingError};
use crate::ledger::Ledger;

/// Serializes the full block sequence.
pub fn encode(ledger: &Ledger) -> Result<Vec<u8>, EncodingError> {
    Ok(serde_json::to_vec(ledger.blocks())?)
}

/// Parses a snapshot into a ledger without validating the chain.
pub fn decode(bytes: &[u8]) -> Result<Ledger, DecodeError> {
    let blocks: Vec<Block> = serde_json::from_slice(bytes)?;
    Ok(Ledger::from_blocks(blocks))
}
