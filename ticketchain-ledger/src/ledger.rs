//! The append-only, hash-chained block sequence.

use crate::block::{Block, GENESIS_PREVIOUS_HASH, Payload, Timestamp};
use crate::error::{ChainError, LedgerResult};

/// An ordered, append-only sequence of blocks.
///
/// Index 0 is the genesis block. New blocks are only ever created by
/// [`Ledger::append`], which chains them to the current tail.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    blocks: Vec<Block>,
}

impl Ledger {
    /// Creates a ledger holding only the genesis block.
    pub fn empty_with_genesis(now: Timestamp) -> LedgerResult<Self> {
        Ok(Self {
            blocks: vec![Block::genesis(now)?],
        })
    }

    /// Wraps decoded blocks without checking chain integrity.
    pub(crate) fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// Returns a new ledger extended by one block chained to the current tail.
    ///
    /// `self` is left untouched, so a failed write never leaks a half-applied
    /// block into the caller's ledger.
    pub fn append(&self, data: Payload, now: Timestamp) -> LedgerResult<Ledger> {
        let previous_hash = self.tail_hash()?;
        let block = Block::create(data, previous_hash, now)?;

        let mut blocks = Vec::with_capacity(self.blocks.len() + 1);
        blocks.extend_from_slice(&self.blocks);
        blocks.push(block);
        Ok(Ledger { blocks })
    }

    /// Walks the chain and reports the first broken invariant.
    pub fn validate(&self) -> Result<(), ChainError> {
        let genesis = self.blocks.first().ok_or(ChainError::Empty)?;
        if genesis.previous_hash() != GENESIS_PREVIOUS_HASH {
            return Err(ChainError::GenesisLink {
                found: genesis.previous_hash().to_string(),
            });
        }
        if !genesis.data().is_genesis() {
            return Err(ChainError::GenesisPayload);
        }

        let mut expected_previous = GENESIS_PREVIOUS_HASH;
        for (index, block) in self.blocks.iter().enumerate() {
            if block.previous_hash() != expected_previous {
                return Err(ChainError::BrokenLink {
                    index,
                    expected: expected_previous.to_string(),
                    found: block.previous_hash().to_string(),
                });
            }

            let computed = block.recompute_hash().map_err(|e| ChainError::Unhashable {
                index,
                reason: e.to_string(),
            })?;
            if computed != block.hash() {
                return Err(ChainError::HashMismatch {
                    index,
                    stored: block.hash().to_string(),
                    computed,
                });
            }

            expected_previous = block.hash();
        }

        Ok(())
    }

    /// Hash of the last block, which the next block must link to.
    pub fn tail_hash(&self) -> Result<&str, ChainError> {
        self.tail().map(Block::hash).ok_or(ChainError::Empty)
    }

    /// Returns true if `prefix` is a leading run of this ledger's blocks.
    pub fn extends(&self, prefix: &Ledger) -> bool {
        self.blocks.starts_with(&prefix.blocks)
    }

    /// Position of the block with the given hash.
    pub fn position_of(&self, hash: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.hash() == hash)
    }

    pub fn tail(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
