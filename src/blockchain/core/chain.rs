use crate::error::ChainError;

use super::block::{Block, BlockData};

/// The ordered block sequence, genesis first.
///
/// This is the plain, unsynchronized value. Shared access goes through
/// [`ChainStore`](super::store::ChainStore), which is the only place that
/// appends to or replaces a live chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blockchain {
    pub blocks: Vec<Block>,
}

impl Blockchain {
    /// Create a chain holding only the genesis block.
    pub fn new() -> Result<Self, ChainError> {
        Ok(Blockchain {
            blocks: vec![Block::genesis()?],
        })
    }

    /// Wrap an already validated block sequence.
    pub(crate) fn from_validated(blocks: Vec<Block>) -> Self {
        Blockchain { blocks }
    }

    pub fn latest(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Append a block linked to the current tip and return a copy of it.
    pub fn add_block(&mut self, timestamp: impl Into<String>, data: BlockData) -> Result<Block, ChainError> {
        let last_block = self.latest().ok_or_else(|| {
            ChainError::InvalidChain("Cannot append; the chain has no genesis block.".to_string())
        })?;

        if data.is_genesis() {
            return Err(ChainError::InvalidChain(
                "Genesis payload can only appear at index 0.".to_string(),
            ));
        }

        let block = Block::new(last_block.index + 1, timestamp, data, last_block.hash.clone())?;
        self.blocks.push(block.clone());
        Ok(block)
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }
}
