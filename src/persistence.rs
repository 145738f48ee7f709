//! Chain storage for Starchain
//!
//! The ledger only ever appends, so storage is an append-only log: there is no way
//! to overwrite or remove a block once it is in. `InMemoryStore` is the only backend
//! shipped; a durable one (e.g. a write-ahead log) plugs in behind the same trait.

use crate::blockchain::Block;
use crate::error::Result;

/// Abstraction for chain storage backends. Index `i` holds the block at height `i`.
pub trait ChainStore: Send + Sync {
    /// Append a committed block at the tail. A failed append must leave the log unchanged.
    fn append(&mut self, block: Block) -> Result<()>;

    fn get(&self, index: usize) -> Option<&Block>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn last(&self) -> Option<&Block> {
        self.len().checked_sub(1).and_then(|i| self.get(i))
    }
}

/// Simple in-memory store, the default for ephemeral runs and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    blocks: Vec<Block>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate from an existing block sequence, e.g. one exported with `Blockchain::blocks`.
    /// Nothing is checked here; `Blockchain::validate_chain` reports any damage.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }
}

impl ChainStore for InMemoryStore {
    fn append(&mut self, block: Block) -> Result<()> {
        self.blocks.push(block);
        Ok(())
    }

    fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    fn len(&self) -> usize {
        self.blocks.len()
    }
}
