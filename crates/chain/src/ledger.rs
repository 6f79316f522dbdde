//! The committed chain of blocks.

use powchain_consensus::{ChainValidator, ValidationError};
use powchain_core::Block;

/// Owns the ordered sequence of committed blocks.
///
/// The ledger is never empty: it starts at (and always begins with) the
/// genesis block. Blocks are linked by [`Block::hash`].
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    difficulty: usize,
}

impl Ledger {
    /// Create a genesis-only ledger.
    pub fn new(difficulty: usize) -> Self {
        Self {
            chain: vec![Block::genesis()],
            difficulty,
        }
    }

    /// Rebuild a ledger from previously committed blocks.
    pub fn from_chain(chain: Vec<Block>, difficulty: usize) -> Result<Self, ValidationError> {
        let first = chain.first().ok_or(ValidationError::EmptyChain)?;
        if !first.is_genesis() {
            return Err(ValidationError::InvalidGenesis);
        }
        Ok(Self { chain, difficulty })
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false once constructed.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Borrow the committed blocks.
    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    /// The most recently committed block.
    pub fn last_block(&self) -> &Block {
        self.chain.last().expect("ledger always holds the genesis block")
    }

    /// Hash of the most recently committed block.
    pub fn last_hash(&self) -> String {
        self.last_block().hash()
    }

    /// Append a block that links to the tip and carries a valid proof.
    pub fn append(&mut self, block: Block) -> Result<(), ValidationError> {
        ChainValidator::check_block(&block, self.last_block(), self.difficulty)?;
        self.chain.push(block);
        Ok(())
    }

    /// Swap in a whole new chain.
    pub fn replace(&mut self, chain: Vec<Block>) -> Result<(), ValidationError> {
        let first = chain.first().ok_or(ValidationError::EmptyChain)?;
        if !first.is_genesis() {
            return Err(ValidationError::InvalidGenesis);
        }
        self.chain = chain;
        Ok(())
    }

    /// Owned copy of the chain.
    pub fn snapshot(&self) -> Vec<Block> {
        self.chain.clone()
    }
}
