//! Chain and transaction validation rules.
//!
//! Nothing here mutates state: validation only reports whether a candidate
//! block, chain or transaction is acceptable.

use crate::pow::ProofEngine;
use powchain_core::{Block, Identity, SignatureVerifier, Transaction};
use thiserror::Error;

/// Errors that can occur during validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("block index {found} does not follow its predecessor (expected {expected})")]
    UnexpectedIndex { expected: u64, found: u64 },

    #[error("block {index}: previous_hash does not match its predecessor's hash")]
    BrokenLinkage { index: u64 },

    #[error("block {index}: proof number {proof_number} does not satisfy the difficulty")]
    InvalidProof { index: u64, proof_number: u64 },

    #[error("transaction signature verification failed")]
    InvalidSignature,

    #[error("insufficient funds (required {required}, available {available})")]
    InsufficientFunds { required: f64, available: f64 },

    #[error("invalid transaction amount: {0}")]
    InvalidAmount(f64),

    #[error("reward transactions cannot be submitted")]
    RewardNotAllowed,

    #[error("transaction is already pending")]
    DuplicateTransaction,

    #[error("chain is empty")]
    EmptyChain,

    #[error("first block is not the genesis block")]
    InvalidGenesis,
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Chain validator.
pub struct ChainValidator;

impl ChainValidator {
    /// Validate a block as the successor of `predecessor`: index, linkage,
    /// then the proof over all but its last transaction.
    pub fn check_block(block: &Block, predecessor: &Block, difficulty: usize) -> Result<()> {
        let expected = predecessor.index + 1;
        if block.index != expected {
            return Err(ValidationError::UnexpectedIndex {
                expected,
                found: block.index,
            });
        }

        if block.previous_hash != predecessor.hash() {
            return Err(ValidationError::BrokenLinkage { index: block.index });
        }

        let engine = ProofEngine::new(difficulty);
        if !engine.is_valid(block.proof_transactions(), &block.previous_hash, block.proof_number) {
            return Err(ValidationError::InvalidProof {
                index: block.index,
                proof_number: block.proof_number,
            });
        }

        Ok(())
    }

    /// Validate a whole chain, stopping at the first bad block.
    ///
    /// The first block must be the genesis block; it is not checked for
    /// linkage or proof.
    pub fn check_chain(chain: &[Block], difficulty: usize) -> Result<()> {
        let genesis = chain.first().ok_or(ValidationError::EmptyChain)?;
        if !genesis.is_genesis() {
            return Err(ValidationError::InvalidGenesis);
        }

        for pair in chain.windows(2) {
            Self::check_block(&pair[1], &pair[0], difficulty)?;
        }

        Ok(())
    }

    pub fn verify_chain(chain: &[Block], difficulty: usize) -> bool {
        Self::check_chain(chain, difficulty).is_ok()
    }

    /// Validate a transaction's signature and, with `check_funds`, that the
    /// sender can cover the amount.
    pub fn check_transaction<F>(
        tx: &Transaction,
        verifier: &dyn SignatureVerifier,
        balance_of: F,
        check_funds: bool,
    ) -> Result<()>
    where
        F: Fn(&Identity) -> f64,
    {
        if check_funds {
            let available = balance_of(&tx.sender);
            if available < tx.amount {
                return Err(ValidationError::InsufficientFunds {
                    required: tx.amount,
                    available,
                });
            }
        }

        if !verifier.verify(tx) {
            return Err(ValidationError::InvalidSignature);
        }

        Ok(())
    }

    pub fn verify_transaction<F>(
        tx: &Transaction,
        verifier: &dyn SignatureVerifier,
        balance_of: F,
        check_funds: bool,
    ) -> bool
    where
        F: Fn(&Identity) -> f64,
    {
        Self::check_transaction(tx, verifier, balance_of, check_funds).is_ok()
    }
}
