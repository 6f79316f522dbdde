//! Proof-of-work consensus rules for powchain.
//!
//! This crate provides:
//! - The proof-of-work nonce search and predicate
//! - Chain validation (linkage + proof, reward excluded from the proof input)
//! - Transaction validation (signature and funds)
//!
//! # Example
//!
//! ```rust
//! use powchain_consensus::{ChainValidator, ProofEngine};
//! use powchain_core::Block;
//!
//! let genesis = Block::genesis();
//! let previous_hash = genesis.hash();
//!
//! // Mine an empty block (reward only) at difficulty 1
//! let engine = ProofEngine::new(1);
//! let proof = engine.mine(&[], &previous_hash);
//! assert!(engine.is_valid(&[], &previous_hash, proof));
//!
//! let block = Block::new(1, previous_hash, vec![], proof);
//! assert!(ChainValidator::verify_chain(&[genesis, block], 1));
//! ```

pub mod pow;
pub mod validator;

// Re-export commonly used types
pub use pow::{ProofEngine, STOP_CHECK_INTERVAL};
pub use validator::{ChainValidator, ValidationError};
