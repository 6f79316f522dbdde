//! Core ledger primitives for powchain.
//!
//! This crate provides the fundamental types used throughout the node:
//! - SHA-256 hashing
//! - Transactions and participant identities
//! - Blocks, the genesis constant and the canonical block hash
//! - Signing/verification capabilities (Ed25519 by default)

pub mod block;
pub mod crypto;
pub mod hash;
pub mod transaction;

// Re-export commonly used types at the crate root
pub use block::{Block, GENESIS_PROOF};
pub use crypto::{CryptoError, Ed25519Verifier, Keypair, PublicKey, Signature, SignatureVerifier, WalletSigner};
pub use hash::{hash, Hash};
pub use transaction::{canonical_json, Identity, Transaction, REWARD_SENDER};
