//! Block structure, the genesis constant and the canonical block hash.

use crate::hash::hash;
use crate::transaction::{CanonicalTransaction, Transaction};
use serde::{Deserialize, Serialize};

/// Proof number carried by the genesis block.
pub const GENESIS_PROOF: u64 = 100;

/// A block of transactions linked to its predecessor.
///
/// Field declaration order is the persisted and wire order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Position in the chain (0 for genesis).
    pub index: u64,
    /// Canonical hash of the previous block (empty for genesis).
    pub previous_hash: String,
    /// Ordered transactions; the last one is the mining reward.
    pub transactions: Vec<Transaction>,
    /// Nonce satisfying the proof-of-work predicate.
    pub proof_number: u64,
    /// Unix timestamp in seconds.
    pub timestamp: f64,
}

/// Borrowed canonical form with keys in sorted order.
#[derive(Serialize)]
struct CanonicalBlock<'a> {
    index: u64,
    previous_hash: &'a str,
    proof_number: u64,
    timestamp: f64,
    transactions: Vec<CanonicalTransaction<'a>>,
}

impl Block {
    /// Create a block stamped with the current time.
    pub fn new(
        index: u64,
        previous_hash: String,
        transactions: Vec<Transaction>,
        proof_number: u64,
    ) -> Self {
        Self {
            index,
            previous_hash,
            transactions,
            proof_number,
            timestamp: Self::current_timestamp(),
        }
    }

    /// The fixed genesis block every chain starts with.
    pub fn genesis() -> Self {
        Self {
            index: 0,
            previous_hash: String::new(),
            transactions: Vec::new(),
            proof_number: GENESIS_PROOF,
            timestamp: 0.0,
        }
    }

    /// Check if this block is exactly the genesis block.
    pub fn is_genesis(&self) -> bool {
        *self == Self::genesis()
    }

    /// Current Unix time in seconds, with sub-second precision.
    pub fn current_timestamp() -> f64 {
        chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }

    /// Canonical block hash as lowercase hex.
    ///
    /// SHA-256 over compact JSON with block keys sorted and every transaction
    /// in `sender, recipient, amount, signature` order.
    pub fn hash(&self) -> String {
        hash(self.canonical_json().as_bytes()).to_hex()
    }

    fn canonical_json(&self) -> String {
        let canonical = CanonicalBlock {
            index: self.index,
            previous_hash: &self.previous_hash,
            proof_number: self.proof_number,
            timestamp: self.timestamp,
            transactions: self.transactions.iter().map(Transaction::canonical).collect(),
        };
        serde_json::to_string(&canonical).expect("serialization should not fail")
    }

    /// Transactions covered by the proof of work: all but the last.
    ///
    /// The last transaction is taken to be the mining reward, for fresh and
    /// historical blocks alike.
    pub fn proof_transactions(&self) -> &[Transaction] {
        match self.transactions.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    /// The transaction in reward position, if any.
    pub fn reward(&self) -> Option<&Transaction> {
        self.transactions.last()
    }
}
