//! Proof-of-work nonce search.
//!
//! The proof input is the canonical JSON of a block's proof transactions,
//! followed by the previous block hash and the decimal nonce. A nonce is valid
//! when the SHA-256 hex digest starts with `difficulty` zeros.

use powchain_core::{canonical_json, Hash, Transaction};
use sha2::{Digest, Sha256};

/// How many nonces are tried between two polls of the stop predicate.
pub const STOP_CHECK_INTERVAL: u64 = 1024;

/// Searches and checks proof-of-work nonces at a fixed difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofEngine {
    difficulty: usize,
}

impl ProofEngine {
    /// Create an engine requiring `difficulty` leading hex zeros.
    pub fn new(difficulty: usize) -> Self {
        Self { difficulty }
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    /// Digest of the proof input for one nonce.
    pub fn proof_hash(transactions: &[Transaction], previous_hash: &str, nonce: u64) -> Hash {
        let mut hasher = Self::prefix_hasher(transactions, previous_hash);
        hasher.update(nonce.to_string().as_bytes());
        Hash(hasher.finalize().into())
    }

    /// Check whether `nonce` satisfies the difficulty for these inputs.
    pub fn is_valid(&self, transactions: &[Transaction], previous_hash: &str, nonce: u64) -> bool {
        Self::proof_hash(transactions, previous_hash, nonce).meets_difficulty(self.difficulty)
    }

    /// Search from nonce 0 upward until a valid proof is found.
    ///
    /// There is no upper bound; run this off any latency-sensitive thread.
    pub fn mine(&self, transactions: &[Transaction], previous_hash: &str) -> u64 {
        loop {
            if let Some(nonce) = self.mine_until(transactions, previous_hash, || false) {
                return nonce;
            }
        }
    }

    /// Like [`mine`](Self::mine), polling `should_stop` every
    /// [`STOP_CHECK_INTERVAL`] nonces. Returns `None` once stopped.
    pub fn mine_until<F>(
        &self,
        transactions: &[Transaction],
        previous_hash: &str,
        should_stop: F,
    ) -> Option<u64>
    where
        F: Fn() -> bool,
    {
        // The transaction list and previous hash are fixed for the whole
        // search, so hash them once and clone the midstate per nonce.
        let prefix = Self::prefix_hasher(transactions, previous_hash);
        let mut nonce: u64 = 0;
        loop {
            if nonce % STOP_CHECK_INTERVAL == 0 && should_stop() {
                return None;
            }
            let mut hasher = prefix.clone();
            hasher.update(nonce.to_string().as_bytes());
            let digest = Hash(hasher.finalize().into());
            if digest.meets_difficulty(self.difficulty) {
                return Some(nonce);
            }
            nonce = nonce.checked_add(1)?;
        }
    }

    fn prefix_hasher(transactions: &[Transaction], previous_hash: &str) -> Sha256 {
        let mut hasher = Sha256::new();
        hasher.update(canonical_json(transactions).as_bytes());
        hasher.update(previous_hash.as_bytes());
        hasher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powchain_core::hash;

    fn transfers() -> Vec<Transaction> {
        vec![
            Transaction::new("alice", "bob", 3.0, vec![1]),
            Transaction::new("bob", "carol", 1.5, vec![2]),
        ]
    }

    #[test]
    fn test_proof_hash_matches_concatenated_input() {
        let txs = transfers();
        let input = format!("{}{}{}", canonical_json(&txs), "abcd", 77);
        assert_eq!(ProofEngine::proof_hash(&txs, "abcd", 77), hash(input.as_bytes()));
    }

    #[test]
    fn test_mined_nonce_is_valid() {
        let engine = ProofEngine::new(2);
        let txs = transfers();
        let nonce = engine.mine(&txs, "prev");
        assert!(engine.is_valid(&txs, "prev", nonce));

        let hex = ProofEngine::proof_hash(&txs, "prev", nonce).to_hex();
        assert!(hex.starts_with("00"));
    }

    #[test]
    fn test_mine_returns_first_valid_nonce() {
        let engine = ProofEngine::new(1);
        let nonce = engine.mine(&[], "genesis-hash");
        for earlier in 0..nonce {
            assert!(!engine.is_valid(&[], "genesis-hash", earlier));
        }
    }

    #[test]
    fn test_is_valid_tracks_hex_prefix() {
        let txs = transfers();
        for nonce in 0..64 {
            let hex = ProofEngine::proof_hash(&txs, "p", nonce).to_hex();
            for difficulty in 0..3 {
                let expected = hex.chars().take(difficulty).all(|c| c == '0');
                assert_eq!(ProofEngine::new(difficulty).is_valid(&txs, "p", nonce), expected);
            }
        }
    }

    #[test]
    fn test_difficulty_zero_accepts_anything() {
        let engine = ProofEngine::new(0);
        assert!(engine.is_valid(&transfers(), "x", 12345));
        assert_eq!(engine.mine(&transfers(), "x"), 0);
    }

    #[test]
    fn test_proof_depends_on_inputs() {
        let engine = ProofEngine::new(2);
        let txs = transfers();
        let nonce = engine.mine(&txs, "prev");

        let other = ProofEngine::proof_hash(&txs[..1], "prev", nonce);
        assert_ne!(other, ProofEngine::proof_hash(&txs, "prev", nonce));
        assert_ne!(
            ProofEngine::proof_hash(&txs, "other-prev", nonce),
            ProofEngine::proof_hash(&txs, "prev", nonce)
        );
    }

    #[test]
    fn test_mine_until_stops() {
        // Unreachable difficulty; only the stop predicate can end the search.
        let engine = ProofEngine::new(65);
        assert_eq!(engine.mine_until(&[], "prev", || true), None);
    }
}
