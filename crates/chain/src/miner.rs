//! Block mining.
//!
//! Mining is split into three steps so that the expensive nonce search can
//! run without holding any lock on the [`Blockchain`]:
//!
//! 1. [`MiningJob::prepare`] snapshots the tip and the pool (read access).
//! 2. [`MiningJob::solve`] searches for a proof (no access at all).
//! 3. [`MiningJob::commit`] appends the block and settles the pool (write access).

use crate::blockchain::Blockchain;
use powchain_consensus::{ProofEngine, ValidationError};
use powchain_core::{Block, Identity, Transaction};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while mining.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MiningError {
    #[error("no wallet identity is configured")]
    NoWallet,

    #[error("chain conflicts are pending; resolve before mining")]
    ConflictsPending,

    #[error("pooled transaction {position} failed signature verification")]
    InvalidPoolTransaction { position: usize },

    #[error("chain tip moved while mining")]
    StaleTip,

    #[error("mining was cancelled")]
    Cancelled,

    #[error("mined block rejected: {0}")]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, MiningError>;

/// Everything needed to mine one block on top of a given tip.
#[derive(Debug, Clone)]
pub struct MiningJob {
    index: u64,
    previous_hash: String,
    transactions: Vec<Transaction>,
    miner: Identity,
    reward: f64,
    difficulty: usize,
}

impl MiningJob {
    /// Snapshot the tip and pending transactions of `chain`.
    ///
    /// Every pooled transaction is re-verified (signature only); a single
    /// failure aborts the job.
    pub fn prepare(chain: &Blockchain) -> Result<Self> {
        let miner = chain.wallet().cloned().ok_or(MiningError::NoWallet)?;
        if chain.conflicts_pending() {
            return Err(MiningError::ConflictsPending);
        }

        let transactions = chain.pending_transactions();
        for (position, tx) in transactions.iter().enumerate() {
            if !chain.verifier().verify(tx) {
                return Err(MiningError::InvalidPoolTransaction { position });
            }
        }

        Ok(Self {
            index: chain.len() as u64,
            previous_hash: chain.last_block().hash(),
            transactions,
            miner,
            reward: chain.config().mining_reward,
            difficulty: chain.config().difficulty,
        })
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn previous_hash(&self) -> &str {
        &self.previous_hash
    }

    /// Transactions covered by the proof (the reward is added at commit).
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Search for a proof, polling `should_stop` periodically.
    pub fn solve<F>(&self, should_stop: F) -> Result<u64>
    where
        F: Fn() -> bool,
    {
        debug!(
            index = self.index,
            transactions = self.transactions.len(),
            difficulty = self.difficulty,
            "searching for proof"
        );
        ProofEngine::new(self.difficulty)
            .mine_until(&self.transactions, &self.previous_hash, should_stop)
            .ok_or(MiningError::Cancelled)
    }

    /// Append the mined block to `chain` and remove the mined transactions
    /// from its pool.
    ///
    /// Fails with [`MiningError::StaleTip`] if the chain moved since
    /// [`prepare`](Self::prepare); nothing is mutated in that case.
    pub fn commit(self, chain: &mut Blockchain, proof_number: u64) -> Result<Block> {
        if chain.last_block().hash() != self.previous_hash {
            return Err(MiningError::StaleTip);
        }
        if chain.conflicts_pending() {
            return Err(MiningError::ConflictsPending);
        }

        let mut transactions = self.transactions;
        transactions.push(Transaction::reward(self.miner, self.reward));
        let block = Block::new(self.index, self.previous_hash, transactions, proof_number);

        chain.ledger_mut().append(block.clone())?;
        chain.pool_mut().reconcile(block.proof_transactions());

        info!(
            index = block.index,
            transactions = block.proof_transactions().len(),
            proof = block.proof_number,
            "mined block"
        );
        Ok(block)
    }
}

/// Prepare, solve and commit in one go, blocking until a proof is found.
pub fn mine_block(chain: &mut Blockchain) -> Result<Block> {
    let job = MiningJob::prepare(chain)?;
    let proof = job.solve(|| false)?;
    job.commit(chain, proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use powchain_core::{Ed25519Verifier, Keypair, WalletSigner};
    use std::sync::Arc;

    fn test_chain(wallet: Option<&Keypair>) -> Blockchain {
        let config = ChainConfig {
            mining_reward: 10.0,
            difficulty: 1,
        };
        let mut chain = Blockchain::new(config, Arc::new(Ed25519Verifier));
        if let Some(kp) = wallet {
            chain.set_wallet(kp.identity());
        }
        chain
    }

    #[test]
    fn test_no_wallet() {
        let chain = test_chain(None);
        assert_eq!(MiningJob::prepare(&chain).unwrap_err(), MiningError::NoWallet);
    }

    #[test]
    fn test_mine_empty_block() {
        let kp = Keypair::generate();
        let mut chain = test_chain(Some(&kp));

        let block = mine_block(&mut chain).unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(block.transactions.len(), 1);
        let reward = block.reward().unwrap();
        assert!(reward.is_reward());
        assert_eq!(reward.recipient, kp.identity());
        assert_eq!(reward.amount, 10.0);
        assert!(reward.signature.is_empty());
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.balance(&kp.identity()), 10.0);
    }

    #[test]
    fn test_mined_transactions_leave_pool() {
        let kp = Keypair::generate();
        let mut chain = test_chain(Some(&kp));
        mine_block(&mut chain).unwrap();

        let tx = kp.signed_transaction(Identity::new("bob"), 4.0);
        chain.submit_transaction(tx.clone()).unwrap();
        let block = mine_block(&mut chain).unwrap();

        assert_eq!(block.proof_transactions(), &[tx]);
        assert!(chain.pending_transactions().is_empty());
    }

    #[test]
    fn test_commit_keeps_transactions_submitted_during_search() {
        let kp = Keypair::generate();
        let mut chain = test_chain(Some(&kp));
        mine_block(&mut chain).unwrap();

        let first = kp.signed_transaction(Identity::new("bob"), 1.0);
        chain.submit_transaction(first.clone()).unwrap();
        let job = MiningJob::prepare(&chain).unwrap();

        let late = kp.signed_transaction(Identity::new("carol"), 2.0);
        chain.submit_transaction(late.clone()).unwrap();

        let proof = job.solve(|| false).unwrap();
        let block = job.commit(&mut chain, proof).unwrap();

        assert_eq!(block.proof_transactions(), &[first]);
        assert_eq!(chain.pending_transactions(), vec![late]);
    }

    #[test]
    fn test_stale_tip_rejected() {
        let kp = Keypair::generate();
        let mut chain = test_chain(Some(&kp));

        let job = MiningJob::prepare(&chain).unwrap();
        let proof = job.solve(|| false).unwrap();
        mine_block(&mut chain).unwrap();

        assert_eq!(job.commit(&mut chain, proof).unwrap_err(), MiningError::StaleTip);
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_cancelled_search() {
        let kp = Keypair::generate();
        let config = ChainConfig {
            mining_reward: 10.0,
            difficulty: 65,
        };
        let mut chain = Blockchain::new(config, Arc::new(Ed25519Verifier));
        chain.set_wallet(kp.identity());

        let job = MiningJob::prepare(&chain).unwrap();
        assert_eq!(job.solve(|| true).unwrap_err(), MiningError::Cancelled);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_conflicts_pending_blocks_mining() {
        let kp = Keypair::generate();
        let mut chain = test_chain(Some(&kp));
        chain.set_conflicts_pending(true);

        assert_eq!(mine_block(&mut chain).unwrap_err(), MiningError::ConflictsPending);
    }

    #[test]
    fn test_invalid_pool_transaction_aborts() {
        let kp = Keypair::generate();
        let mut chain = test_chain(Some(&kp));
        let mut forged = kp.signed_transaction(Identity::new("bob"), 1.0);
        forged.amount = 100.0;
        chain.pool_mut().submit(forged, &AcceptAll, |_| 0.0, false).unwrap();

        assert_eq!(
            MiningJob::prepare(&chain).unwrap_err(),
            MiningError::InvalidPoolTransaction { position: 0 }
        );
        assert_eq!(chain.len(), 1);
    }

    struct AcceptAll;

    impl powchain_core::SignatureVerifier for AcceptAll {
        fn verify(&self, _tx: &Transaction) -> bool {
            true
        }
    }
}
