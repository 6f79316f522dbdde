//! The node's ledger state and the operations that act on it.

use crate::balance::BalanceCalculator;
use crate::config::ChainConfig;
use crate::ledger::Ledger;
use crate::miner::{self, MiningError};
use crate::pool::TransactionPool;
use crate::resolver::{Candidate, ConflictResolver, Resolution};
use powchain_consensus::ValidationError;
use powchain_core::{Block, Identity, SignatureVerifier, Transaction};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of receiving a block from a peer.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockReceipt {
    /// The block extended the local tip.
    Added,
    /// The block was the next index but failed validation.
    Rejected(ValidationError),
    /// The peer is ahead of us; conflicts are now pending.
    Ahead,
    /// The block is at or below the local tip.
    Stale,
}

impl BlockReceipt {
    /// Status code reported back to the sending peer.
    pub fn status_code(&self) -> u16 {
        match self {
            BlockReceipt::Added => 201,
            BlockReceipt::Ahead => 200,
            BlockReceipt::Rejected(_) | BlockReceipt::Stale => 409,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, BlockReceipt::Added)
    }
}

/// Committed chain, pending pool, peer set and wallet identity of one node.
pub struct Blockchain {
    ledger: Ledger,
    pool: TransactionPool,
    peers: BTreeSet<String>,
    wallet: Option<Identity>,
    config: ChainConfig,
    verifier: Arc<dyn SignatureVerifier>,
    conflicts_pending: bool,
}

impl Blockchain {
    /// Create a genesis-only blockchain.
    pub fn new(config: ChainConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self {
            ledger: Ledger::new(config.difficulty),
            pool: TransactionPool::new(),
            peers: BTreeSet::new(),
            wallet: None,
            config,
            verifier,
            conflicts_pending: false,
        }
    }

    /// Rebuild a blockchain from persisted parts.
    ///
    /// The chain must start with the genesis block; it is not re-validated.
    pub fn restore(
        config: ChainConfig,
        verifier: Arc<dyn SignatureVerifier>,
        chain: Vec<Block>,
        pending: Vec<Transaction>,
        peers: impl IntoIterator<Item = String>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            ledger: Ledger::from_chain(chain, config.difficulty)?,
            pool: TransactionPool::from_transactions(pending),
            peers: peers.into_iter().collect(),
            wallet: None,
            config,
            verifier,
            conflicts_pending: false,
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn verifier(&self) -> &dyn SignatureVerifier {
        self.verifier.as_ref()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }

    pub fn pool(&self) -> &TransactionPool {
        &self.pool
    }

    pub(crate) fn pool_mut(&mut self) -> &mut TransactionPool {
        &mut self.pool
    }

    // ---- Reads ----

    /// Snapshot of the committed chain.
    pub fn chain(&self) -> Vec<Block> {
        self.ledger.snapshot()
    }

    /// Snapshot of the pending pool.
    pub fn pending_transactions(&self) -> Vec<Transaction> {
        self.pool.snapshot()
    }

    pub fn peers(&self) -> Vec<String> {
        self.peers.iter().cloned().collect()
    }

    pub fn last_block(&self) -> &Block {
        self.ledger.last_block()
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    pub fn wallet(&self) -> Option<&Identity> {
        self.wallet.as_ref()
    }

    /// Set the identity mining rewards are paid to.
    pub fn set_wallet(&mut self, identity: Identity) {
        self.wallet = Some(identity);
    }

    pub fn balance(&self, participant: &Identity) -> f64 {
        BalanceCalculator::balance(participant, self.ledger.blocks(), &self.pool)
    }

    /// Balance of the local wallet, if one is configured.
    pub fn wallet_balance(&self) -> Option<f64> {
        self.wallet.as_ref().map(|identity| self.balance(identity))
    }

    pub fn conflicts_pending(&self) -> bool {
        self.conflicts_pending
    }

    pub fn set_conflicts_pending(&mut self, pending: bool) {
        self.conflicts_pending = pending;
    }

    // ---- Transactions ----

    /// Submit a locally created transaction. The sender must be able to
    /// cover the amount, pending debits included.
    pub fn submit_transaction(&mut self, tx: Transaction) -> Result<(), ValidationError> {
        let available = self.balance(&tx.sender);
        self.pool
            .submit(tx, self.verifier.as_ref(), |_| available, true)
            .inspect_err(|e| warn!(error = %e, "rejected transaction"))
    }

    /// Accept a transaction broadcast by a peer (signature check only).
    pub fn receive_transaction(&mut self, tx: Transaction) -> Result<(), ValidationError> {
        self.pool
            .submit(tx, self.verifier.as_ref(), |_| 0.0, false)
            .inspect_err(|e| warn!(error = %e, "rejected broadcast transaction"))
    }

    // ---- Blocks ----

    /// Append a block to the local tip and drop its transactions from the pool.
    pub fn add_block(&mut self, block: Block) -> Result<(), ValidationError> {
        self.ledger.append(block)?;
        let settled = self.pool.reconcile(&self.ledger.last_block().transactions);
        info!(index = self.ledger.last_block().index, settled, "added block");
        Ok(())
    }

    /// Handle a block broadcast by a peer.
    pub fn receive_block(&mut self, block: Block) -> BlockReceipt {
        let last_index = self.last_block().index;

        if block.index == last_index + 1 {
            match self.add_block(block) {
                Ok(()) => BlockReceipt::Added,
                Err(e) => {
                    warn!(error = %e, "rejected broadcast block");
                    BlockReceipt::Rejected(e)
                }
            }
        } else if block.index > last_index + 1 {
            info!(
                remote_index = block.index,
                local_index = last_index,
                "peer is ahead; conflicts pending"
            );
            self.conflicts_pending = true;
            BlockReceipt::Ahead
        } else {
            BlockReceipt::Stale
        }
    }

    /// Mine a block from the pending pool, blocking until a proof is found.
    pub fn mine_block(&mut self) -> Result<Block, MiningError> {
        miner::mine_block(self)
    }

    // ---- Conflict resolution ----

    /// Adopt the longest valid chain among already fetched candidates.
    ///
    /// The conflicts flag is cleared whether or not a replacement happened.
    pub fn resolve_from<I>(&mut self, candidates: I) -> Resolution
    where
        I: IntoIterator<Item = Candidate>,
    {
        let winner = ConflictResolver::select_longest_valid(
            self.ledger.len(),
            candidates,
            self.config.difficulty,
        );
        self.adopt(winner)
    }

    /// Fetch every peer's chain with `fetch_chain` and adopt the longest
    /// valid one. Unreachable peers (`None`) are skipped.
    pub fn resolve<F>(&mut self, fetch_chain: F) -> Resolution
    where
        F: FnMut(&str) -> Option<Vec<Block>>,
    {
        let winner = ConflictResolver::resolve(
            self.ledger.len(),
            &self.peers,
            fetch_chain,
            self.config.difficulty,
        );
        self.adopt(winner)
    }

    fn adopt(&mut self, winner: Option<(String, Vec<Block>)>) -> Resolution {
        self.conflicts_pending = false;

        let Some((peer, chain)) = winner else {
            return Resolution {
                replaced: false,
                adopted_from: None,
                length: self.ledger.len(),
            };
        };

        if let Err(e) = self.ledger.replace(chain) {
            warn!(%peer, error = %e, "could not adopt peer chain");
            return Resolution {
                replaced: false,
                adopted_from: None,
                length: self.ledger.len(),
            };
        }

        let committed: Vec<Transaction> = self
            .ledger
            .blocks()
            .iter()
            .flat_map(|block| block.transactions.iter().cloned())
            .collect();
        let settled = self.pool.reconcile(&committed);
        info!(%peer, length = self.ledger.len(), settled, "replaced local chain");

        Resolution {
            replaced: true,
            adopted_from: Some(peer),
            length: self.ledger.len(),
        }
    }

    // ---- Peers ----

    /// Returns false if the peer was already known.
    pub fn add_peer(&mut self, peer: impl Into<String>) -> bool {
        self.peers.insert(peer.into())
    }

    /// Returns false if the peer was not known.
    pub fn remove_peer(&mut self, peer: &str) -> bool {
        self.peers.remove(peer)
    }
}

impl fmt::Debug for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blockchain")
            .field("length", &self.ledger.len())
            .field("pending", &self.pool.len())
            .field("peers", &self.peers)
            .field("wallet", &self.wallet)
            .field("config", &self.config)
            .field("conflicts_pending", &self.conflicts_pending)
            .finish()
    }
}
