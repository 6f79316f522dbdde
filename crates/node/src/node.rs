//! Async node coordinator.
//!
//! A [`Node`] owns the node's [`Blockchain`] behind a single
//! `tokio::sync::RwLock`. Reads take the read lock and return copies; every
//! mutation takes the write lock and is persisted before the lock is released.
//! Network calls (broadcasts and chain fetches) never run while a lock is held.

use crate::config::NodeConfig;
use crate::error::Result;
use crate::transport::{is_rejection, PeerTransport, STATUS_CONFLICT};
use powchain_chain::{BlockReceipt, Blockchain, ChainConfig, MiningJob, Resolution};
use powchain_core::{Block, Ed25519Verifier, Identity, SignatureVerifier, Transaction};
use powchain_storage::{PersistedState, StateFile};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Per-peer outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers that accepted the payload.
    pub delivered: Vec<String>,
    /// Peers that answered with a rejection status.
    pub rejected: Vec<String>,
    /// Peers that could not be reached.
    pub unreachable: Vec<String>,
    /// Whether any peer reported a conflicting chain.
    pub conflict: bool,
}

/// Single-writer coordinator around a [`Blockchain`].
pub struct Node<T: PeerTransport> {
    state: Arc<RwLock<Blockchain>>,
    transport: Arc<T>,
    store: Option<StateFile>,
}

impl<T: PeerTransport> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            transport: Arc::clone(&self.transport),
            store: self.store.clone(),
        }
    }
}

impl<T: PeerTransport> Node<T> {
    /// Wrap an existing blockchain. With `store`, every mutation is saved.
    pub fn new(chain: Blockchain, transport: T, store: Option<StateFile>) -> Self {
        Self {
            state: Arc::new(RwLock::new(chain)),
            transport: Arc::new(transport),
            store,
        }
    }

    /// A genesis-only node that keeps nothing on disk.
    pub fn in_memory(config: ChainConfig, transport: T) -> Self {
        Self::new(Blockchain::new(config, Arc::new(Ed25519Verifier)), transport, None)
    }

    /// Open the node described by `config`, restoring its state file.
    ///
    /// A missing or unreadable state file is not fatal: the node starts from
    /// a genesis-only chain with an empty pool.
    pub fn open(config: &NodeConfig, transport: T) -> Self {
        let store = StateFile::for_node(&config.data_dir, &config.node_id);
        let chain = Self::restore(config.chain.clone(), Arc::new(Ed25519Verifier), &store);
        Self::new(chain, transport, Some(store))
    }

    fn restore(config: ChainConfig, verifier: Arc<dyn SignatureVerifier>, store: &StateFile) -> Blockchain {
        let path = store.path().display().to_string();
        let mut chain = match store.load() {
            Ok(Some(saved)) => match Blockchain::restore(
                config.clone(),
                Arc::clone(&verifier),
                saved.chain,
                saved.open_transactions,
                saved.peers,
            ) {
                Ok(chain) => {
                    info!(%path, length = chain.len(), "restored node state");
                    chain
                }
                Err(e) => {
                    warn!(%path, error = %e, "saved chain rejected; starting from genesis");
                    Blockchain::new(config, verifier)
                }
            },
            Ok(None) => {
                info!(%path, "no saved state; starting from genesis");
                Blockchain::new(config, verifier)
            }
            Err(e) => {
                warn!(%path, error = %e, "could not load saved state; starting from genesis");
                Blockchain::new(config, verifier)
            }
        };

        if store.load_conflicts_pending() {
            warn!(%path, "chain conflicts pending; resolve before mining");
            chain.set_conflicts_pending(true);
        }
        chain
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn store(&self) -> Option<&StateFile> {
        self.store.as_ref()
    }

    // ---- Reads ----

    pub async fn chain(&self) -> Vec<Block> {
        self.state.read().await.chain()
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.state.read().await.pending_transactions()
    }

    pub async fn peers(&self) -> Vec<String> {
        self.state.read().await.peers()
    }

    pub async fn balance(&self, participant: &Identity) -> f64 {
        self.state.read().await.balance(participant)
    }

    pub async fn wallet_balance(&self) -> Option<f64> {
        self.state.read().await.wallet_balance()
    }

    pub async fn conflicts_pending(&self) -> bool {
        self.state.read().await.conflicts_pending()
    }

    /// Set the identity mining rewards are paid to.
    pub async fn set_wallet(&self, identity: Identity) {
        self.state.write().await.set_wallet(identity);
    }

    // ---- Transactions ----

    /// Submit a local transaction and broadcast it to every peer.
    pub async fn submit_transaction(&self, tx: Transaction) -> Result<BroadcastReport> {
        let peers = {
            let mut chain = self.state.write().await;
            chain.submit_transaction(tx.clone())?;
            self.persist(&chain);
            chain.peers()
        };
        info!(sender = tx.sender.short(), amount = tx.amount, "accepted transaction");

        let mut report = BroadcastReport::default();
        for peer in peers {
            let result = self.transport.broadcast_transaction(&peer, &tx).await;
            Self::record(&mut report, peer, result, "transaction");
        }
        Ok(report)
    }

    /// Accept a transaction broadcast by a peer. It is not re-broadcast.
    pub async fn receive_transaction(&self, tx: Transaction) -> Result<()> {
        let mut chain = self.state.write().await;
        chain.receive_transaction(tx)?;
        self.persist(&chain);
        Ok(())
    }

    // ---- Blocks ----

    /// Accept a block broadcast by a peer.
    pub async fn receive_block(&self, block: Block) -> BlockReceipt {
        let mut chain = self.state.write().await;
        let receipt = chain.receive_block(block);
        if matches!(receipt, BlockReceipt::Added | BlockReceipt::Ahead) {
            self.persist(&chain);
        }
        receipt
    }

    /// Mine one block from the pending pool and broadcast it.
    ///
    /// The proof search runs on the blocking pool without holding any lock
    /// and stops early when `cancel` fires. If the chain moved while mining,
    /// the job is discarded with [`MiningError::StaleTip`](powchain_chain::MiningError::StaleTip).
    pub async fn mine(&self, cancel: CancellationToken) -> Result<(Block, BroadcastReport)> {
        let job = {
            let chain = self.state.read().await;
            MiningJob::prepare(&chain)?
        };
        debug!(index = job.index(), "mining job prepared");

        let (job, proof) = tokio::task::spawn_blocking(move || {
            let proof = job.solve(|| cancel.is_cancelled());
            (job, proof)
        })
        .await?;
        let proof = proof?;

        let (block, peers) = {
            let mut chain = self.state.write().await;
            let block = job.commit(&mut chain, proof)?;
            self.persist(&chain);
            (block, chain.peers())
        };

        let mut report = BroadcastReport::default();
        for peer in peers {
            let result = self.transport.broadcast_block(&peer, &block).await;
            Self::record(&mut report, peer, result, "block");
        }
        if report.conflict {
            warn!(index = block.index, "a peer rejected the block as conflicting; conflicts pending");
            let mut chain = self.state.write().await;
            chain.set_conflicts_pending(true);
            self.persist(&chain);
        }

        Ok((block, report))
    }

    // ---- Conflict resolution ----

    /// Fetch every peer's chain and adopt the longest valid one.
    ///
    /// Chains are fetched without holding the lock; selection runs against
    /// the local chain as it is when the write lock is taken.
    pub async fn resolve(&self) -> Resolution {
        let peers = self.peers().await;

        let mut candidates = Vec::with_capacity(peers.len());
        for peer in peers {
            let fetched = match self.transport.fetch_chain(&peer).await {
                Ok(chain) => {
                    debug!(%peer, length = chain.len(), "fetched peer chain");
                    Some(chain)
                }
                Err(e) => {
                    warn!(error = %e, "skipping peer during resolution");
                    None
                }
            };
            candidates.push((peer, fetched));
        }

        let mut chain = self.state.write().await;
        let resolution = chain.resolve_from(candidates);
        self.persist(&chain);
        resolution
    }

    // ---- Peers ----

    pub async fn add_peer(&self, peer: impl Into<String>) -> bool {
        let mut chain = self.state.write().await;
        let added = chain.add_peer(peer);
        if added {
            self.persist(&chain);
        }
        added
    }

    pub async fn remove_peer(&self, peer: &str) -> bool {
        let mut chain = self.state.write().await;
        let removed = chain.remove_peer(peer);
        if removed {
            self.persist(&chain);
        }
        removed
    }

    // ---- Helpers ----

    /// Snapshot of what the state file holds for `chain`.
    pub fn persisted_state(chain: &Blockchain) -> PersistedState {
        PersistedState {
            chain: chain.chain(),
            open_transactions: chain.pending_transactions(),
            peers: chain.peers(),
        }
    }

    /// Save `chain` and its conflicts flag.
    ///
    /// Runs synchronously on the caller's thread while the write lock is held,
    /// so saves are ordered exactly like the mutations they record. The state
    /// file is small enough that the blocking write is brief.
    fn persist(&self, chain: &Blockchain) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.save(&Self::persisted_state(chain)) {
            warn!(path = %store.path().display(), error = %e, "failed to save node state");
        }
        if let Err(e) = store.save_conflicts_pending(chain.conflicts_pending()) {
            warn!(path = %store.conflicts_path().display(), error = %e, "failed to save conflicts flag");
        }
    }

    fn record(
        report: &mut BroadcastReport,
        peer: String,
        result: std::result::Result<u16, crate::transport::NetworkError>,
        what: &str,
    ) {
        match result {
            Ok(status) if is_rejection(status) => {
                warn!(%peer, status, "peer rejected broadcast {what}");
                report.rejected.push(peer);
            }
            Ok(STATUS_CONFLICT) => {
                debug!(%peer, "peer reported a conflicting {what}");
                report.conflict = true;
                report.rejected.push(peer);
            }
            Ok(status) => {
                debug!(%peer, status, "broadcast {what} delivered");
                report.delivered.push(peer);
            }
            Err(e) => {
                warn!(error = %e, "broadcast {what} failed");
                report.unreachable.push(peer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::NetworkError;
    use powchain_chain::MiningError;
    use powchain_core::{Keypair, WalletSigner};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory peers: fixed reply statuses and chains, plus a call log.
    #[derive(Default)]
    struct MockTransport {
        statuses: HashMap<String, u16>,
        chains: HashMap<String, Vec<Block>>,
        sent_transactions: Mutex<Vec<(String, Transaction)>>,
        sent_blocks: Mutex<Vec<(String, Block)>>,
    }

    impl MockTransport {
        fn with_status(mut self, peer: &str, status: u16) -> Self {
            self.statuses.insert(peer.to_string(), status);
            self
        }

        fn with_chain(mut self, peer: &str, chain: Vec<Block>) -> Self {
            self.chains.insert(peer.to_string(), chain);
            self
        }

        fn status(&self, peer: &str) -> std::result::Result<u16, NetworkError> {
            self.statuses
                .get(peer)
                .copied()
                .ok_or_else(|| NetworkError::Unreachable {
                    peer: peer.to_string(),
                    reason: "connection refused".into(),
                })
        }
    }

    impl PeerTransport for MockTransport {
        async fn broadcast_transaction(
            &self,
            peer: &str,
            tx: &Transaction,
        ) -> std::result::Result<u16, NetworkError> {
            let status = self.status(peer)?;
            self.sent_transactions
                .lock()
                .unwrap()
                .push((peer.to_string(), tx.clone()));
            Ok(status)
        }

        async fn broadcast_block(
            &self,
            peer: &str,
            block: &Block,
        ) -> std::result::Result<u16, NetworkError> {
            let status = self.status(peer)?;
            self.sent_blocks
                .lock()
                .unwrap()
                .push((peer.to_string(), block.clone()));
            Ok(status)
        }

        async fn fetch_chain(&self, peer: &str) -> std::result::Result<Vec<Block>, NetworkError> {
            self.chains
                .get(peer)
                .cloned()
                .ok_or_else(|| NetworkError::Unreachable {
                    peer: peer.to_string(),
                    reason: "connection refused".into(),
                })
        }
    }

    fn chain_config() -> ChainConfig {
        ChainConfig {
            mining_reward: 10.0,
            difficulty: 1,
        }
    }

    async fn funded_node(transport: MockTransport, wallet: &Keypair) -> Node<MockTransport> {
        let node = Node::in_memory(chain_config(), transport);
        node.set_wallet(wallet.identity()).await;
        node.mine(CancellationToken::new()).await.unwrap();
        node
    }

    fn longer_chain(blocks: usize) -> Vec<Block> {
        let mut remote = Blockchain::new(chain_config(), Arc::new(Ed25519Verifier));
        remote.set_wallet(Identity::new("remote-miner"));
        for _ in 0..blocks {
            remote.mine_block().unwrap();
        }
        remote.chain()
    }

    #[tokio::test]
    async fn test_submit_broadcasts_to_every_peer() {
        let wallet = Keypair::generate();
        let transport = MockTransport::default()
            .with_status("a:1", 201)
            .with_status("b:2", 400);
        let node = funded_node(transport, &wallet).await;
        node.add_peer("a:1").await;
        node.add_peer("b:2").await;
        node.add_peer("down:3").await;

        let tx = wallet.signed_transaction(Identity::new("bob"), 3.0);
        let report = node.submit_transaction(tx.clone()).await.unwrap();

        assert_eq!(report.delivered, vec!["a:1".to_string()]);
        assert_eq!(report.rejected, vec!["b:2".to_string()]);
        assert_eq!(report.unreachable, vec!["down:3".to_string()]);
        assert_eq!(node.pending_transactions().await, vec![tx]);
        assert_eq!(node.transport().sent_transactions.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_submission_is_not_broadcast() {
        let wallet = Keypair::generate();
        let node = Node::in_memory(chain_config(), MockTransport::default().with_status("a:1", 201));
        node.add_peer("a:1").await;

        let tx = wallet.signed_transaction(Identity::new("bob"), 3.0);
        let err = node.submit_transaction(tx).await.unwrap_err();

        assert!(matches!(err, crate::NodeError::Validation(_)));
        assert!(node.transport().sent_transactions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_received_transaction_is_not_rebroadcast() {
        let sender = Keypair::generate();
        let node = Node::in_memory(chain_config(), MockTransport::default().with_status("a:1", 201));
        node.add_peer("a:1").await;

        node.receive_transaction(sender.signed_transaction(Identity::new("bob"), 50.0))
            .await
            .unwrap();

        assert_eq!(node.pending_transactions().await.len(), 1);
        assert!(node.transport().sent_transactions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mine_broadcasts_block() {
        let wallet = Keypair::generate();
        let node = Node::in_memory(chain_config(), MockTransport::default().with_status("a:1", 201));
        node.set_wallet(wallet.identity()).await;
        node.add_peer("a:1").await;

        let (block, report) = node.mine(CancellationToken::new()).await.unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(report.delivered, vec!["a:1".to_string()]);
        assert_eq!(node.chain().await.len(), 2);
        assert_eq!(node.wallet_balance().await, Some(10.0));
        let sent = node.transport().sent_blocks.lock().unwrap();
        assert_eq!(sent.as_slice(), &[("a:1".to_string(), block)]);
    }

    #[tokio::test]
    async fn test_conflicting_peer_sets_flag() {
        let wallet = Keypair::generate();
        let node = Node::in_memory(chain_config(), MockTransport::default().with_status("a:1", 409));
        node.set_wallet(wallet.identity()).await;
        node.add_peer("a:1").await;

        let (_, report) = node.mine(CancellationToken::new()).await.unwrap();

        assert!(report.conflict);
        assert!(node.conflicts_pending().await);
        let err = node.mine(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, crate::NodeError::Mining(MiningError::ConflictsPending)));
    }

    #[tokio::test]
    async fn test_cancelled_mining_leaves_chain_untouched() {
        let wallet = Keypair::generate();
        let config = ChainConfig {
            mining_reward: 10.0,
            difficulty: 65,
        };
        let node = Node::in_memory(config, MockTransport::default());
        node.set_wallet(wallet.identity()).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = node.mine(cancel).await.unwrap_err();

        assert!(matches!(err, crate::NodeError::Mining(MiningError::Cancelled)));
        assert_eq!(node.chain().await.len(), 1);
    }

    #[tokio::test]
    async fn test_mine_without_wallet() {
        let node = Node::in_memory(chain_config(), MockTransport::default());
        let err = node.mine(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, crate::NodeError::Mining(MiningError::NoWallet)));
    }

    #[tokio::test]
    async fn test_receive_block_ahead_then_resolve() {
        let remote = longer_chain(3);
        let transport = MockTransport::default().with_chain("remote:1", remote.clone());
        let node = Node::in_memory(chain_config(), transport);
        node.add_peer("remote:1").await;
        node.add_peer("down:2").await;

        let receipt = node.receive_block(remote[3].clone()).await;
        assert_eq!(receipt, BlockReceipt::Ahead);
        assert!(node.conflicts_pending().await);

        let resolution = node.resolve().await;
        assert!(resolution.replaced);
        assert_eq!(resolution.adopted_from.as_deref(), Some("remote:1"));
        assert_eq!(node.chain().await, remote);
        assert!(!node.conflicts_pending().await);
    }

    #[tokio::test]
    async fn test_resolve_ignores_equal_length() {
        let wallet = Keypair::generate();
        let transport = MockTransport::default().with_chain("peer:1", longer_chain(1));
        let node = funded_node(transport, &wallet).await;
        node.add_peer("peer:1").await;
        let before = node.chain().await;

        let resolution = node.resolve().await;
        assert!(!resolution.replaced);
        assert_eq!(node.chain().await, before);
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let dir = TempDir::new().unwrap();
        let mut config = NodeConfig::with_data_dir(dir.path());
        config.chain = chain_config();
        let wallet = Keypair::generate();

        let node = Node::open(&config, MockTransport::default());
        node.set_wallet(wallet.identity()).await;
        node.add_peer("peer:1").await;
        node.mine(CancellationToken::new()).await.unwrap();
        node.submit_transaction(wallet.signed_transaction(Identity::new("bob"), 1.0))
            .await
            .unwrap();
        let chain = node.chain().await;

        let reopened = Node::open(&config, MockTransport::default());
        assert_eq!(reopened.chain().await, chain);
        assert_eq!(reopened.pending_transactions().await.len(), 1);
        assert_eq!(reopened.peers().await, vec!["peer:1".to_string()]);
        assert!(dir.path().join("blockchain-5000.txt").exists());
    }

    #[tokio::test]
    async fn test_conflicts_flag_survives_restart() {
        let dir = TempDir::new().unwrap();
        let mut config = NodeConfig::with_data_dir(dir.path());
        config.chain = chain_config();
        let wallet = Keypair::generate();
        let conflicting = || MockTransport::default().with_status("peer:1", STATUS_CONFLICT);

        let node = Node::open(&config, conflicting());
        node.set_wallet(wallet.identity()).await;
        node.add_peer("peer:1").await;
        let (_, report) = node.mine(CancellationToken::new()).await.unwrap();
        assert!(report.conflict);
        assert!(dir.path().join("blockchain-5000.conflicts").exists());

        let reopened = Node::open(&config, conflicting());
        reopened.set_wallet(wallet.identity()).await;
        assert!(reopened.conflicts_pending().await);
        let err = reopened.mine(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, crate::NodeError::Mining(MiningError::ConflictsPending)));

        // peer:1 serves no chain, so resolution keeps the local one.
        let resolution = reopened.resolve().await;
        assert!(!resolution.replaced);
        assert!(!dir.path().join("blockchain-5000.conflicts").exists());

        let resolved = Node::open(&config, MockTransport::default());
        assert!(!resolved.conflicts_pending().await);
    }

    #[tokio::test]
    async fn test_unreadable_state_starts_from_genesis() {
        let dir = TempDir::new().unwrap();
        let config = NodeConfig::with_data_dir(dir.path());
        std::fs::write(dir.path().join("blockchain-5000.txt"), "garbage").unwrap();

        let node = Node::open(&config, MockTransport::default());
        assert_eq!(node.chain().await, vec![Block::genesis()]);
        assert!(node.pending_transactions().await.is_empty());
    }
}
