//! Ledger state and orchestration for powchain.
//!
//! This crate brings the core types and consensus rules together into the
//! state a single node maintains:
//! - **Ledger**: the committed chain, always rooted at genesis
//! - **TransactionPool**: unconfirmed transactions in insertion order
//! - **BalanceCalculator**: spendable balances from chain and pool
//! - **ConflictResolver**: longest-valid-chain selection across peers
//! - **MiningJob**: prepare / solve / commit block production
//! - **Blockchain**: the context object every operation acts on
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use powchain_chain::{Blockchain, ChainConfig};
//! use powchain_core::{Ed25519Verifier, Identity, Keypair, WalletSigner};
//!
//! let wallet = Keypair::generate();
//! let config = ChainConfig { mining_reward: 10.0, difficulty: 1 };
//!
//! let mut chain = Blockchain::new(config, Arc::new(Ed25519Verifier));
//! chain.set_wallet(wallet.identity());
//!
//! // Mine a reward, then spend part of it
//! chain.mine_block().unwrap();
//! let tx = wallet.signed_transaction(Identity::new("bob"), 4.0);
//! chain.submit_transaction(tx).unwrap();
//! chain.mine_block().unwrap();
//!
//! assert_eq!(chain.wallet_balance(), Some(16.0));
//! ```

pub mod balance;
pub mod blockchain;
pub mod config;
pub mod ledger;
pub mod miner;
pub mod pool;
pub mod resolver;

// Re-export commonly used types
pub use balance::BalanceCalculator;
pub use blockchain::{BlockReceipt, Blockchain};
pub use config::ChainConfig;
pub use ledger::Ledger;
pub use miner::{mine_block, MiningError, MiningJob};
pub use pool::TransactionPool;
pub use resolver::{Candidate, ConflictResolver, Resolution};
