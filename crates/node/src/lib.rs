//! Async node coordinator for powchain.
//!
//! This crate wires a [`Blockchain`](powchain_chain::Blockchain) to the
//! outside world:
//! - **Node**: single-writer access through one `RwLock`, cancellable
//!   background mining, best-effort broadcast and conflict resolution
//! - **PeerTransport**: outbound calls to peers, with an HTTP implementation
//! - **NodeConfig**: the node's `config.json`
//!
//! # Example
//!
//! ```rust,no_run
//! use powchain_node::{HttpTransport, Node, NodeConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> powchain_node::Result<()> {
//! let config = NodeConfig::load("./powchain_data")?;
//! let transport = HttpTransport::new(config.peer_timeout()).expect("HTTP client");
//! let node = Node::open(&config, transport);
//!
//! node.add_peer("localhost:5001").await;
//! let (block, report) = node.mine(CancellationToken::new()).await?;
//! println!("mined block {} ({} peers reached)", block.index, report.delivered.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod node;
pub mod transport;

// Re-export commonly used types
pub use config::{NodeConfig, CONFIG_FILE};
pub use error::{NodeError, Result};
pub use node::{BroadcastReport, Node};
pub use transport::{HttpTransport, NetworkError, PeerTransport};
