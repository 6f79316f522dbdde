//! CLI commands module.

use anyhow::{Context, Result};
use clap::Subcommand;
use powchain_node::{HttpTransport, Node, NodeConfig};
use std::path::Path;

mod chain;
mod init;
mod peers;
mod tx;
mod wallet;

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a node data directory
    Init(init::InitArgs),
    /// Wallet management
    Wallet(wallet::WalletArgs),
    /// Transaction operations
    Tx(tx::TxArgs),
    /// Mine a block from the pending transactions
    Mine(chain::MineArgs),
    /// List recent blocks
    Chain(chain::ChainArgs),
    /// Show one block in detail
    Block(chain::BlockArgs),
    /// Show the spendable balance of a participant
    Balance(wallet::BalanceArgs),
    /// List pending transactions
    Pending,
    /// Peer management
    Peers(peers::PeersArgs),
    /// Adopt the longest valid chain among peers
    Resolve,
}

pub async fn run(cmd: Commands, data_dir: &Path) -> Result<()> {
    match cmd {
        Commands::Init(args) => init::run(args, data_dir),
        Commands::Wallet(args) => wallet::run(args, data_dir).await,
        Commands::Tx(args) => tx::run(args, data_dir).await,
        Commands::Mine(args) => chain::mine(args, data_dir).await,
        Commands::Chain(args) => chain::list(args, data_dir).await,
        Commands::Block(args) => chain::show(args, data_dir).await,
        Commands::Balance(args) => wallet::balance(args, data_dir).await,
        Commands::Pending => chain::pending(data_dir).await,
        Commands::Peers(args) => peers::run(args, data_dir).await,
        Commands::Resolve => chain::resolve(data_dir).await,
    }
}

/// Load `config.json` and open the node it describes.
pub(crate) fn open_node(data_dir: &Path) -> Result<Node<HttpTransport>> {
    let mut config = NodeConfig::load(data_dir)
        .with_context(|| "Failed to read config.json. Did you run 'powchain init'?")?;
    // The directory given on the command line wins over the one recorded at init.
    config.data_dir = data_dir.to_path_buf();
    let transport =
        HttpTransport::new(config.peer_timeout()).context("Failed to build HTTP client")?;
    Ok(Node::open(&config, transport))
}
