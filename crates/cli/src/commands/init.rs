//! Initialize node command.

use super::wallet::{key_path, load_keypair, save_keypair, DEFAULT_WALLET};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_chain::ChainConfig;
use powchain_core::{Block, Keypair, WalletSigner};
use powchain_node::NodeConfig;
use powchain_storage::{PersistedState, StateFile};
use std::fs;
use std::path::Path;

#[derive(Args)]
pub struct InitArgs {
    /// Node identifier; names the state file (usually the port number)
    #[arg(short, long, default_value = "5000")]
    node_id: String,

    /// Required number of leading hex zeros in a proof
    #[arg(long, default_value = "2")]
    difficulty: usize,

    /// Amount credited to the miner of each block
    #[arg(long, default_value = "10")]
    reward: f64,

    /// Per-request timeout for peer calls, in seconds
    #[arg(long, default_value = "5")]
    peer_timeout: u64,
}

pub fn run(args: InitArgs, data_dir: &Path) -> Result<()> {
    println!("{}", "Initializing powchain node...".bold().cyan());
    println!();

    fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
    println!("{}  Created data directory", "✓".green().bold());

    let config = NodeConfig {
        node_id: args.node_id,
        data_dir: data_dir.to_path_buf(),
        chain: ChainConfig {
            mining_reward: args.reward,
            difficulty: args.difficulty,
        },
        peer_timeout_secs: args.peer_timeout,
    };
    let config_file = config.save().context("Failed to write config.json")?;
    println!(
        "{}  Saved config to: {}",
        "✓".green().bold(),
        config_file.display().to_string().bright_black()
    );

    // Only write a fresh state file; an existing chain is kept.
    let state_file = StateFile::for_node(data_dir, &config.node_id);
    if state_file.path().exists() {
        println!(
            "{}  Kept existing state file: {}",
            "•".yellow().bold(),
            state_file.path().display().to_string().bright_black()
        );
    } else {
        let genesis = Block::genesis();
        state_file
            .save(&PersistedState {
                chain: vec![genesis.clone()],
                ..Default::default()
            })
            .context("Failed to write state file")?;
        println!("{}  Created genesis block", "✓".green().bold());
        println!("    Hash: {}", genesis.hash().bright_yellow());
    }

    let key_file = key_path(data_dir, DEFAULT_WALLET);
    let keypair = if key_file.exists() {
        let keypair = load_keypair(data_dir, DEFAULT_WALLET)?;
        println!(
            "{}  Kept existing wallet: {}",
            "•".yellow().bold(),
            key_file.display().to_string().bright_black()
        );
        keypair
    } else {
        let keypair = Keypair::generate();
        save_keypair(data_dir, DEFAULT_WALLET, &keypair)?;
        println!(
            "{}  Saved wallet to: {}",
            "✓".green().bold(),
            key_file.display().to_string().bright_black()
        );
        keypair
    };
    println!("    Identity: {}", keypair.identity().as_str().bright_yellow());

    println!();
    println!("{}", "Node initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!("  • Use {} to connect peers", "powchain peers add".bright_cyan());
    println!("  • Use {} to earn a mining reward", "powchain mine".bright_cyan());
    println!("  • Use {} to send funds", "powchain tx send".bright_cyan());

    Ok(())
}
