//! Chain, mining and conflict resolution commands.

use super::open_node;
use super::tx::print_broadcast;
use super::wallet::{load_keypair, DEFAULT_WALLET};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use powchain_core::{Block, WalletSigner};
use std::path::Path;
use tokio_util::sync::CancellationToken;

#[derive(Args)]
pub struct MineArgs {
    /// Wallet that receives the mining reward
    #[arg(short, long, default_value = DEFAULT_WALLET)]
    wallet: String,
}

#[derive(Args)]
pub struct ChainArgs {
    /// Number of blocks to show
    #[arg(short, long, default_value = "10")]
    count: usize,
}

#[derive(Args)]
pub struct BlockArgs {
    /// Block index
    index: u64,
}

pub async fn mine(args: MineArgs, data_dir: &Path) -> Result<()> {
    let keypair = load_keypair(data_dir, &args.wallet)?;
    let node = open_node(data_dir)?;
    node.set_wallet(keypair.identity()).await;

    // Ctrl-C stops the proof search without touching the chain.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    println!("{}", "Mining...".bold().cyan());
    let (block, report) = node.mine(cancel).await.context("Mining failed")?;

    println!();
    println!(
        "{}  Mined block {}",
        "✓".green().bold(),
        format!("#{}", block.index).bright_cyan()
    );
    println!("  Hash:         {}", block.hash().bright_yellow());
    println!("  Proof:        {}", block.proof_number.to_string().bright_cyan());
    println!(
        "  Transactions: {}",
        block.proof_transactions().len().to_string().bright_cyan()
    );
    if let Some(reward) = block.reward() {
        println!("  Reward:       {}", reward.amount.to_string().green());
    }
    println!();
    print_broadcast(&report);

    if report.conflict {
        println!(
            "{}",
            "A peer holds a conflicting chain; run 'powchain resolve' before mining again."
                .yellow()
                .bold()
        );
    }

    Ok(())
}

pub async fn list(args: ChainArgs, data_dir: &Path) -> Result<()> {
    let node = open_node(data_dir)?;
    let chain = node.chain().await;

    println!();
    println!(
        "{} {}",
        "Recent Blocks:".bold().cyan(),
        format!("(length {})", chain.len()).bright_black()
    );
    println!();

    for block in chain.iter().rev().take(args.count) {
        println!(
            "  {} {} {}",
            format!("#{}", block.index).bright_black(),
            block.hash()[..16].bright_yellow(),
            format!("({} txs)", block.transactions.len()).bright_black()
        );
    }

    println!();
    Ok(())
}

pub async fn show(args: BlockArgs, data_dir: &Path) -> Result<()> {
    let node = open_node(data_dir)?;
    let chain = node.chain().await;
    let block = chain
        .iter()
        .find(|block| block.index == args.index)
        .with_context(|| format!("Block #{} not found (chain length {})", args.index, chain.len()))?;

    print_block(block);
    Ok(())
}

fn print_block(block: &Block) {
    println!();
    println!("{}", "Block Information:".bold().cyan());
    println!();
    println!("  Index:         {}", block.index.to_string().bright_cyan());
    println!("  Hash:          {}", block.hash().bright_yellow());
    println!("  Previous Hash: {}", block.previous_hash.bright_black());
    println!("  Proof:         {}", block.proof_number.to_string().bright_cyan());
    println!("  Timestamp:     {}", block.timestamp.to_string().bright_black());
    println!(
        "  Transactions:  {}",
        block.transactions.len().to_string().bright_cyan()
    );

    if !block.transactions.is_empty() {
        println!();
        for tx in &block.transactions {
            let tag = if tx.is_reward() {
                "reward".green()
            } else {
                "transfer".bright_black()
            };
            println!(
                "    {:<8} {} -> {} {}",
                tag,
                tx.sender.short().bright_yellow(),
                tx.recipient.short().bright_yellow(),
                tx.amount.to_string().bright_cyan()
            );
        }
    }
    println!();
}

pub async fn pending(data_dir: &Path) -> Result<()> {
    let node = open_node(data_dir)?;
    let pending = node.pending_transactions().await;

    println!();
    if pending.is_empty() {
        println!("  {}", "No pending transactions".bright_black());
        println!();
        return Ok(());
    }

    println!("{}", "Pending Transactions:".bold().cyan());
    println!();
    for (i, tx) in pending.iter().enumerate() {
        println!(
            "  {} {} -> {} {}",
            format!("{}.", i + 1).bright_black(),
            tx.sender.short().bright_yellow(),
            tx.recipient.short().bright_yellow(),
            tx.amount.to_string().bright_cyan()
        );
    }
    println!();
    Ok(())
}

pub async fn resolve(data_dir: &Path) -> Result<()> {
    let node = open_node(data_dir)?;
    let resolution = node.resolve().await;

    println!();
    match &resolution.adopted_from {
        Some(peer) if resolution.replaced => println!(
            "{}  Adopted chain from {} (length {})",
            "✓".green().bold(),
            peer.bright_yellow(),
            resolution.length.to_string().bright_cyan()
        ),
        _ => println!(
            "{}  Local chain kept (length {})",
            "•".bright_black(),
            resolution.length.to_string().bright_cyan()
        ),
    }
    println!();
    Ok(())
}
