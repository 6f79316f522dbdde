//! Transaction operations command.

use super::open_node;
use super::wallet::{load_keypair, DEFAULT_WALLET};
use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use powchain_core::{Identity, WalletSigner};
use std::path::Path;

#[derive(Args)]
pub struct TxArgs {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand)]
enum TxCommand {
    /// Sign a transfer, add it to the pool and broadcast it to peers
    Send {
        /// Recipient identity (hex public key)
        #[arg(short, long)]
        to: String,

        /// Amount to transfer
        #[arg(short, long)]
        amount: f64,

        /// Sending wallet (key file name without .json extension)
        #[arg(short, long, default_value = DEFAULT_WALLET)]
        wallet: String,
    },
}

pub async fn run(args: TxArgs, data_dir: &Path) -> Result<()> {
    match args.command {
        TxCommand::Send { to, amount, wallet } => send(data_dir, to, amount, &wallet).await,
    }
}

async fn send(data_dir: &Path, to: String, amount: f64, wallet: &str) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        bail!("Amount must be a non-negative number, got {}", amount);
    }

    let keypair = load_keypair(data_dir, wallet)?;
    let tx = keypair.signed_transaction(Identity::new(to), amount);

    let node = open_node(data_dir)?;
    let report = node.submit_transaction(tx.clone()).await?;

    println!();
    println!("{}  Transaction added to the pool", "✓".green().bold());
    println!("  From:      {}", tx.sender.short().bright_yellow());
    println!("  To:        {}", tx.recipient.short().bright_yellow());
    println!("  Amount:    {}", tx.amount.to_string().bright_cyan());
    println!(
        "  Signature: {}...",
        hex::encode(&tx.signature)[..16].bright_black()
    );
    println!();
    print_broadcast(&report);

    let balance = node.balance(&tx.sender).await;
    println!("  Remaining balance: {}", balance.to_string().bright_cyan());
    println!();

    Ok(())
}

pub(crate) fn print_broadcast(report: &powchain_node::BroadcastReport) {
    let total = report.delivered.len() + report.rejected.len() + report.unreachable.len();
    if total == 0 {
        println!("  {}", "No peers to broadcast to".bright_black());
        println!();
        return;
    }

    println!(
        "  Broadcast: {} delivered, {} rejected, {} unreachable",
        report.delivered.len().to_string().green(),
        report.rejected.len().to_string().red(),
        report.unreachable.len().to_string().yellow()
    );
    for peer in &report.rejected {
        println!("    {} {}", "rejected".red(), peer);
    }
    for peer in &report.unreachable {
        println!("    {} {}", "unreachable".yellow(), peer);
    }
    println!();
}
