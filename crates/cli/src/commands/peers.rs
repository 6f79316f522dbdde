//! Peer management command.

use super::open_node;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::Path;

#[derive(Args)]
pub struct PeersArgs {
    #[command(subcommand)]
    command: PeersCommand,
}

#[derive(Subcommand)]
enum PeersCommand {
    /// Add a peer address (host:port)
    Add { peer: String },
    /// Remove a peer address
    Remove { peer: String },
    /// List known peers
    List,
}

pub async fn run(args: PeersArgs, data_dir: &Path) -> Result<()> {
    let node = open_node(data_dir)?;

    match args.command {
        PeersCommand::Add { peer } => {
            if node.add_peer(peer.clone()).await {
                println!("{}  Added peer {}", "✓".green().bold(), peer.bright_yellow());
            } else {
                println!("{}  Peer {} is already known", "•".bright_black(), peer.bright_yellow());
            }
        }
        PeersCommand::Remove { peer } => {
            if node.remove_peer(&peer).await {
                println!("{}  Removed peer {}", "✓".green().bold(), peer.bright_yellow());
            } else {
                println!("{}  Peer {} was not known", "•".bright_black(), peer.bright_yellow());
            }
        }
        PeersCommand::List => {
            let peers = node.peers().await;
            println!();
            if peers.is_empty() {
                println!("  {}", "No peers".bright_black());
            } else {
                println!("{}", "Peers:".bold().cyan());
                println!();
                for peer in peers {
                    println!("  {}", peer.bright_yellow());
                }
            }
            println!();
        }
    }

    Ok(())
}
