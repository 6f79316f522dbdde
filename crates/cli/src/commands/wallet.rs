//! Wallet management command.

use super::open_node;
use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use powchain_core::{Identity, Keypair, WalletSigner};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the wallet created by `init` and used when none is given.
pub const DEFAULT_WALLET: &str = "wallet";

#[derive(Args)]
pub struct WalletArgs {
    #[command(subcommand)]
    command: WalletCommand,
}

#[derive(Subcommand)]
enum WalletCommand {
    /// Generate a new wallet keypair
    New {
        /// Name for the key file
        #[arg(short, long, default_value = DEFAULT_WALLET)]
        name: String,

        /// Replace an existing key file of the same name
        #[arg(long)]
        force: bool,
    },
    /// Show a wallet's identity and balance
    Show {
        /// Key file name (without .json extension)
        #[arg(short, long, default_value = DEFAULT_WALLET)]
        name: String,
    },
    /// List all wallets
    List,
}

#[derive(Args)]
pub struct BalanceArgs {
    /// Participant identity (hex public key); defaults to the local wallet
    identity: Option<String>,

    /// Wallet to use when no identity is given
    #[arg(short, long, default_value = DEFAULT_WALLET)]
    wallet: String,
}

/// On-disk form of a wallet keypair.
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    identity: String,
    public_key: String,
    private_key: String,
}

pub async fn run(args: WalletArgs, data_dir: &Path) -> Result<()> {
    match args.command {
        WalletCommand::New { name, force } => new_wallet(data_dir, &name, force),
        WalletCommand::Show { name } => show_wallet(data_dir, &name).await,
        WalletCommand::List => list_wallets(data_dir),
    }
}

pub async fn balance(args: BalanceArgs, data_dir: &Path) -> Result<()> {
    let identity = match args.identity {
        Some(identity) => Identity::new(identity),
        None => load_keypair(data_dir, &args.wallet)?.identity(),
    };

    let node = open_node(data_dir)?;
    let balance = node.balance(&identity).await;

    println!();
    println!("  Identity: {}", identity.as_str().bright_yellow());
    println!("  Balance:  {}", balance.to_string().bright_cyan());
    println!();

    Ok(())
}

fn new_wallet(data_dir: &Path, name: &str, force: bool) -> Result<()> {
    let path = key_path(data_dir, name);
    if path.exists() && !force {
        bail!(
            "Wallet '{}' already exists at {} (use --force to replace it)",
            name,
            path.display()
        );
    }

    let keypair = Keypair::generate();
    let path = save_keypair(data_dir, name, &keypair)?;

    println!("{}", "Generated new wallet:".bold().cyan());
    println!();
    println!("  Identity:    {}", keypair.identity().as_str().bright_yellow());
    println!(
        "  Private Key: {}",
        hex::encode(keypair.private_key()).bright_black()
    );
    println!();
    println!(
        "{}  Saved to: {}",
        "✓".green().bold(),
        path.display().to_string().bright_black()
    );
    println!();
    println!("{}", "Keep your private key safe!".yellow().bold());

    Ok(())
}

async fn show_wallet(data_dir: &Path, name: &str) -> Result<()> {
    let keypair = load_keypair(data_dir, name)?;
    let identity = keypair.identity();
    let node = open_node(data_dir)?;
    let balance = node.balance(&identity).await;

    println!();
    println!("{}", "Wallet Information:".bold().cyan());
    println!();
    println!("  Name:     {}", name.bright_white());
    println!("  Identity: {}", identity.as_str().bright_yellow());
    println!("  Balance:  {}", balance.to_string().bright_cyan());
    println!();

    Ok(())
}

fn list_wallets(data_dir: &Path) -> Result<()> {
    let keys_dir = data_dir.join("keys");
    if !keys_dir.exists() {
        println!("No wallets found. Use 'powchain wallet new' to create one.");
        return Ok(());
    }

    let mut names: Vec<String> = fs::read_dir(&keys_dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            (path.extension()? == "json")
                .then(|| path.file_stem()?.to_str().map(str::to_string))
                .flatten()
        })
        .collect();
    names.sort();

    println!();
    println!("{}", "Wallets:".bold().cyan());
    println!();
    for name in names {
        match load_keypair(data_dir, &name) {
            Ok(keypair) => println!(
                "  {:<12} {}",
                name.bright_white(),
                keypair.identity().short().bright_yellow()
            ),
            Err(e) => println!("  {:<12} {}", name.bright_white(), e.to_string().red()),
        }
    }
    println!();

    Ok(())
}

/// `keys/{name}.json` under `data_dir`.
pub fn key_path(data_dir: &Path, name: &str) -> PathBuf {
    data_dir.join("keys").join(format!("{}.json", name))
}

/// Write `keys/{name}.json` under `data_dir`.
pub fn save_keypair(data_dir: &Path, name: &str, keypair: &Keypair) -> Result<PathBuf> {
    let path = key_path(data_dir, name);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }

    let key_file = KeyFile {
        identity: keypair.identity().as_str().to_string(),
        public_key: hex::encode(keypair.public_key.as_bytes()),
        private_key: hex::encode(keypair.private_key()),
    };
    fs::write(&path, serde_json::to_string_pretty(&key_file)?)
        .with_context(|| format!("Failed to write key file: {}", path.display()))?;
    Ok(path)
}

/// Read `keys/{name}.json` under `data_dir`.
pub fn load_keypair(data_dir: &Path, name: &str) -> Result<Keypair> {
    let path = key_path(data_dir, name);
    let text = fs::read_to_string(&path).with_context(|| {
        format!(
            "Failed to read wallet '{}' ({}). Use 'powchain wallet new' to create it",
            name,
            path.display()
        )
    })?;
    let key_file: KeyFile = serde_json::from_str(&text)
        .with_context(|| format!("Invalid key file: {}", path.display()))?;

    let bytes = hex::decode(&key_file.private_key).context("Invalid private key hex")?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("Private key must be 32 bytes"))?;
    let keypair = Keypair::from_private_key(&bytes);

    if keypair.identity().as_str() != key_file.identity {
        bail!("Key file {} does not match its identity", path.display());
    }
    Ok(keypair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_keypair_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let keypair = Keypair::generate();

        let path = save_keypair(dir.path(), "alice", &keypair).unwrap();
        assert!(path.ends_with("keys/alice.json"));

        let loaded = load_keypair(dir.path(), "alice").unwrap();
        assert_eq!(loaded.identity(), keypair.identity());
        assert_eq!(loaded.private_key(), keypair.private_key());
    }

    #[test]
    fn test_missing_wallet() {
        let dir = TempDir::new().unwrap();
        let err = load_keypair(dir.path(), "ghost").unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_mismatched_identity_rejected() {
        let dir = TempDir::new().unwrap();
        let keypair = Keypair::generate();
        let path = save_keypair(dir.path(), "w", &keypair).unwrap();

        let mut key_file: KeyFile =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        key_file.identity = Keypair::generate().identity().as_str().to_string();
        fs::write(&path, serde_json::to_string(&key_file).unwrap()).unwrap();

        assert!(load_keypair(dir.path(), "w").is_err());
    }
}
