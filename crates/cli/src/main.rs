//! powchain CLI entry point.

use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

mod commands;

#[derive(Parser)]
#[command(name = "powchain")]
#[command(about = "A proof-of-work ledger node", long_about = None)]
struct Cli {
    /// Directory holding config.json, the state file and wallet keys
    #[arg(short, long, global = true, default_value = "./powchain_data")]
    data_dir: PathBuf,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<commands::Commands>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(cmd) => {
            if let Err(e) = commands::run(cmd, &cli.data_dir).await {
                eprintln!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("powchain - A proof-of-work ledger node");
            println!("Run 'powchain --help' for usage information.");
        }
    }
}
