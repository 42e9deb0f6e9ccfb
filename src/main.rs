//! cashu-silent — silent payments over a Cashu mint.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cashu_silent::commands;
use cashu_silent::config;
use cashu_silent::wallet::Wallet;

#[derive(Parser)]
#[command(name = "cashu-silent")]
#[command(version)]
#[command(about = "Silent payments for Cashu ecash")]
#[command(long_about = r#"
cashu-silent sends and receives Cashu ecash through silent payment
addresses. Share your address once; every payment to it lands as ordinary
mint proofs that only you can discover.

Quick start:
  1. cashu-silent address        Show your silent payment address
  2. cashu-silent fund -a 1000   Fund the wallet via a Lightning invoice
  3. cashu-silent pay -t <addr> -a 100
  4. cashu-silent scan           Discover and claim incoming payments
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Cashu mint URL this wallet is bound to
    #[arg(long, global = true, default_value = "http://127.0.0.1:3338")]
    mint_url: String,

    /// Wallet database path (default: CASHU_WALLET_DB or ~/.cashu-silent/wallet.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show your silent payment address
    Address,

    /// Show the wallet balance
    Balance,

    /// Pay a silent payment address
    Pay {
        /// Recipient address (mint_url:scan_pub:spend_pub)
        #[arg(short, long)]
        to: String,

        /// Amount to send, in the mint's smallest unit
        #[arg(short, long)]
        amount: u64,
    },

    /// Scan the mint's spent-secret feed for incoming payments
    Scan,

    /// Fund the wallet through a Lightning mint quote
    Fund {
        /// Amount to mint, in the mint's smallest unit
        #[arg(short, long)]
        amount: u64,
    },

    /// Show wallet and mint information
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cashu_silent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let db_path = match cli.db {
        Some(path) => path,
        None => config::wallet_db_path()?,
    };
    let wallet = Wallet::open(&db_path, &cli.mint_url).await?;

    let outcome = match cli.command {
        Commands::Address => commands::address::run(&wallet),
        Commands::Balance => commands::balance::run(&wallet),
        Commands::Pay { to, amount } => commands::pay::run(&wallet, &to, amount).await,
        Commands::Scan => commands::scan::run(&wallet).await,
        Commands::Fund { amount } => commands::fund::run(&wallet, amount).await,
        Commands::Info => commands::info::run(&wallet, &db_path).await,
    };

    wallet.close()?;
    outcome
}
