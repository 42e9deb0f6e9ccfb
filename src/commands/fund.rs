//! Fund the wallet through a Lightning mint quote.

use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::mint::MintConnector;
use crate::wallet::Wallet;

/// Poll the quote for up to two minutes.
const POLL_ATTEMPTS: u32 = 60;
const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub async fn run<M: MintConnector>(wallet: &Wallet<M>, amount: u64) -> Result<()> {
    println!("{}", "Requesting mint quote...".cyan());

    let quote = wallet
        .fund_quote(amount)
        .await
        .context("Failed to request a mint quote")?;

    println!();
    println!("{}", "Pay this invoice to fund the wallet:".yellow().bold());
    println!();
    println!("{}", quote.request);
    println!();
    println!("{}", "Waiting for payment...".dimmed());

    let minted = wallet
        .fund_claim(&quote.quote, amount, POLL_ATTEMPTS, POLL_INTERVAL)
        .await
        .with_context(|| format!("Quote {} was not completed", quote.quote))?;

    println!();
    println!("{}", format!("Minted {minted}").green().bold());
    println!("New balance: {}", wallet.balance()?);

    Ok(())
}
