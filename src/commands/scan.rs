//! Scan for and claim incoming silent payments.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::mint::MintConnector;
use crate::wallet::Wallet;

pub async fn run<M: MintConnector>(wallet: &Wallet<M>) -> Result<()> {
    println!("{}", "Scanning for incoming silent payments...".cyan());

    let summary = wallet.scan().await.context("Scan failed")?;

    println!();
    if summary.discovered == 0 {
        println!("{}", "No incoming payments found.".yellow());
    } else {
        println!(
            "{}",
            format!(
                "Discovered {} proof(s), claimed {}",
                summary.discovered, summary.claimed
            )
            .green()
            .bold()
        );
        println!("New balance: {}", wallet.balance()?);
    }

    Ok(())
}
