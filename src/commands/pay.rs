//! Send a silent payment.

use anyhow::{Context, Result};
use colored::Colorize;

use crate::mint::MintConnector;
use crate::wallet::Wallet;

pub async fn run<M: MintConnector>(wallet: &Wallet<M>, to: &str, amount: u64) -> Result<()> {
    println!("{}", "Preparing silent payment...".cyan());

    let receipt = wallet
        .pay(to, amount)
        .await
        .context("Payment failed")?;

    let sent: u64 = receipt.bob_proofs.iter().map(|p| p.amount).sum();
    let change: u64 = receipt.change.iter().map(|p| p.amount).sum();

    println!();
    println!("{}", format!("Sent {sent}").green().bold());
    println!(
        "  Outputs:       {} proof(s) for the recipient",
        receipt.bob_proofs.len()
    );
    println!("  Change kept:   {change}");
    println!("  Signal secret: {}", receipt.signal_secret.dimmed());
    println!();
    println!(
        "{}",
        "The recipient will discover this payment on their next scan.".dimmed()
    );

    Ok(())
}
