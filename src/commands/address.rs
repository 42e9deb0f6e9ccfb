//! Display the wallet's silent payment address.

use anyhow::Result;
use colored::Colorize;

use crate::mint::MintConnector;
use crate::wallet::Wallet;

pub fn run<M: MintConnector>(wallet: &Wallet<M>) -> Result<()> {
    let address = wallet.address()?;
    let mut parts = address.rsplitn(3, ':');
    let spend = parts.next().unwrap_or_default().to_string();
    let scan = parts.next().unwrap_or_default().to_string();

    println!();
    println!("{}", "Your Silent Payment Address".yellow().bold());
    println!();
    println!("{address}");
    println!();
    println!("{}:", "Components".dimmed());
    println!("  Scan pubkey:  {scan}");
    println!("  Spend pubkey: {spend}");
    println!();
    println!(
        "{}",
        "Share the address above to receive payments privately.".dimmed()
    );

    Ok(())
}
