//! Show wallet and mint information.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::mint::MintConnector;
use crate::wallet::Wallet;

pub async fn run<M: MintConnector>(wallet: &Wallet<M>, db_path: &Path) -> Result<()> {
    println!();
    println!("{}", "Wallet".yellow().bold());
    println!("  Store:   {}", db_path.display());
    println!("  Balance: {}", wallet.balance()?);

    match wallet.mint_metadata().await {
        Ok(meta) => {
            println!();
            println!("{}", "Mint".yellow().bold());
            if let Some(name) = meta.info.get("name").and_then(|v| v.as_str()) {
                println!("  Name:    {name}");
            }
            if let Some(version) = meta.info.get("version").and_then(|v| v.as_str()) {
                println!("  Version: {version}");
            }
            for keyset in &meta.keysets {
                let status = if keyset.active { "active" } else { "inactive" };
                println!(
                    "  Keyset:  {} ({}, {status}, fee {} ppk)",
                    keyset.id,
                    keyset.unit,
                    keyset.input_fee_ppk.unwrap_or(0)
                );
            }
        }
        Err(err) => {
            println!();
            println!("{}", format!("Mint unreachable: {err}").red());
        }
    }

    Ok(())
}
