//! Show the wallet balance.

use anyhow::Result;
use colored::Colorize;

use crate::mint::MintConnector;
use crate::wallet::Wallet;

pub fn run<M: MintConnector>(wallet: &Wallet<M>) -> Result<()> {
    let balance = wallet.balance()?;
    println!("{}", format!("Balance: {balance}").green().bold());
    Ok(())
}
