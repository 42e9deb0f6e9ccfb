//! Silent payments for Cashu ecash.
//!
//! A sender who knows only a receiver's static address
//! (`mint_url:scan_pub:spend_pub`) can pay them without interaction and
//! without telling anyone who got paid: the payment is announced by spending
//! a proof whose secret is an ephemeral pubkey, and the receiver finds it by
//! scanning the mint's public spent-secret feed and restoring the outputs
//! only they can rederive.

pub mod commands;
pub mod config;
pub mod crypto;
pub mod error;
pub mod mint;
pub mod pay;
pub mod scan;
pub mod store;
pub mod types;
pub mod wallet;


#[cfg(test)]
mod test_vectors;

#[cfg(test)]
mod fuzz_tests;


pub use error::WalletError;
pub use wallet::Wallet;
