//! Error surface of the wallet core.
//!
//! Scan-side candidate rejections are not represented here: a spent secret
//! that is not a well-formed ephemeral pubkey is skipped silently.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid cashu address: {0}")]
    AddressParse(String),

    #[error("address targets mint {target}, wallet is bound to {local}")]
    CrossMint { target: String, local: String },

    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance { available: u64, required: u64 },

    #[error("mint unavailable: {0}")]
    MintUnavailable(String),

    #[error("mint quote {0} was not paid within the polling window")]
    MintQuoteTimeout(String),

    #[error("mint returned a signature for an unknown blinded message: {0}")]
    RestoreMismatch(String),

    #[error("store failure: {0}")]
    StoreFailure(String),

    #[error("crypto failure: {0}")]
    Crypto(String),
}

impl From<rusqlite::Error> for WalletError {
    fn from(err: rusqlite::Error) -> Self {
        WalletError::StoreFailure(err.to_string())
    }
}

impl From<reqwest::Error> for WalletError {
    fn from(err: reqwest::Error) -> Self {
        WalletError::MintUnavailable(err.to_string())
    }
}
