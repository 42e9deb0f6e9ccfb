//! Wallet façade: owns the store, the mint connection, and the long-lived
//! identity, and exposes the user-facing operations. The pay and scan
//! engines live in their own modules as further `impl` blocks on [`Wallet`].
//!
//! One wallet handle per `(db_path, mint_url)`; the store assumes a single
//! writer, and concurrent opens of the same file are undefined.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use bip39::Mnemonic;
use chrono::Utc;
use k256::ProjectivePoint;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, info};
use zeroize::Zeroize;

use crate::config::format_address;
use crate::crypto::{blind_message, compress, point_from_hex, unblind_signature, SilentKeys};
use crate::error::WalletError;
use crate::mint::{HttpMintClient, MintConnector};
use crate::store::WalletDb;
use crate::types::{
    split_amount, BlindSignature, BlindedMessage, CachedMintMetadata, KeySetInfo,
    MintQuoteResponse, MintQuoteState, OutputData, Proof,
};

pub struct Wallet<M> {
    pub(crate) store: WalletDb,
    pub(crate) mint: M,
    pub(crate) mint_url: String,
}

impl Wallet<HttpMintClient> {
    /// Open (creating on first use) the wallet at `db_path`, bound to `mint_url`.
    pub async fn open(db_path: impl AsRef<Path>, mint_url: &str) -> Result<Self, WalletError> {
        let store = WalletDb::open(db_path)?;
        let mint = HttpMintClient::new(mint_url)?;
        Self::from_parts(store, mint, mint_url)
    }
}

impl<M: MintConnector> Wallet<M> {
    /// Assemble a wallet from already-built parts. Tests use this to plug in
    /// an in-process mint.
    pub fn from_parts(store: WalletDb, mint: M, mint_url: &str) -> Result<Self, WalletError> {
        let wallet = Self {
            store,
            mint,
            mint_url: mint_url.trim_end_matches('/').to_string(),
        };
        wallet.bootstrap_mnemonic()?;
        Ok(wallet)
    }

    /// Close the wallet, flushing the store.
    pub fn close(self) -> Result<(), WalletError> {
        self.store.close()
    }

    /// Sum of all locally held proofs.
    pub fn balance(&self) -> Result<u64, WalletError> {
        self.store.get_balance()
    }

    /// The wallet's silent payment address, `mint_url:scan_pub:spend_pub`.
    ///
    /// Silent keys are derived from the wallet mnemonic on the first call
    /// and are immutable afterwards.
    pub fn address(&self) -> Result<String, WalletError> {
        let keys = self.ensure_silent_keys()?;
        Ok(format_address(
            &self.mint_url,
            &keys.scan_pubkey,
            &keys.spend_pubkey,
        ))
    }

    /// Request a bolt11 quote to fund the wallet with `amount`.
    pub async fn fund_quote(&self, amount: u64) -> Result<MintQuoteResponse, WalletError> {
        self.mint.mint_quote(amount).await
    }

    /// Wait for a quote to be paid, then mint `amount` into fresh proofs.
    ///
    /// Polls the quote `attempts` times with `interval` between polls; the
    /// window is caller-bounded, and a timeout is recoverable by calling
    /// again with the same quote id.
    pub async fn fund_claim(
        &self,
        quote_id: &str,
        amount: u64,
        attempts: u32,
        interval: Duration,
    ) -> Result<u64, WalletError> {
        let mut paid = false;
        for _ in 0..attempts {
            let quote = self.mint.mint_quote_state(quote_id).await?;
            match quote.state {
                MintQuoteState::Paid => {
                    paid = true;
                    break;
                }
                MintQuoteState::Issued => {
                    return Err(WalletError::MintUnavailable(format!(
                        "quote {quote_id} was already issued"
                    )));
                }
                MintQuoteState::Unpaid => tokio::time::sleep(interval).await,
            }
        }
        if !paid {
            return Err(WalletError::MintQuoteTimeout(quote_id.to_string()));
        }

        let meta = self.mint_metadata().await?;
        let keyset = active_keyset(&meta)?.clone();
        let outputs = random_outputs(amount, &keyset.id)?;
        let blinded: Vec<BlindedMessage> = outputs.iter().map(|o| o.blinded.clone()).collect();
        let signatures = self.mint.mint(quote_id, &blinded).await?;

        let keys = keyset_keys(&meta, &keyset.id)?;
        let proofs = unblind_outputs(&outputs, &signatures, keys)?;
        self.store.add_proofs(&proofs)?;
        info!("minted {amount} into {} proof(s)", proofs.len());
        Ok(amount)
    }

    /// Mint metadata, served from the store cache while fresh.
    pub async fn mint_metadata(&self) -> Result<CachedMintMetadata, WalletError> {
        let now = Utc::now().timestamp();
        if let Some(meta) = self.store.get_cached_mint_meta(&self.mint_url, now)? {
            return Ok(meta);
        }

        debug!("refreshing mint metadata from {}", self.mint_url);
        let keysets = self.mint.get_keysets().await?;
        let mut keys = Vec::with_capacity(keysets.len());
        for keyset in &keysets {
            keys.extend(self.mint.get_keys(&keyset.id).await?);
        }
        let info = self.mint.get_info().await?;
        let meta = CachedMintMetadata {
            keysets,
            keys,
            info,
            cached_at: now,
        };
        self.store.cache_mint_meta(&self.mint_url, &meta)?;
        Ok(meta)
    }

    /// Load the silent keys, deriving and persisting them on first use.
    pub(crate) fn ensure_silent_keys(&self) -> Result<SilentKeys, WalletError> {
        if let Some(keys) = self.store.get_silent_keys()? {
            return Ok(keys);
        }
        let stored = self
            .store
            .get_mnemonic()?
            .ok_or_else(|| WalletError::StoreFailure("wallet mnemonic missing".into()))?;
        let mnemonic: Mnemonic = stored
            .parse()
            .map_err(|e| WalletError::Crypto(format!("stored mnemonic invalid: {e}")))?;
        let mut seed = mnemonic.to_seed("");
        let keys = SilentKeys::from_seed(&seed)?;
        seed.zeroize();
        self.store.save_silent_keys(&keys)?;
        info!("derived silent payment keys from wallet seed");
        Ok(keys)
    }

    /// Swap `inputs` for the given prebuilt outputs and unblind the result.
    ///
    /// Callers choose the output construction (random or silent-derived) by
    /// building the `OutputData` list themselves.
    pub(crate) async fn swap_for_outputs(
        &self,
        inputs: &[Proof],
        outputs: &[OutputData],
        keys: &BTreeMap<u64, String>,
    ) -> Result<Vec<Proof>, WalletError> {
        let blinded: Vec<BlindedMessage> = outputs.iter().map(|o| o.blinded.clone()).collect();
        let signatures = self.mint.swap(inputs, &blinded).await?;
        unblind_outputs(outputs, &signatures, keys)
    }

    fn bootstrap_mnemonic(&self) -> Result<(), WalletError> {
        if self.store.get_mnemonic()?.is_some() {
            return Ok(());
        }
        let mut entropy = [0u8; 32];
        OsRng.fill_bytes(&mut entropy);
        let mnemonic = Mnemonic::from_entropy(&entropy)
            .map_err(|e| WalletError::Crypto(format!("mnemonic generation failed: {e}")))?;
        entropy.zeroize();
        self.store.save_mnemonic(&mnemonic.to_string())?;
        info!("generated new wallet mnemonic");
        Ok(())
    }
}

/// First active keyset for the sat unit.
pub(crate) fn active_keyset(meta: &CachedMintMetadata) -> Result<&KeySetInfo, WalletError> {
    meta.keysets
        .iter()
        .find(|k| k.active && k.unit == "sat")
        .ok_or_else(|| WalletError::MintUnavailable("mint has no active sat keyset".into()))
}

/// Denomination key map of a cached keyset.
pub(crate) fn keyset_keys<'a>(
    meta: &'a CachedMintMetadata,
    keyset_id: &str,
) -> Result<&'a BTreeMap<u64, String>, WalletError> {
    meta.keys
        .iter()
        .find(|k| k.id == keyset_id)
        .map(|k| &k.keys)
        .ok_or_else(|| {
            WalletError::MintUnavailable(format!("mint keys for keyset {keyset_id} not cached"))
        })
}

/// The mint's public key for one denomination.
pub(crate) fn mint_pubkey(
    keys: &BTreeMap<u64, String>,
    amount: u64,
) -> Result<ProjectivePoint, WalletError> {
    let key_hex = keys.get(&amount).ok_or_else(|| {
        WalletError::MintUnavailable(format!("mint publishes no key for amount {amount}"))
    })?;
    point_from_hex(key_hex)
}

/// Build randomly blinded outputs for `amount`, split into standard
/// denominations.
pub(crate) fn random_outputs(
    amount: u64,
    keyset_id: &str,
) -> Result<Vec<OutputData>, WalletError> {
    split_amount(amount)
        .into_iter()
        .map(|amt| random_output(amt, keyset_id))
        .collect()
}

/// One randomly blinded output with a fresh random secret.
pub(crate) fn random_output(amount: u64, keyset_id: &str) -> Result<OutputData, WalletError> {
    let mut secret_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut secret_bytes);
    let secret = hex::encode(secret_bytes);
    let (r, point) = blind_message(secret.as_bytes(), None)?;
    Ok(OutputData {
        blinded: BlindedMessage {
            amount,
            keyset_id: keyset_id.to_string(),
            b: hex::encode(compress(&point)),
        },
        r,
        secret,
    })
}

/// Unblind a full set of swap/mint signatures against their request records.
pub(crate) fn unblind_outputs(
    outputs: &[OutputData],
    signatures: &[BlindSignature],
    keys: &BTreeMap<u64, String>,
) -> Result<Vec<Proof>, WalletError> {
    if signatures.len() != outputs.len() {
        return Err(WalletError::MintUnavailable(format!(
            "mint returned {} signatures for {} outputs",
            signatures.len(),
            outputs.len()
        )));
    }
    outputs
        .iter()
        .zip(signatures)
        .map(|(output, sig)| {
            let blinded_sig = point_from_hex(&sig.c)?;
            let key = mint_pubkey(keys, sig.amount)?;
            let c = unblind_signature(&blinded_sig, &output.r, &key);
            Ok(Proof {
                keyset_id: sig.keyset_id.clone(),
                amount: sig.amount,
                secret: output.secret.clone(),
                c: hex::encode(compress(&c)),
            })
        })
        .collect()
}
