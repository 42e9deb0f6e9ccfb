//! Cashu wire and client-side data model.
//!
//! Field names and serde renames follow the NUT JSON conventions: proofs
//! carry `id`/`amount`/`secret`/`C`, blinded messages carry `B_`, blinded
//! signatures carry `C_`. Secrets stay `String`s end to end; the mint treats
//! them as opaque UTF-8 and the silent-payment scheme depends on the hex
//! string form, not the digest bytes behind it.

use std::collections::BTreeMap;

use k256::Scalar;
use serde::{Deserialize, Serialize};

/// An unspent ecash token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Keyset the signing key belongs to.
    #[serde(rename = "id")]
    pub keyset_id: String,
    /// Amount in the mint's smallest denomination.
    pub amount: u64,
    /// Preimage bound by the mint signature.
    pub secret: String,
    /// Unblinded signature, compressed-point hex.
    #[serde(rename = "C")]
    pub c: String,
}

/// Blinded secret submitted to the mint for signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindedMessage {
    pub amount: u64,
    #[serde(rename = "id")]
    pub keyset_id: String,
    /// `B_ = hash_to_curve(secret) + r*G`, compressed-point hex.
    #[serde(rename = "B_")]
    pub b: String,
}

/// Mint's signature on a blinded message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlindSignature {
    pub amount: u64,
    #[serde(rename = "id")]
    pub keyset_id: String,
    /// `C_ = k*B_`, compressed-point hex.
    #[serde(rename = "C_")]
    pub c: String,
}

/// Client-side construction record for one output.
///
/// Holds everything needed to both request a signature and later unblind it.
/// Deterministic instances of this (see [`crate::crypto::create_silent_output`])
/// are what make restore-based discovery possible.
#[derive(Debug, Clone)]
pub struct OutputData {
    pub blinded: BlindedMessage,
    /// Blinding factor `r`.
    pub r: Scalar,
    pub secret: String,
}

/// Keyset listing entry (`GET /v1/keysets`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySetInfo {
    pub id: String,
    pub unit: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_fee_ppk: Option<u64>,
}

/// Denomination-indexed mint public keys (`GET /v1/keys/{id}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
    pub id: String,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_expiry: Option<u64>,
    /// amount -> compressed pubkey hex
    pub keys: BTreeMap<u64, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysetsResponse {
    pub keysets: Vec<KeySetInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysResponse {
    pub keysets: Vec<KeySet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequest {
    pub inputs: Vec<Proof>,
    pub outputs: Vec<BlindedMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapResponse {
    pub signatures: Vec<BlindSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreRequest {
    pub outputs: Vec<BlindedMessage>,
}

/// Restore response; `outputs[i]` pairs with `signatures[i]`, and every
/// returned output must be one the client submitted (matched by `B_`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreResponse {
    pub outputs: Vec<BlindedMessage>,
    pub signatures: Vec<BlindSignature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckStateRequest {
    #[serde(rename = "Ys")]
    pub ys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProofState {
    Unspent,
    Spent,
    Pending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofStateInfo {
    #[serde(rename = "Y")]
    pub y: String,
    pub state: ProofState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckStateResponse {
    pub states: Vec<ProofStateInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintQuoteRequest {
    pub amount: u64,
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MintQuoteState {
    Unpaid,
    Paid,
    Issued,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintQuoteResponse {
    pub quote: String,
    /// bolt11 payment request funding this quote.
    pub request: String,
    pub state: MintQuoteState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintRequest {
    pub quote: String,
    pub outputs: Vec<BlindedMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintResponse {
    pub signatures: Vec<BlindSignature>,
}

/// `GET /v1/spent-secrets` — the discovery feed the scanner consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpentSecretsResponse {
    pub secrets: Vec<String>,
}

/// Cached copy of a mint's public parameters, refreshed when older than the
/// store's TTL.
#[derive(Debug, Clone)]
pub struct CachedMintMetadata {
    pub keysets: Vec<KeySetInfo>,
    pub keys: Vec<KeySet>,
    pub info: serde_json::Value,
    pub cached_at: i64,
}

/// Split an amount into the mint's standard binary denominations, ascending.
pub fn split_amount(amount: u64) -> Vec<u64> {
    (0..u64::BITS)
        .filter(|bit| amount & (1 << bit) != 0)
        .map(|bit| 1 << bit)
        .collect()
}

/// Input fee reserved by a swap, in the cdk convention: each input costs
/// `input_fee_ppk` thousandths of a unit, rounded up over the whole set.
pub fn input_fee(keyset: &KeySetInfo, num_inputs: u64) -> u64 {
    let ppk = keyset.input_fee_ppk.unwrap_or(0);
    (ppk * num_inputs).div_ceil(1000)
}
