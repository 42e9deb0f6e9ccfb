//! Mint adapter: the trait the engines talk to, and the HTTP client that
//! implements it against a real Cashu mint.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::WalletError;
use crate::types::{
    BlindSignature, BlindedMessage, CheckStateRequest, CheckStateResponse, KeySet, KeySetInfo,
    KeysResponse, KeysetsResponse, MintQuoteRequest, MintQuoteResponse, MintRequest, MintResponse,
    Proof, ProofStateInfo, RestoreRequest, RestoreResponse, SpentSecretsResponse, SwapRequest,
    SwapResponse,
};

/// Client timeout applied to every mint call. No retries here; failures
/// propagate to the caller.
const MINT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the wallet core needs from a Cashu mint.
///
/// The wallet is generic over this trait so tests can substitute an
/// in-process mint. `fetch_spent_secrets` is the one non-standard endpoint:
/// the scan protocol depends on the mint publishing the secrets of every
/// proof ever spent.
#[allow(async_fn_in_trait)]
pub trait MintConnector {
    async fn get_keysets(&self) -> Result<Vec<KeySetInfo>, WalletError>;

    async fn get_keys(&self, keyset_id: &str) -> Result<Vec<KeySet>, WalletError>;

    async fn get_info(&self) -> Result<serde_json::Value, WalletError>;

    async fn mint_quote(&self, amount: u64) -> Result<MintQuoteResponse, WalletError>;

    async fn mint_quote_state(&self, quote_id: &str) -> Result<MintQuoteResponse, WalletError>;

    async fn mint(
        &self,
        quote_id: &str,
        outputs: &[BlindedMessage],
    ) -> Result<Vec<BlindSignature>, WalletError>;

    async fn swap(
        &self,
        inputs: &[Proof],
        outputs: &[BlindedMessage],
    ) -> Result<Vec<BlindSignature>, WalletError>;

    /// Returns only the outputs the mint has ever signed, paired with their
    /// signatures by identical `B_`.
    async fn restore(&self, outputs: &[BlindedMessage]) -> Result<RestoreResponse, WalletError>;

    async fn check_states(&self, ys: &[String]) -> Result<Vec<ProofStateInfo>, WalletError>;

    async fn fetch_spent_secrets(&self) -> Result<Vec<String>, WalletError>;
}

/// reqwest-backed [`MintConnector`] speaking the NUT REST endpoints.
#[derive(Clone)]
pub struct HttpMintClient {
    http: Client,
    base: Url,
}

impl HttpMintClient {
    pub fn new(mint_url: &str) -> Result<Self, WalletError> {
        // A trailing slash makes Url::join treat the last path segment as a
        // directory instead of replacing it.
        let normalized = if mint_url.ends_with('/') {
            mint_url.to_string()
        } else {
            format!("{mint_url}/")
        };
        let base = Url::parse(&normalized)
            .map_err(|e| WalletError::MintUnavailable(format!("invalid mint url: {e}")))?;
        let http = Client::builder().timeout(MINT_HTTP_TIMEOUT).build()?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, WalletError> {
        self.base
            .join(path)
            .map_err(|e| WalletError::MintUnavailable(format!("invalid mint path {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, WalletError> {
        let url = self.endpoint(path)?;
        debug!("GET {url}");
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(WalletError::MintUnavailable(format!(
                "GET {path} returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, WalletError> {
        let url = self.endpoint(path)?;
        debug!("POST {url}");
        let response = self.http.post(url).json(body).send().await?;
        if !response.status().is_success() {
            return Err(WalletError::MintUnavailable(format!(
                "POST {path} returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }
}

impl MintConnector for HttpMintClient {
    async fn get_keysets(&self) -> Result<Vec<KeySetInfo>, WalletError> {
        let response: KeysetsResponse = self.get_json("v1/keysets").await?;
        Ok(response.keysets)
    }

    async fn get_keys(&self, keyset_id: &str) -> Result<Vec<KeySet>, WalletError> {
        let response: KeysResponse = self.get_json(&format!("v1/keys/{keyset_id}")).await?;
        Ok(response.keysets)
    }

    async fn get_info(&self) -> Result<serde_json::Value, WalletError> {
        self.get_json("v1/info").await
    }

    async fn mint_quote(&self, amount: u64) -> Result<MintQuoteResponse, WalletError> {
        let request = MintQuoteRequest {
            amount,
            unit: "sat".into(),
        };
        self.post_json("v1/mint/quote/bolt11", &request).await
    }

    async fn mint_quote_state(&self, quote_id: &str) -> Result<MintQuoteResponse, WalletError> {
        self.get_json(&format!("v1/mint/quote/bolt11/{quote_id}"))
            .await
    }

    async fn mint(
        &self,
        quote_id: &str,
        outputs: &[BlindedMessage],
    ) -> Result<Vec<BlindSignature>, WalletError> {
        let request = MintRequest {
            quote: quote_id.to_string(),
            outputs: outputs.to_vec(),
        };
        let response: MintResponse = self.post_json("v1/mint/bolt11", &request).await?;
        Ok(response.signatures)
    }

    async fn swap(
        &self,
        inputs: &[Proof],
        outputs: &[BlindedMessage],
    ) -> Result<Vec<BlindSignature>, WalletError> {
        let request = SwapRequest {
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        };
        let response: SwapResponse = self.post_json("v1/swap", &request).await?;
        Ok(response.signatures)
    }

    async fn restore(&self, outputs: &[BlindedMessage]) -> Result<RestoreResponse, WalletError> {
        let request = RestoreRequest {
            outputs: outputs.to_vec(),
        };
        self.post_json("v1/restore", &request).await
    }

    async fn check_states(&self, ys: &[String]) -> Result<Vec<ProofStateInfo>, WalletError> {
        let request = CheckStateRequest { ys: ys.to_vec() };
        let response: CheckStateResponse = self.post_json("v1/checkstate", &request).await?;
        Ok(response.states)
    }

    async fn fetch_spent_secrets(&self) -> Result<Vec<String>, WalletError> {
        let response: SpentSecretsResponse = self.get_json("v1/spent-secrets").await?;
        Ok(response.secrets)
    }
}
