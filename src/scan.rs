//! Receiver-side discovery over the mint's spent-secret feed.
//!
//! Every 66-hex entry in the feed is treated as a possible ephemeral pubkey.
//! For each one the scanner rederives the outputs a sender would have built,
//! asks the mint to restore them, keeps whatever is still unspent, and
//! finally swaps the haul into fresh randomly blinded proofs so the stored
//! secrets no longer link back to the sender.

use std::collections::HashMap;

use k256::ProjectivePoint;
use tracing::{debug, info, warn};

use crate::crypto::{
    create_silent_output, ecdh, point_from_hex, proof_y, MAX_SILENT_OUTPUTS,
};
use crate::error::WalletError;
use crate::mint::MintConnector;
use crate::types::{input_fee, BlindedMessage, OutputData, Proof, ProofState};
use crate::wallet::{active_keyset, keyset_keys, random_outputs, unblind_outputs, Wallet};

/// Result of one scan pass.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Proofs restored from the feed before claiming.
    pub discovered: usize,
    /// Amount credited to the store after the claim swap.
    pub claimed: u64,
}

/// A feed entry qualifies as a candidate iff it is the hex of a compressed
/// curve point. Everything else is skipped without comment.
pub(crate) fn candidate_point(secret: &str) -> Option<ProjectivePoint> {
    if secret.len() != 66 {
        return None;
    }
    point_from_hex(secret).ok()
}

impl<M: MintConnector> Wallet<M> {
    /// Scan the spent-secret feed for silent payments to this wallet and
    /// claim whatever is found.
    ///
    /// Probes [`MAX_SILENT_OUTPUTS`] indices per candidate, all under the
    /// currently active keyset: payments issued under a since-rotated keyset
    /// are not discovered. Repeating a scan over the same feed is safe —
    /// already-claimed outputs restore as spent and are filtered out.
    pub async fn scan(&self) -> Result<ScanSummary, WalletError> {
        let silent_keys = self.ensure_silent_keys()?;
        let scan_secret = silent_keys.scan_secret()?;
        let spend_pub = silent_keys.spend_point()?;

        let meta = self.mint_metadata().await?;
        let keyset = active_keyset(&meta)?.clone();
        let keys = keyset_keys(&meta, &keyset.id)?;

        let feed = self.mint.fetch_spent_secrets().await?;
        debug!("scanning {} spent secret(s)", feed.len());

        let mut restored: Vec<Proof> = Vec::new();
        for candidate in &feed {
            let Some(ephemeral_pub) = candidate_point(candidate) else {
                continue;
            };

            let shared_secret = ecdh(&scan_secret, &ephemeral_pub);
            let mut outputs: Vec<OutputData> = Vec::with_capacity(MAX_SILENT_OUTPUTS);
            for k in 0..MAX_SILENT_OUTPUTS {
                // Amount 0 placeholder; the restore response carries the
                // amounts the mint actually signed.
                outputs.push(create_silent_output(
                    0,
                    &keyset.id,
                    &shared_secret,
                    &spend_pub,
                    k as u8,
                )?);
            }

            let blinded: Vec<BlindedMessage> = outputs.iter().map(|o| o.blinded.clone()).collect();
            let response = self.mint.restore(&blinded).await?;
            if response.outputs.is_empty() {
                continue;
            }
            if response.outputs.len() != response.signatures.len() {
                return Err(WalletError::RestoreMismatch(format!(
                    "{} outputs vs {} signatures",
                    response.outputs.len(),
                    response.signatures.len()
                )));
            }

            // Pair the mint's answers back to our construction records by B_.
            let by_blinded: HashMap<&str, &OutputData> = outputs
                .iter()
                .map(|o| (o.blinded.b.as_str(), o))
                .collect();
            let mut candidate_proofs: Vec<Proof> = Vec::new();
            for (returned, sig) in response.outputs.iter().zip(&response.signatures) {
                let output = by_blinded
                    .get(returned.b.as_str())
                    .ok_or_else(|| WalletError::RestoreMismatch(returned.b.clone()))?;
                let mut unblinded =
                    unblind_outputs(std::slice::from_ref(*output), std::slice::from_ref(sig), keys)?;
                candidate_proofs.append(&mut unblinded);
            }

            // Keep only what is still spendable.
            let ys = candidate_proofs
                .iter()
                .map(|p| proof_y(&p.secret))
                .collect::<Result<Vec<_>, _>>()?;
            let states = self.mint.check_states(&ys).await?;
            let unspent: HashMap<&str, bool> = states
                .iter()
                .map(|s| (s.y.as_str(), s.state == ProofState::Unspent))
                .collect();

            let before = restored.len();
            for (proof, y) in candidate_proofs.into_iter().zip(&ys) {
                if unspent.get(y.as_str()).copied().unwrap_or(false) {
                    restored.push(proof);
                }
            }
            debug!(
                "candidate {}…: {} unspent output(s)",
                &candidate[..8.min(candidate.len())],
                restored.len() - before
            );
        }

        if restored.is_empty() {
            return Ok(ScanSummary::default());
        }

        // Claim: swap everything we restored into fresh random outputs so the
        // stored secrets stop being derivable from the sender's ephemeral key.
        let total: u64 = restored.iter().map(|p| p.amount).sum();
        let fee = input_fee(&keyset, restored.len() as u64);
        if fee >= total {
            // The proofs stay unspent at the mint; a claim swap here would
            // burn the whole haul as fees. Surface, don't discard.
            warn!(
                "claim swap skipped: fee {fee} consumes restored total {total} \
                 ({} proof(s) left unclaimed)",
                restored.len()
            );
            return Err(WalletError::InsufficientBalance {
                available: total,
                required: fee + 1,
            });
        }
        let claim_amount = total - fee;
        let fresh_outputs = random_outputs(claim_amount, &keyset.id)?;
        let fresh = self
            .swap_for_outputs(&restored, &fresh_outputs, keys)
            .await?;
        self.store.add_proofs(&fresh)?;

        info!(
            "scan discovered {} proof(s), claimed {claim_amount}",
            restored.len()
        );
        Ok(ScanSummary {
            discovered: restored.len(),
            claimed: claim_amount,
        })
    }
}
