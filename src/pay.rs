//! Two-phase silent send.
//!
//! Phase one swaps the selected inputs into a single "signal" proof whose
//! secret is the hex of a fresh compressed ephemeral pubkey. Phase two
//! spends that proof into the receiver's deterministically derived outputs
//! plus random change. Once the signal proof is later consumed, its secret
//! lands in the mint's spent-secret feed and becomes the receiver's
//! discovery beacon.

use k256::ProjectivePoint;
use tracing::{info, warn};

use crate::config::parse_address;
use crate::crypto::{
    blind_message, compress, create_silent_output, decompress, ecdh, random_scalar,
};
use crate::error::WalletError;
use crate::mint::MintConnector;
use crate::types::{input_fee, split_amount, BlindedMessage, OutputData, Proof};
use crate::wallet::{active_keyset, keyset_keys, random_output, Wallet};

/// Outcome of a successful pay: what went to the receiver, what came back
/// as change, and the secret whose appearance in the spent-secret feed will
/// let the receiver discover the payment.
#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub bob_proofs: Vec<Proof>,
    pub change: Vec<Proof>,
    pub signal_secret: String,
}

impl<M: MintConnector> Wallet<M> {
    /// Pay `amount` to a silent payment address on this wallet's mint.
    ///
    /// The local store is only touched after the second swap succeeds. If
    /// the first swap succeeds and the second fails, the signal proof is
    /// orphaned at the mint: the error is surfaced (with the signal secret
    /// logged at warn level) rather than auto-recovered.
    ///
    /// A payment whose denomination split exceeds the scanner probe bound
    /// ([`crate::crypto::MAX_SILENT_OUTPUTS`]) leaves the excess outputs
    /// undiscoverable by a standard scanner.
    pub async fn pay(&self, address: &str, amount: u64) -> Result<PaymentReceipt, WalletError> {
        let addr = parse_address(address)?;
        if addr.mint_url.trim_end_matches('/') != self.mint_url {
            return Err(WalletError::CrossMint {
                target: addr.mint_url,
                local: self.mint_url.clone(),
            });
        }
        let scan_pub = decompress(&addr.scan_pubkey)
            .map_err(|_| WalletError::AddressParse("scan key is not a curve point".into()))?;
        let spend_pub = decompress(&addr.spend_pubkey)
            .map_err(|_| WalletError::AddressParse("spend key is not a curve point".into()))?;

        let available = self.store.get_balance()?;
        if amount == 0 {
            return Err(WalletError::InsufficientBalance {
                available,
                required: 1,
            });
        }
        if available < amount {
            return Err(WalletError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        let meta = self.mint_metadata().await?;
        let keyset = active_keyset(&meta)?.clone();
        let keys = keyset_keys(&meta, &keyset.id)?;

        // Selection must also cover the input fees of both swaps.
        let proofs = self.store.list_proofs()?;
        let mut selected: Vec<Proof> = Vec::new();
        let mut input_total = 0u64;
        for proof in proofs {
            if input_total >= amount + input_fee(&keyset, selected.len() as u64) + input_fee(&keyset, 1)
            {
                break;
            }
            input_total += proof.amount;
            selected.push(proof);
        }
        let signal_fee = input_fee(&keyset, selected.len() as u64);
        let silent_fee = input_fee(&keyset, 1);
        if input_total < amount + signal_fee + silent_fee {
            return Err(WalletError::InsufficientBalance {
                available,
                required: amount + signal_fee + silent_fee,
            });
        }

        // Phase one: swap the inputs into the signal proof. Its secret is the
        // ephemeral pubkey; the blinding factor is fresh random because the
        // sender never needs to rediscover this output.
        let ephemeral = random_scalar();
        let ephemeral_pub = ProjectivePoint::GENERATOR * ephemeral;
        let signal_secret = hex::encode(compress(&ephemeral_pub));
        let signal_amount = input_total - signal_fee;

        let (r, blinded_point) = blind_message(signal_secret.as_bytes(), None)?;
        let signal_output = OutputData {
            blinded: BlindedMessage {
                amount: signal_amount,
                keyset_id: keyset.id.clone(),
                b: hex::encode(compress(&blinded_point)),
            },
            r,
            secret: signal_secret.clone(),
        };
        let signal_proofs = self
            .swap_for_outputs(&selected, &[signal_output], keys)
            .await?;
        info!(
            "signal swap complete: {} inputs -> signal proof of {}",
            selected.len(),
            signal_amount
        );

        // Phase two: spend the signal proof into the receiver's derived
        // outputs (index k advances in ascending-denomination order) plus
        // random change for ourselves.
        let shared_secret = ecdh(&ephemeral, &scan_pub);
        let change_amount = signal_amount - silent_fee - amount;

        let mut outputs: Vec<OutputData> = Vec::new();
        for (k, amt) in split_amount(amount).into_iter().enumerate() {
            outputs.push(create_silent_output(
                amt,
                &keyset.id,
                &shared_secret,
                &spend_pub,
                k as u8,
            )?);
        }
        let bob_count = outputs.len();
        for amt in split_amount(change_amount) {
            outputs.push(random_output(amt, &keyset.id)?);
        }

        let signed = match self.swap_for_outputs(&signal_proofs, &outputs, keys).await {
            Ok(proofs) => proofs,
            Err(err) => {
                // The signal proof exists at the mint but we hold no local
                // record of it beyond this secret. Surface, don't unwind.
                warn!(
                    "silent swap failed after signal swap; orphaned signal proof \
                     amount={signal_amount} secret={signal_secret}"
                );
                return Err(err);
            }
        };

        let (bob_proofs, change) = signed.split_at(bob_count);

        // Commit: inputs leave the store, change enters it. Ordering matters;
        // committing earlier would double-count change on a failed swap.
        let spent_secrets: Vec<String> = selected.iter().map(|p| p.secret.clone()).collect();
        self.store.remove_proofs(&spent_secrets)?;
        self.store.add_proofs(change)?;

        info!(
            "paid {amount} to silent address ({} outputs, {} change)",
            bob_count,
            change.len()
        );
        Ok(PaymentReceipt {
            bob_proofs: bob_proofs.to_vec(),
            change: change.to_vec(),
            signal_secret,
        })
    }
}
