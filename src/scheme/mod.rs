//! Payment scheme engines.
//!
//! Each engine implements per-scheme verification and settlement for one
//! network. Verification is a pure check against the published requirement;
//! settlement re-verifies, probes the chain for an already-landed signature,
//! and otherwise reconstructs and submits the client-signed transfer.
//!
//! The settlement state machine for both engines:
//!
//! ```text
//!            invalid
//!              │
//!  [Received] ─┴→ [Rejected]
//!       │
//!       ↓ valid
//!  [Verified]
//!       │
//!       ├─ signature already on chain ──→ [Settled] (idempotent)
//!       ↓
//!  [Submitting] ── rpc error ──→ [Failed]
//!       │
//!       ↓ accepted
//!  [AwaitingConfirmation] ── timeout/err ──→ [Failed]
//!       │
//!       ↓ confirmed
//!  [Settled]
//! ```
//!
//! Engines never retry; a repeated `/settle` with the same header takes the
//! idempotent path.

pub mod spl;
pub mod transfer;

pub use spl::SplEngine;
pub use transfer::TransferEngine;

use async_trait::async_trait;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use std::str::FromStr;
use std::time::Duration;

use crate::chain::{ChainError, SolanaRpc};
use crate::network::Network;
use crate::timestamp::UnixTimestampMillis;
use crate::types::{ErrorCode, PaymentPayload, PaymentRequirements, Scheme};
use crate::util::MoneyAmount;

/// Replay/freshness window: payloads older than this are rejected.
pub const FRESHNESS_WINDOW_MS: u64 = 5 * 60 * 1000;

/// Native SOL uses 9 decimals (1 SOL = 10⁹ lamports).
pub const SOL_DECIMALS: u8 = 9;

/// Upper bound on the confirmation await, matching the HTTP layer's
/// per-request timeout.
const MAX_CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);

/// A settlement that reached confirmed commitment (or was already on chain).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub tx_hash: String,
    pub confirmations: Option<u64>,
}

/// A settlement failure, optionally carrying the signature of the attempted
/// submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleError {
    pub reason: ErrorCode,
    pub tx_hash: Option<String>,
}

impl From<ErrorCode> for SettleError {
    fn from(reason: ErrorCode) -> Self {
        SettleError {
            reason,
            tx_hash: None,
        }
    }
}

/// Per-scheme verification and settlement for one network.
///
/// `token_decimals` is resolved by the facilitator for SPL payments and
/// ignored by the native transfer engine.
#[async_trait]
pub trait SchemeEngine: Send + Sync {
    fn scheme(&self) -> Scheme;

    fn network(&self) -> Network;

    /// Pure check of the payload against the requirement. Performs no chain
    /// writes; every rejection carries a reason from the error taxonomy.
    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
        token_decimals: Option<u8>,
    ) -> Result<(), ErrorCode>;

    /// Re-verifies, then settles the payment on chain.
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
        token_decimals: Option<u8>,
    ) -> Result<Settlement, SettleError>;
}

/// Checks the envelope's scheme and network against the engine's identity.
/// Mismatches are reported before any payload field is inspected, so the
/// most specific rejection reason wins.
pub(crate) fn check_envelope(
    payload: &PaymentPayload,
    scheme: Scheme,
    network: Network,
) -> Result<(), ErrorCode> {
    if payload.scheme != scheme {
        return Err(ErrorCode::SchemeMismatch);
    }
    if payload.network != network {
        return Err(ErrorCode::NetworkMismatch);
    }
    Ok(())
}

/// A base58 ed25519 signature encodes to 87 or 88 characters.
pub(crate) fn check_signature_format(signature: &str) -> Result<Signature, ErrorCode> {
    if !(87..=88).contains(&signature.len()) {
        return Err(ErrorCode::InvalidSignature);
    }
    Signature::from_str(signature).map_err(|_| ErrorCode::InvalidSignature)
}

pub(crate) fn parse_address(address: &str) -> Result<Pubkey, ErrorCode> {
    Pubkey::from_str(address).map_err(|_| ErrorCode::InvalidAddress)
}

/// The minimum acceptable amount in atomic units, from the requirement's
/// human-readable `maxAmountRequired`.
pub(crate) fn required_atomic(
    requirements: &PaymentRequirements,
    decimals: u8,
) -> Result<u64, ErrorCode> {
    MoneyAmount::parse(&requirements.max_amount_required)
        .and_then(|amount| amount.as_atomic(decimals))
        .map_err(|_| ErrorCode::InvalidAmount)
}

/// Enforces the freshness window. The boundary value (age exactly equal to
/// the window) passes.
pub(crate) fn check_freshness(
    timestamp: UnixTimestampMillis,
    now: UnixTimestampMillis,
) -> Result<(), ErrorCode> {
    if timestamp.age(now) > FRESHNESS_WINDOW_MS {
        return Err(ErrorCode::PayloadExpired);
    }
    Ok(())
}

pub(crate) fn map_chain_error(error: &ChainError) -> ErrorCode {
    match error {
        ChainError::Transport(_) | ChainError::NotAMint(_) | ChainError::AccountNotFound(_) => {
            ErrorCode::ChainRpcError
        }
        ChainError::TransactionFailed(..) => ErrorCode::TransactionRejected,
        ChainError::ConfirmationTimeout(_) => ErrorCode::ConfirmationTimeout,
    }
}

/// The inner confirmation deadline, consistent with the enclosing request
/// timeout: the requirement's `maxTimeoutSeconds` capped at 30 seconds.
pub(crate) fn confirm_timeout(requirements: &PaymentRequirements) -> Duration {
    let requested = Duration::from_secs(requirements.max_timeout_seconds);
    if requested.is_zero() {
        MAX_CONFIRM_TIMEOUT
    } else {
        requested.min(MAX_CONFIRM_TIMEOUT)
    }
}

/// Idempotency probe: asks the chain whether `signature` already landed.
///
/// A landed, successful transaction is the happy path for retries and maps
/// to an idempotent [`Settlement`]. A landed-but-failed transaction is
/// terminal: its signature can never succeed, so the engine reports
/// rejection instead of re-submitting.
pub(crate) async fn probe_existing(
    rpc: &SolanaRpc,
    signature: &Signature,
) -> Result<Option<Settlement>, SettleError> {
    let status = rpc.get_signature_status(signature).await.map_err(|e| {
        tracing::warn!(error = %e, signature = %signature, "Idempotency probe failed");
        SettleError::from(map_chain_error(&e))
    })?;
    match status {
        None => Ok(None),
        Some(status) => {
            if status.err.is_some() {
                return Err(SettleError {
                    reason: ErrorCode::TransactionRejected,
                    tx_hash: Some(signature.to_string()),
                });
            }
            tracing::info!(signature = %signature, "Payment already on chain, settling idempotently");
            Ok(Some(Settlement {
                tx_hash: signature.to_string(),
                confirmations: status.confirmations.map(|c| c as u64),
            }))
        }
    }
}

/// Submits a reconstructed transaction carrying the client's signature and
/// awaits confirmed commitment.
pub(crate) async fn submit_and_confirm(
    rpc: &SolanaRpc,
    tx: &solana_transaction::Transaction,
    signature: &Signature,
    timeout: Duration,
) -> Result<Settlement, SettleError> {
    rpc.send_transaction(tx).await.map_err(|e| {
        tracing::warn!(error = %e, signature = %signature, "Transaction submission failed");
        SettleError {
            reason: map_chain_error(&e),
            tx_hash: Some(signature.to_string()),
        }
    })?;
    let confirmations = rpc
        .confirm_transaction(signature, timeout)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, signature = %signature, "Confirmation failed");
            SettleError {
                reason: map_chain_error(&e),
                tx_hash: Some(signature.to_string()),
            }
        })?;
    Ok(Settlement {
        tx_hash: signature.to_string(),
        confirmations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_format_bounds() {
        assert!(check_signature_format(&"1".repeat(86)).is_err());
        assert!(check_signature_format(&"1".repeat(89)).is_err());
        // Right length but not a decodable 64-byte signature.
        assert!(check_signature_format(&"!".repeat(88)).is_err());
        // A real signature string round-trips.
        let sig = Signature::from([7u8; 64]).to_string();
        assert!((87..=88).contains(&sig.len()));
        assert!(check_signature_format(&sig).is_ok());
    }

    #[test]
    fn freshness_boundary_passes() {
        let now = UnixTimestampMillis::from_millis(1_000_000_000);
        let at_boundary = UnixTimestampMillis::from_millis(1_000_000_000 - FRESHNESS_WINDOW_MS);
        assert!(check_freshness(at_boundary, now).is_ok());
        let beyond = UnixTimestampMillis::from_millis(1_000_000_000 - FRESHNESS_WINDOW_MS - 1);
        assert_eq!(check_freshness(beyond, now), Err(ErrorCode::PayloadExpired));
    }

    #[test]
    fn future_timestamp_is_fresh() {
        let now = UnixTimestampMillis::from_millis(1_000);
        let future = UnixTimestampMillis::from_millis(100_000);
        assert!(check_freshness(future, now).is_ok());
    }
}
