//! The `solana-transfer` engine: native SOL payments via the system program.

use async_trait::async_trait;
use solana_message::Message;
use solana_transaction::Transaction;
use std::sync::Arc;
use tracing::instrument;

use crate::chain::SolanaRpc;
use crate::network::Network;
use crate::scheme::{
    SOL_DECIMALS, SchemeEngine, SettleError, Settlement, check_envelope, check_freshness,
    check_signature_format, confirm_timeout, parse_address, probe_existing, required_atomic,
    submit_and_confirm,
};
use crate::timestamp::UnixTimestampMillis;
use crate::types::{ErrorCode, PaymentPayload, PaymentRequirements, Scheme, SchemePayload};

/// Verifies and settles native SOL transfers for one network.
pub struct TransferEngine {
    rpc: Arc<SolanaRpc>,
}

impl TransferEngine {
    pub fn new(rpc: Arc<SolanaRpc>) -> Self {
        Self { rpc }
    }

    /// The verification sequence. Ordering matters: scheme/network mismatch
    /// is reported before signature format, which is reported before amount,
    /// which is reported before freshness.
    fn check(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
        now: UnixTimestampMillis,
    ) -> Result<TransferChecked, ErrorCode> {
        check_envelope(payload, Scheme::SolanaTransfer, self.network())?;
        let transfer = match &payload.payload {
            SchemePayload::Transfer(transfer) => transfer,
            SchemePayload::Spl(_) => return Err(ErrorCode::SchemeMismatch),
        };
        let signature = check_signature_format(&transfer.signature)?;
        let from = parse_address(&transfer.from)?;
        let required = required_atomic(requirements, SOL_DECIMALS)?;
        if transfer.amount.value() < required {
            return Err(ErrorCode::InsufficientAmount);
        }
        check_freshness(transfer.timestamp, now)?;
        Ok(TransferChecked {
            from,
            signature,
            lamports: transfer.amount.value(),
        })
    }
}

/// Outcome of a successful verification: the parsed fields settlement needs.
struct TransferChecked {
    from: solana_pubkey::Pubkey,
    signature: solana_signature::Signature,
    lamports: u64,
}

#[async_trait]
impl SchemeEngine for TransferEngine {
    fn scheme(&self) -> Scheme {
        Scheme::SolanaTransfer
    }

    fn network(&self) -> Network {
        self.rpc.network()
    }

    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
        _token_decimals: Option<u8>,
    ) -> Result<(), ErrorCode> {
        self.check(payload, requirements, UnixTimestampMillis::now())
            .map(|_| ())
    }

    #[instrument(skip_all, fields(network = %self.network()))]
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
        _token_decimals: Option<u8>,
    ) -> Result<Settlement, SettleError> {
        let checked = self
            .check(payload, requirements, UnixTimestampMillis::now())
            .map_err(SettleError::from)?;

        if let Some(settlement) = probe_existing(&self.rpc, &checked.signature).await? {
            return Ok(settlement);
        }

        let pay_to = parse_address(&requirements.pay_to).map_err(|_| ErrorCode::InvalidPayTo)?;
        let blockhash = self
            .rpc
            .latest_blockhash()
            .await
            .map_err(|e| SettleError::from(super::map_chain_error(&e)))?;

        // Rebuild the instruction sequence the client signed, from payload
        // values, with `from` as fee payer. A priority-fee transfer the
        // client may have appended is not reproduced here; the pre-signed
        // blob is authoritative when found via the idempotency probe.
        let instruction = solana_system_interface::instruction::transfer(
            &checked.from,
            &pay_to,
            checked.lamports,
        );
        let message = Message::new_with_blockhash(&[instruction], Some(&checked.from), &blockhash);
        let mut tx = Transaction::new_unsigned(message);
        if tx.signatures.is_empty() {
            tx.signatures.push(checked.signature);
        } else {
            // Submit without re-signing: the client's signature fills the
            // single required slot (`from` is the only signer and fee payer).
            tx.signatures[0] = checked.signature;
        }

        submit_and_confirm(&self.rpc, &tx, &checked.signature, confirm_timeout(requirements)).await
    }
}

/// Builds a well-formed transfer payload envelope; shared by tests.
#[cfg(test)]
pub(crate) fn transfer_payload_for_test(
    network: Network,
    amount: u64,
    timestamp: UnixTimestampMillis,
) -> PaymentPayload {
    use crate::types::{AtomicAmount, TransferPayload, X402Version};

    PaymentPayload {
        x402_version: X402Version::V1,
        scheme: Scheme::SolanaTransfer,
        network,
        payload: SchemePayload::Transfer(TransferPayload {
            from: "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T".to_string(),
            signature: solana_signature::Signature::from([42u8; 64]).to_string(),
            amount: AtomicAmount(amount),
            timestamp,
            nonce: None,
        }),
    }
}
