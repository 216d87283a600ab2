//! The `solana-spl` engine: SPL token payments between associated token
//! accounts, with on-demand recipient ATA creation at settlement.

use async_trait::async_trait;
use solana_message::Message;
use solana_pubkey::Pubkey;
use solana_transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account;
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

use crate::chain::SolanaRpc;
use crate::network::Network;
use crate::scheme::{
    SchemeEngine, SettleError, Settlement, check_envelope, check_freshness,
    check_signature_format, confirm_timeout, map_chain_error, parse_address, probe_existing,
    required_atomic, submit_and_confirm,
};
use crate::timestamp::UnixTimestampMillis;
use crate::types::{Asset, ErrorCode, PaymentPayload, PaymentRequirements, Scheme, SchemePayload};

/// Fallback decimals when the facilitator could not resolve the mint.
const FALLBACK_DECIMALS: u8 = 9;

/// Verifies and settles SPL token transfers for one network.
pub struct SplEngine {
    rpc: Arc<SolanaRpc>,
}

impl SplEngine {
    pub fn new(rpc: Arc<SolanaRpc>) -> Self {
        Self { rpc }
    }

    /// The verification sequence: the native-transfer checks extended with
    /// mint and token-account derivation. ATA addresses are program-derived
    /// from `(owner, mint)`, so no RPC is needed here.
    fn check(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
        decimals: u8,
        now: UnixTimestampMillis,
    ) -> Result<SplChecked, ErrorCode> {
        check_envelope(payload, Scheme::SolanaSpl, self.network())?;
        let spl = match &payload.payload {
            SchemePayload::Spl(spl) => spl,
            SchemePayload::Transfer(_) => return Err(ErrorCode::SchemeMismatch),
        };
        let signature = check_signature_format(&spl.signature)?;
        let from = parse_address(&spl.from)?;

        let required_mint = match &requirements.asset {
            Asset::Mint(mint) => parse_address(mint)?,
            Asset::Sol => return Err(ErrorCode::InvalidAssetScheme),
        };
        let mint = Pubkey::from_str(&spl.mint).map_err(|_| ErrorCode::MintMismatch)?;
        if mint != required_mint {
            return Err(ErrorCode::MintMismatch);
        }

        let pay_to = parse_address(&requirements.pay_to).map_err(|_| ErrorCode::InvalidPayTo)?;
        let expected_from_ata = get_associated_token_address(&from, &mint);
        match Pubkey::from_str(&spl.from_token_account) {
            Ok(ata) if ata == expected_from_ata => {}
            _ => return Err(ErrorCode::InvalidFromTokenAccount),
        }
        let expected_to_ata = get_associated_token_address(&pay_to, &mint);
        match Pubkey::from_str(&spl.to_token_account) {
            Ok(ata) if ata == expected_to_ata => {}
            _ => return Err(ErrorCode::InvalidToTokenAccount),
        }

        let required = required_atomic(requirements, decimals)?;
        if spl.amount.value() < required {
            return Err(ErrorCode::InsufficientAmount);
        }
        check_freshness(spl.timestamp, now)?;
        Ok(SplChecked {
            from,
            signature,
            mint,
            pay_to,
            from_token_account: expected_from_ata,
            to_token_account: expected_to_ata,
            amount: spl.amount.value(),
        })
    }
}

struct SplChecked {
    from: Pubkey,
    signature: solana_signature::Signature,
    mint: Pubkey,
    pay_to: Pubkey,
    from_token_account: Pubkey,
    to_token_account: Pubkey,
    amount: u64,
}

#[async_trait]
impl SchemeEngine for SplEngine {
    fn scheme(&self) -> Scheme {
        Scheme::SolanaSpl
    }

    fn network(&self) -> Network {
        self.rpc.network()
    }

    async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
        token_decimals: Option<u8>,
    ) -> Result<(), ErrorCode> {
        let decimals = token_decimals.unwrap_or(FALLBACK_DECIMALS);
        self.check(payload, requirements, decimals, UnixTimestampMillis::now())
            .map(|_| ())
    }

    #[instrument(skip_all, fields(network = %self.network()))]
    async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
        token_decimals: Option<u8>,
    ) -> Result<Settlement, SettleError> {
        let decimals = token_decimals.unwrap_or(FALLBACK_DECIMALS);
        let checked = self
            .check(payload, requirements, decimals, UnixTimestampMillis::now())
            .map_err(SettleError::from)?;

        if let Some(settlement) = probe_existing(&self.rpc, &checked.signature).await? {
            return Ok(settlement);
        }

        // The recipient may not hold this token yet. Probe the ATA and
        // prepend its creation, funded by the payer, when absent.
        let recipient_ata_exists = self
            .rpc
            .account_exists(&checked.to_token_account)
            .await
            .map_err(|e| SettleError::from(map_chain_error(&e)))?;

        let mut instructions = Vec::with_capacity(2);
        if !recipient_ata_exists {
            tracing::info!(
                ata = %checked.to_token_account,
                owner = %checked.pay_to,
                "Recipient token account missing, creating on demand"
            );
            instructions.push(create_associated_token_account(
                &checked.from,
                &checked.pay_to,
                &checked.mint,
                &spl_token::ID,
            ));
        }
        instructions.push(
            spl_token::instruction::transfer_checked(
                &spl_token::ID,
                &checked.from_token_account,
                &checked.mint,
                &checked.to_token_account,
                &checked.from,
                &[],
                checked.amount,
                decimals,
            )
            .map_err(|_| SettleError::from(ErrorCode::ChainRpcError))?,
        );

        let blockhash = self
            .rpc
            .latest_blockhash()
            .await
            .map_err(|e| SettleError::from(map_chain_error(&e)))?;
        let message = Message::new_with_blockhash(&instructions, Some(&checked.from), &blockhash);
        let mut tx = Transaction::new_unsigned(message);
        if tx.signatures.is_empty() {
            tx.signatures.push(checked.signature);
        } else {
            tx.signatures[0] = checked.signature;
        }

        submit_and_confirm(&self.rpc, &tx, &checked.signature, confirm_timeout(requirements)).await
    }
}
