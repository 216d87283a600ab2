//! Facilitator implementation backed by per-network chain adapters.
//!
//! [`FacilitatorLocal`] owns the fixed two-level mapping
//! `scheme → network → engine`, populated once at startup with one engine per
//! (scheme, network) pair and one [`SolanaRpc`] per network shared by both of
//! that network's engines. Requests are routed after the version gate, header
//! decode, requirement validation, and scheme/network consistency checks; SPL
//! payments additionally get their token decimals resolved here.
//!
//! The only mutable state is the decimals cache: a write-rarely, read-often
//! map pre-seeded with the known USDC deployments, populated on miss, never
//! invalidated.

use solana_pubkey::Pubkey;
use solana_signature::Signature;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use tracing::instrument;

use crate::chain::{ChainError, SolanaRpc};
use crate::facilitator::Facilitator;
use crate::network::{Network, UsdcDeployment};
use crate::scheme::{SchemeEngine, SplEngine, TransferEngine};
use crate::types::{
    Asset, ErrorCode, PaymentPayload, Scheme, SettleRequest, SettleResponse, SupportedPaymentKind,
    SupportedResponse, TransactionStatusResponse, VerifyRequest, VerifyResponse, X402Version,
};
use crate::validator;

/// Internal facilitator failures. Rejected payments never surface here; they
/// are reported inside response bodies.
#[derive(Debug, thiserror::Error)]
pub enum FacilitatorLocalError {
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors of the `/transaction/:signature` status query.
#[derive(Debug, thiserror::Error)]
pub enum TransactionStatusError {
    #[error("Unsupported network")]
    UnsupportedNetwork,
    #[error("Invalid transaction signature")]
    InvalidSignature,
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// A concrete [`Facilitator`] that verifies and settles x402 payments using
/// per-network scheme engines.
pub struct FacilitatorLocal {
    adapters: HashMap<Network, Arc<SolanaRpc>>,
    engines: HashMap<(Scheme, Network), Arc<dyn SchemeEngine>>,
    decimals_cache: RwLock<HashMap<(Pubkey, Network), u8>>,
}

impl FacilitatorLocal {
    /// Builds the engine registry from one chain adapter per network.
    ///
    /// The set of engines is fixed for the lifetime of the process.
    pub fn new(adapters: HashMap<Network, Arc<SolanaRpc>>) -> Self {
        let mut engines: HashMap<(Scheme, Network), Arc<dyn SchemeEngine>> =
            HashMap::with_capacity(adapters.len() * 2);
        let mut decimals = HashMap::new();
        for (network, rpc) in &adapters {
            engines.insert(
                (Scheme::SolanaTransfer, *network),
                Arc::new(TransferEngine::new(Arc::clone(rpc))),
            );
            engines.insert(
                (Scheme::SolanaSpl, *network),
                Arc::new(SplEngine::new(Arc::clone(rpc))),
            );
            if let Some(usdc) = UsdcDeployment::by_network(network) {
                decimals.insert((*usdc.mint.pubkey(), *network), usdc.decimals);
            }
        }
        FacilitatorLocal {
            adapters,
            engines,
            decimals_cache: RwLock::new(decimals),
        }
    }

    fn engine(
        &self,
        scheme: Scheme,
        network: Network,
    ) -> Result<Arc<dyn SchemeEngine>, ErrorCode> {
        if !self.adapters.contains_key(&network) {
            return Err(ErrorCode::UnsupportedNetwork);
        }
        self.engines
            .get(&(scheme, network))
            .cloned()
            .ok_or(ErrorCode::UnsupportedScheme)
    }

    /// Resolves the decimals of a mint: known-stablecoin table first, then
    /// the in-process cache, then the chain, then a fallback of 9 with a
    /// warning. Cache entries are advisory and never evicted.
    pub(crate) async fn resolve_decimals(&self, mint: &Pubkey, network: Network) -> u8 {
        if let Some(usdc) = UsdcDeployment::by_network(network) {
            if usdc.mint.pubkey() == mint {
                return usdc.decimals;
            }
        }
        {
            let cache = self
                .decimals_cache
                .read()
                .unwrap_or_else(|e| e.into_inner());
            if let Some(decimals) = cache.get(&(*mint, network)) {
                return *decimals;
            }
        }
        match self.adapters.get(&network) {
            Some(rpc) => match rpc.get_mint_info(mint).await {
                Ok(info) => {
                    let mut cache = self
                        .decimals_cache
                        .write()
                        .unwrap_or_else(|e| e.into_inner());
                    cache.insert((*mint, network), info.decimals);
                    info.decimals
                }
                Err(e) => {
                    tracing::warn!(
                        mint = %mint,
                        network = %network,
                        error = %e,
                        "Failed to resolve mint decimals, assuming 9"
                    );
                    9
                }
            },
            None => 9,
        }
    }

    /// The shared routing prologue of `/verify` and `/settle`.
    async fn preflight(
        &self,
        request: &VerifyRequest,
    ) -> Result<(Arc<dyn SchemeEngine>, PaymentPayload, Option<u8>), ErrorCode> {
        X402Version::try_from(request.x402_version)
            .map_err(|_| ErrorCode::UnsupportedX402Version)?;
        let requirements = &request.payment_requirements;
        validator::validate(requirements)?;
        let payload = PaymentPayload::from_base64(&request.payment_header)
            .map_err(|e| e.error_code())?;
        if payload.scheme != requirements.scheme {
            return Err(ErrorCode::SchemeMismatch);
        }
        if payload.network != requirements.network {
            return Err(ErrorCode::NetworkMismatch);
        }
        let engine = self.engine(payload.scheme, payload.network)?;
        let decimals = match (&requirements.scheme, &requirements.asset) {
            (Scheme::SolanaSpl, Asset::Mint(mint)) => {
                // The validator guaranteed the mint parses.
                let mint = Pubkey::from_str(mint).map_err(|_| ErrorCode::InvalidAssetScheme)?;
                Some(self.resolve_decimals(&mint, payload.network).await)
            }
            _ => None,
        };
        Ok((engine, payload, decimals))
    }

    /// Signature-status query backing `GET /transaction/:signature`.
    pub async fn transaction_status(
        &self,
        signature: &str,
        network: Network,
    ) -> Result<TransactionStatusResponse, TransactionStatusError> {
        let adapter = self
            .adapters
            .get(&network)
            .ok_or(TransactionStatusError::UnsupportedNetwork)?;
        let signature = Signature::from_str(signature)
            .map_err(|_| TransactionStatusError::InvalidSignature)?;
        let status = adapter.get_signature_status(&signature).await?;
        Ok(match status {
            None => TransactionStatusResponse {
                confirmed: false,
                confirmations: None,
                error: None,
            },
            Some(status) => TransactionStatusResponse {
                confirmed: status.satisfies_commitment(
                    solana_commitment_config::CommitmentConfig::confirmed(),
                ),
                confirmations: status.confirmations.map(|c| c as u64),
                error: status.err.as_ref().map(|e| e.to_string()),
            },
        })
    }
}

impl Facilitator for FacilitatorLocal {
    type Error = FacilitatorLocalError;

    /// Called from `POST /verify`. Rejections are folded into the response
    /// body; the HTTP status stays 200.
    #[instrument(skip_all, fields(network = %request.payment_requirements.network))]
    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse, Self::Error> {
        match self.preflight(request).await {
            Err(reason) => {
                tracing::debug!(code = reason.code(), "Payment rejected before engine dispatch");
                Ok(VerifyResponse::invalid(reason))
            }
            Ok((engine, payload, decimals)) => {
                match engine
                    .verify(&payload, &request.payment_requirements, decimals)
                    .await
                {
                    Ok(()) => Ok(VerifyResponse::valid()),
                    Err(reason) => {
                        tracing::debug!(code = reason.code(), "Payment rejected");
                        Ok(VerifyResponse::invalid(reason))
                    }
                }
            }
        }
    }

    /// Called from `POST /settle`. Re-verifies, then submits and confirms;
    /// an already-landed signature settles idempotently.
    #[instrument(skip_all, fields(network = %request.payment_requirements.network))]
    async fn settle(&self, request: &SettleRequest) -> Result<SettleResponse, Self::Error> {
        let network = request.payment_requirements.network;
        match self.preflight(request).await {
            Err(reason) => {
                tracing::debug!(code = reason.code(), "Settlement rejected before engine dispatch");
                Ok(SettleResponse::failed(reason, None))
            }
            Ok((engine, payload, decimals)) => {
                match engine
                    .settle(&payload, &request.payment_requirements, decimals)
                    .await
                {
                    Ok(settlement) => {
                        tracing::info!(tx_hash = %settlement.tx_hash, "Payment settled");
                        Ok(SettleResponse::settled(
                            settlement.tx_hash,
                            network,
                            settlement.confirmations,
                        ))
                    }
                    Err(failure) => {
                        tracing::warn!(
                            code = failure.reason.code(),
                            tx_hash = ?failure.tx_hash,
                            "Settlement failed"
                        );
                        Ok(SettleResponse::failed(failure.reason, failure.tx_hash))
                    }
                }
            }
        }
    }

    async fn supported(&self) -> Result<SupportedResponse, Self::Error> {
        let mut kinds: Vec<SupportedPaymentKind> = self
            .engines
            .keys()
            .map(|(scheme, network)| SupportedPaymentKind {
                scheme: *scheme,
                network: *network,
            })
            .collect();
        kinds.sort_by_key(|kind| (kind.scheme.to_string(), kind.network.to_string()));
        Ok(SupportedResponse { kinds })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentRequirements, RequirementExtra};
    use crate::util::Base64Bytes;

    const PAY_TO: &str = "8kJzDCrmymWYLeVMdPS6osnbeHpTE6c8V5GBcGLXWQYX";
    const USDC_DEVNET: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

    pub(crate) fn facilitator() -> FacilitatorLocal {
        let adapters = Network::variants()
            .iter()
            .map(|network| {
                (
                    *network,
                    Arc::new(SolanaRpc::new(
                        *network,
                        network.default_rpc_url().to_string(),
                    )),
                )
            })
            .collect();
        FacilitatorLocal::new(adapters)
    }

    fn sol_requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: Scheme::SolanaTransfer,
            network: Network::SolanaDevnet,
            max_amount_required: "0.01".to_string(),
            resource: "/premium".to_string(),
            description: "Premium content".to_string(),
            mime_type: "application/json".to_string(),
            output_schema: None,
            pay_to: PAY_TO.to_string(),
            max_timeout_seconds: 60,
            asset: Asset::Sol,
            extra: None,
        }
    }

    fn sol_header(amount: u64) -> String {
        crate::scheme::transfer::transfer_payload_for_test(
            Network::SolanaDevnet,
            amount,
            crate::timestamp::UnixTimestampMillis::now(),
        )
        .to_base64()
        .unwrap()
    }

    #[tokio::test]
    async fn supported_is_the_cartesian_product() {
        let facilitator = facilitator();
        let supported = facilitator.supported().await.unwrap();
        assert_eq!(
            supported.kinds.len(),
            Scheme::variants().len() * Network::variants().len()
        );
        for scheme in Scheme::variants() {
            for network in Network::variants() {
                assert!(supported.kinds.contains(&SupportedPaymentKind {
                    scheme: *scheme,
                    network: *network,
                }));
            }
        }
    }

    #[tokio::test]
    async fn verify_happy_sol_path() {
        let facilitator = facilitator();
        let request = VerifyRequest {
            x402_version: 1,
            payment_header: sol_header(10_000_000),
            payment_requirements: sol_requirements(),
        };
        let response = facilitator.verify(&request).await.unwrap();
        assert_eq!(response, VerifyResponse::valid());
    }

    #[tokio::test]
    async fn verify_underpayment_reports_reason() {
        let facilitator = facilitator();
        let request = VerifyRequest {
            x402_version: 1,
            payment_header: sol_header(9_999_999),
            payment_requirements: sol_requirements(),
        };
        let response = facilitator.verify(&request).await.unwrap();
        assert_eq!(
            response,
            VerifyResponse::invalid(ErrorCode::InsufficientAmount)
        );
    }

    #[tokio::test]
    async fn verify_rejects_wrong_version() {
        let facilitator = facilitator();
        let request = VerifyRequest {
            x402_version: 2,
            payment_header: sol_header(10_000_000),
            payment_requirements: sol_requirements(),
        };
        let response = facilitator.verify(&request).await.unwrap();
        assert_eq!(
            response,
            VerifyResponse::invalid(ErrorCode::UnsupportedX402Version)
        );
    }

    #[tokio::test]
    async fn verify_rejects_undecodable_header() {
        let facilitator = facilitator();
        let request = VerifyRequest {
            x402_version: 1,
            payment_header: "!!!".to_string(),
            payment_requirements: sol_requirements(),
        };
        let response = facilitator.verify(&request).await.unwrap();
        assert_eq!(response, VerifyResponse::invalid(ErrorCode::InvalidPayload));
    }

    #[tokio::test]
    async fn verify_rejects_spl_scheme_with_sol_asset_before_payload() {
        // The requirement itself is inconsistent; the header never matters.
        let facilitator = facilitator();
        let request = VerifyRequest {
            x402_version: 1,
            payment_header: Base64Bytes::encode("junk").into_string().unwrap(),
            payment_requirements: PaymentRequirements {
                scheme: Scheme::SolanaSpl,
                asset: Asset::Sol,
                ..sol_requirements()
            },
        };
        let response = facilitator.verify(&request).await.unwrap();
        assert_eq!(
            response,
            VerifyResponse::invalid(ErrorCode::InvalidAssetScheme)
        );
    }

    #[tokio::test]
    async fn verify_rejects_scheme_mismatch_between_payload_and_requirements() {
        let facilitator = facilitator();
        let request = VerifyRequest {
            x402_version: 1,
            payment_header: sol_header(10_000_000),
            payment_requirements: PaymentRequirements {
                scheme: Scheme::SolanaSpl,
                asset: Asset::Mint(USDC_DEVNET.to_string()),
                ..sol_requirements()
            },
        };
        let response = facilitator.verify(&request).await.unwrap();
        assert_eq!(response, VerifyResponse::invalid(ErrorCode::SchemeMismatch));
    }

    #[tokio::test]
    async fn decimals_come_from_the_stablecoin_table_without_rpc() {
        let facilitator = facilitator();
        let mint = Pubkey::from_str(USDC_DEVNET).unwrap();
        // The default devnet RPC is never contacted: the table answers first.
        let decimals = facilitator
            .resolve_decimals(&mint, Network::SolanaDevnet)
            .await;
        assert_eq!(decimals, 6);
    }

    #[tokio::test]
    async fn verify_happy_usdc_path_uses_cached_decimals() {
        use spl_associated_token_account::get_associated_token_address;
        let facilitator = facilitator();
        let from = Pubkey::from_str("4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T").unwrap();
        let pay_to = Pubkey::from_str(PAY_TO).unwrap();
        let mint = Pubkey::from_str(USDC_DEVNET).unwrap();
        let payload = crate::types::PaymentPayload {
            x402_version: X402Version::V1,
            scheme: Scheme::SolanaSpl,
            network: Network::SolanaDevnet,
            payload: crate::types::SchemePayload::Spl(crate::types::SplPayload {
                from: from.to_string(),
                signature: Signature::from([42u8; 64]).to_string(),
                amount: crate::types::AtomicAmount(1_000_000),
                timestamp: crate::timestamp::UnixTimestampMillis::now(),
                nonce: None,
                mint: USDC_DEVNET.to_string(),
                from_token_account: get_associated_token_address(&from, &mint).to_string(),
                to_token_account: get_associated_token_address(&pay_to, &mint).to_string(),
            }),
        };
        let request = VerifyRequest {
            x402_version: 1,
            payment_header: payload.to_base64().unwrap(),
            payment_requirements: PaymentRequirements {
                scheme: Scheme::SolanaSpl,
                asset: Asset::Mint(USDC_DEVNET.to_string()),
                max_amount_required: "1.00".to_string(),
                extra: Some(RequirementExtra::default()),
                ..sol_requirements()
            },
        };
        let response = facilitator.verify(&request).await.unwrap();
        assert_eq!(response, VerifyResponse::valid());
    }
}
