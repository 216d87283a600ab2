//! Per-network chain adapter over the Solana JSON-RPC.
//!
//! [`SolanaRpc`] is the only place the facilitator talks to a cluster. It
//! exposes exactly the capabilities the scheme engines need: blockhash fetch,
//! signature lookups, raw submission, confirmation, mint inspection, and
//! account existence probes. Transport faults collapse into [`ChainError`];
//! "transaction not found" is `Ok(None)`, never an error, so the idempotency
//! probe can distinguish a missing payment from a broken RPC.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcTransactionConfig};
use solana_commitment_config::CommitmentConfig;
use solana_hash::Hash;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::Transaction;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, TransactionStatus, UiTransactionEncoding,
};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::network::Network;

/// A Solana public key address.
///
/// Wrapper around [`Pubkey`] that serializes as a base58 string, suitable
/// for use in x402 protocol messages.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct Address(Pubkey);

impl Address {
    pub const fn new(pubkey: Pubkey) -> Self {
        Self(pubkey)
    }

    pub fn pubkey(&self) -> &Pubkey {
        &self.0
    }
}

impl From<Pubkey> for Address {
    fn from(pubkey: Pubkey) -> Self {
        Self(pubkey)
    }
}

impl From<Address> for Pubkey {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let pubkey = Pubkey::from_str(&s)
            .map_err(|_| serde::de::Error::custom("Failed to decode Solana address"))?;
        Ok(Self(pubkey))
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pubkey =
            Pubkey::from_str(s).map_err(|_| format!("Failed to decode Solana address: {s}"))?;
        Ok(Self(pubkey))
    }
}

/// Errors that can occur when interacting with a Solana cluster.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// RPC transport error.
    #[error(transparent)]
    Transport(Box<ClientErrorKind>),
    /// The account exists but does not hold SPL mint data.
    #[error("account {0} is not a token mint")]
    NotAMint(Pubkey),
    /// The account does not exist on chain.
    #[error("account {0} not found")]
    AccountNotFound(Pubkey),
    /// The transaction landed on chain but executed with an error.
    #[error("transaction {0} failed on chain: {1}")]
    TransactionFailed(Signature, String),
    /// The inner deadline elapsed before the signature reached confirmed
    /// commitment. The submission is not retracted.
    #[error("timed out waiting for confirmation of {0}")]
    ConfirmationTimeout(Signature),
}

impl From<ClientError> for ChainError {
    fn from(value: ClientError) -> Self {
        ChainError::Transport(Box::new(value.kind))
    }
}

/// Decimals and supply of an SPL mint, as read from its account data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintInfo {
    pub decimals: u8,
    pub supply: u64,
}

/// How often the confirmation loop polls signature status.
const CONFIRM_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Chain adapter for one Solana network.
///
/// The adapter is shared between both scheme engines of its network and is
/// safe to use from concurrent requests; the underlying [`RpcClient`]
/// multiplexes over its own connection pool.
pub struct SolanaRpc {
    network: Network,
    rpc_client: Arc<RpcClient>,
}

impl Debug for SolanaRpc {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaRpc")
            .field("network", &self.network)
            .field("rpc_url", &self.rpc_client.url())
            .finish()
    }
}

impl SolanaRpc {
    pub fn new(network: Network, rpc_url: String) -> Self {
        tracing::info!(network = %network, rpc = %rpc_url, "Using Solana RPC endpoint");
        Self {
            network,
            rpc_client: Arc::new(RpcClient::new(rpc_url)),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Returns a recent blockhash for transaction construction.
    pub async fn latest_blockhash(&self) -> Result<Hash, ChainError> {
        let blockhash = self.rpc_client.get_latest_blockhash().await?;
        Ok(blockhash)
    }

    /// Submits a signed transaction without waiting for confirmation.
    ///
    /// Preflight simulation is skipped: the transaction was verified against
    /// the requirement already, and preflight would reject during blockhash
    /// races that the confirmation loop handles anyway.
    pub async fn send_transaction(&self, tx: &Transaction) -> Result<Signature, ChainError> {
        let signature = self
            .rpc_client
            .send_transaction_with_config(
                tx,
                RpcSendTransactionConfig {
                    skip_preflight: true,
                    ..RpcSendTransactionConfig::default()
                },
            )
            .await?;
        Ok(signature)
    }

    /// Returns the status of a signature, searching the full transaction
    /// history, or `None` when the cluster has never seen it.
    pub async fn get_signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<TransactionStatus>, ChainError> {
        let response = self
            .rpc_client
            .get_signature_statuses_with_history(&[*signature])
            .await?;
        Ok(response.value.into_iter().next().flatten())
    }

    /// Returns the confirmed transaction record for a signature, or `None`
    /// when the signature is unknown to the cluster.
    pub async fn get_transaction(
        &self,
        signature: &Signature,
    ) -> Result<Option<EncodedConfirmedTransactionWithStatusMeta>, ChainError> {
        if self.get_signature_status(signature).await?.is_none() {
            return Ok(None);
        }
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        let record = self
            .rpc_client
            .get_transaction_with_config(signature, config)
            .await?;
        Ok(Some(record))
    }

    /// Blocks until `signature` reaches confirmed commitment or `timeout`
    /// elapses. Returns the confirmation count reported by the cluster.
    ///
    /// On timeout the submission is NOT retracted; a later settle attempt
    /// observes the landed transaction through the idempotency probe.
    pub async fn confirm_transaction(
        &self,
        signature: &Signature,
        timeout: Duration,
    ) -> Result<Option<u64>, ChainError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.get_signature_status(signature).await? {
                if let Some(err) = status.err.as_ref() {
                    return Err(ChainError::TransactionFailed(*signature, err.to_string()));
                }
                if status.satisfies_commitment(CommitmentConfig::confirmed()) {
                    return Ok(status.confirmations.map(|c| c as u64));
                }
            }
            if Instant::now() >= deadline {
                return Err(ChainError::ConfirmationTimeout(*signature));
            }
            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }

    /// Reads `{decimals, supply}` from a mint account.
    ///
    /// Fails with [`ChainError::NotAMint`] when the account exists but is
    /// not owned by the token program or does not unpack as mint state.
    pub async fn get_mint_info(&self, mint: &Pubkey) -> Result<MintInfo, ChainError> {
        use spl_token::solana_program::program_pack::Pack;

        let response = self
            .rpc_client
            .get_account_with_commitment(mint, CommitmentConfig::confirmed())
            .await?;
        let account = response.value.ok_or(ChainError::AccountNotFound(*mint))?;
        if account.owner != spl_token::ID {
            return Err(ChainError::NotAMint(*mint));
        }
        let state = spl_token::state::Mint::unpack(&account.data)
            .map_err(|_| ChainError::NotAMint(*mint))?;
        Ok(MintInfo {
            decimals: state.decimals,
            supply: state.supply,
        })
    }

    /// Returns whether an account exists on chain, used for the recipient
    /// ATA probe before settlement.
    pub async fn account_exists(&self, pubkey: &Pubkey) -> Result<bool, ChainError> {
        let response = self
            .rpc_client
            .get_account_with_commitment(pubkey, CommitmentConfig::confirmed())
            .await?;
        Ok(response.value.is_some())
    }
}
