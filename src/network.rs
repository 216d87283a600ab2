//! Network definitions and known token deployments.
//!
//! This module defines the supported Solana clusters and provides statically
//! known USDC deployments per network, which pre-seed the decimals cache.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::chain::Address;

/// Supported Solana clusters.
///
/// Used to differentiate between mainnet and test environments for the x402 protocol.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    /// Solana mainnet-beta.
    #[serde(rename = "solana-mainnet")]
    SolanaMainnet,
    /// Solana devnet.
    #[serde(rename = "solana-devnet")]
    SolanaDevnet,
    /// Solana testnet.
    #[serde(rename = "solana-testnet")]
    SolanaTestnet,
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::SolanaMainnet => write!(f, "solana-mainnet"),
            Network::SolanaDevnet => write!(f, "solana-devnet"),
            Network::SolanaTestnet => write!(f, "solana-testnet"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown network: {0}")]
pub struct NetworkParseError(String);

impl FromStr for Network {
    type Err = NetworkParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solana-mainnet" => Ok(Network::SolanaMainnet),
            "solana-devnet" => Ok(Network::SolanaDevnet),
            "solana-testnet" => Ok(Network::SolanaTestnet),
            other => Err(NetworkParseError(other.to_string())),
        }
    }
}

impl Network {
    /// Return all known [`Network`] variants.
    pub fn variants() -> &'static [Network] {
        &[
            Network::SolanaMainnet,
            Network::SolanaDevnet,
            Network::SolanaTestnet,
        ]
    }

    /// Environment variable holding the JSON-RPC endpoint for this network.
    pub fn rpc_env_var(&self) -> &'static str {
        match self {
            Network::SolanaMainnet => "SOLANA_MAINNET_RPC",
            Network::SolanaDevnet => "SOLANA_DEVNET_RPC",
            Network::SolanaTestnet => "SOLANA_TESTNET_RPC",
        }
    }

    /// Public cluster endpoint used when no RPC URL is configured.
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::SolanaMainnet => "https://api.mainnet-beta.solana.com",
            Network::SolanaDevnet => "https://api.devnet.solana.com",
            Network::SolanaTestnet => "https://api.testnet.solana.com",
        }
    }
}

/// Lazily initialized known USDC deployment on Solana mainnet.
static USDC_SOLANA_MAINNET: Lazy<UsdcDeployment> = Lazy::new(|| UsdcDeployment {
    mint: Address::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").expect("valid mint"),
    network: Network::SolanaMainnet,
    decimals: 6,
});

/// Lazily initialized known USDC deployment on Solana devnet.
static USDC_SOLANA_DEVNET: Lazy<UsdcDeployment> = Lazy::new(|| UsdcDeployment {
    mint: Address::from_str("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU").expect("valid mint"),
    network: Network::SolanaDevnet,
    decimals: 6,
});

/// A known USDC deployment on one network.
///
/// These are the stablecoins the facilitator can resolve decimals for
/// without touching the chain.
#[derive(Clone, Debug)]
pub struct UsdcDeployment {
    pub mint: Address,
    pub network: Network,
    pub decimals: u8,
}

impl UsdcDeployment {
    /// Return the known USDC deployment for the given network, if any.
    ///
    /// Testnet has no canonical USDC mint.
    pub fn by_network<N: Borrow<Network>>(network: N) -> Option<&'static UsdcDeployment> {
        match network.borrow() {
            Network::SolanaMainnet => Some(&USDC_SOLANA_MAINNET),
            Network::SolanaDevnet => Some(&USDC_SOLANA_DEVNET),
            Network::SolanaTestnet => None,
        }
    }
}
