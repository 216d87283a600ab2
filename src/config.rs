//! Configuration for the facilitator server.
//!
//! Everything is resolved from environment variables with documented
//! defaults; `.env` files are loaded by the entrypoint before this runs.
//!
//! | Variable | Default |
//! |---|---|
//! | `PORT` | `3000` |
//! | `HOST` | `0.0.0.0` |
//! | `LOG_LEVEL` | `info` (read by the tracing setup, not here) |
//! | `SOLANA_MAINNET_RPC` | `https://api.mainnet-beta.solana.com` |
//! | `SOLANA_DEVNET_RPC` | `https://api.devnet.solana.com` |
//! | `SOLANA_TESTNET_RPC` | `https://api.testnet.solana.com` |

use std::collections::HashMap;
use std::env;
use std::net::IpAddr;

use crate::network::Network;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HOST: &str = "0.0.0.0";

/// Server configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    port: u16,
    host: IpAddr,
    rpc_urls: HashMap<Network, String>,
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// documented defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let host = env::var("HOST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| DEFAULT_HOST.parse().expect("valid default host"));
        let rpc_urls = Network::variants()
            .iter()
            .map(|network| {
                let url = env::var(network.rpc_env_var())
                    .unwrap_or_else(|_| network.default_rpc_url().to_string());
                (*network, url)
            })
            .collect();
        Config {
            port,
            host,
            rpc_urls,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    /// The JSON-RPC endpoint configured for a network.
    pub fn rpc_url(&self, network: Network) -> &str {
        self.rpc_urls
            .get(&network)
            .map(String::as_str)
            .unwrap_or_else(|| network.default_rpc_url())
    }
}
