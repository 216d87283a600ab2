//! x402 Facilitator HTTP entrypoint.
//!
//! Launches an Axum-based HTTP server exposing the x402 protocol interface
//! for payment verification and settlement on Solana.
//!
//! Endpoints:
//! - `GET /health` – Health probe
//! - `GET /supported` – List supported (scheme, network) pairs
//! - `POST /verify` – Verify a payment header against requirements
//! - `POST /settle` – Settle an accepted payment on-chain
//! - `GET /transaction/{signature}` – Signature confirmation status
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `HOST`, `PORT` control the binding address
//! - `LOG_LEVEL` controls the tracing filter
//! - `SOLANA_MAINNET_RPC`, `SOLANA_DEVNET_RPC`, `SOLANA_TESTNET_RPC`
//!   override the public cluster endpoints

use axum::Router;
use axum::http::Method;
use dotenvy::dotenv;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use x402_solana::chain::SolanaRpc;
use x402_solana::config::Config;
use x402_solana::facilitator_local::FacilitatorLocal;
use x402_solana::handlers;
use x402_solana::network::Network;

#[tokio::main]
async fn main() {
    // Load .env variables
    dotenv().ok();

    init_tracing();

    let config = Config::from_env();

    let adapters: HashMap<Network, Arc<SolanaRpc>> = Network::variants()
        .iter()
        .map(|network| {
            (
                *network,
                Arc::new(SolanaRpc::new(
                    *network,
                    config.rpc_url(*network).to_string(),
                )),
            )
        })
        .collect();
    let facilitator = Arc::new(FacilitatorLocal::new(adapters));

    let app = Router::new()
        .merge(handlers::routes().with_state(facilitator))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            "status={} elapsed={}ms",
                            response.status().as_u16(),
                            latency.as_millis()
                        );
                    },
                ),
        )
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(config.host(), config.port());
    tracing::info!("Starting facilitator at http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
    }
}

/// Tracing setup: `LOG_LEVEL` seeds the filter, defaulting to `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolves on SIGINT or SIGTERM so in-flight requests drain before exit.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining in-flight requests");
}
