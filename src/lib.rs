//! Solana implementation of the [x402 protocol](https://www.x402.org).
//!
//! This crate provides the protocol types and a facilitator implementation
//! for HTTP-native micropayments on Solana. A resource server charges for
//! access by answering `402 Payment Required` with acceptable
//! [`PaymentRequirements`](types::PaymentRequirements); the client retries
//! with an `X-Payment` header carrying a signed transaction; the facilitator
//! verifies the header against the requirements and settles it on chain.
//!
//! # Roles
//!
//! - **Facilitator**: the neutral verifier/submitter this crate implements.
//!   See [`facilitator`] for the trait and [`facilitator_local`] for the
//!   implementation; it never custodies funds and holds no per-payment state.
//! - **Seller**: a payment-gated service. It consumes the [`types`] module's
//!   wire structures and calls the facilitator's `/verify` and `/settle`.
//! - **Buyer/Client**: builds and signs payments; out of scope here beyond
//!   the shared wire format.
//!
//! # Payment schemes
//!
//! - `solana-transfer` — native SOL via the system program
//! - `solana-spl` — SPL tokens between associated token accounts
//!
//! # Modules
//!
//! - [`chain`] — per-network JSON-RPC adapter
//! - [`config`] — environment-backed server configuration
//! - [`facilitator`] — the [`Facilitator`](facilitator::Facilitator) trait
//! - [`facilitator_local`] — engine registry, routing, decimals cache
//! - [`handlers`] — HTTP endpoints (verify, settle, supported, transaction)
//! - [`network`] — supported clusters and known USDC deployments
//! - [`scheme`] — the two payment scheme engines
//! - [`timestamp`] — millisecond timestamps and the freshness window
//! - [`types`] — wire types and the error taxonomy
//! - [`util`] — base64 and decimal-amount helpers
//! - [`validator`] — payment requirement invariants

pub mod chain;
pub mod config;
pub mod facilitator;
pub mod facilitator_local;
pub mod handlers;
pub mod network;
pub mod scheme;
pub mod timestamp;
pub mod types;
pub mod util;
pub mod validator;
