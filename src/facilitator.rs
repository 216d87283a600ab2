//! Core trait defining the verification and settlement interface for x402
//! facilitators.
//!
//! Implementors validate incoming payment payloads against the declared
//! requirements ([`Facilitator::verify`]) and execute on-chain settlement
//! ([`Facilitator::settle`]).

use std::fmt::{Debug, Display};
use std::sync::Arc;

use crate::types::{SettleRequest, SettleResponse, SupportedResponse, VerifyRequest, VerifyResponse};

/// Trait defining the asynchronous interface for x402 payment facilitators.
pub trait Facilitator {
    /// The error type returned by this facilitator for internal failures.
    ///
    /// Rejected payments are not errors: they surface inside
    /// [`VerifyResponse`] and [`SettleResponse`] bodies.
    type Error: Debug + Display;

    /// Verifies a proposed x402 payment payload against a [`VerifyRequest`].
    fn verify(
        &self,
        request: &VerifyRequest,
    ) -> impl Future<Output = Result<VerifyResponse, Self::Error>> + Send;

    /// Settles a payment on chain after re-verifying it.
    fn settle(
        &self,
        request: &SettleRequest,
    ) -> impl Future<Output = Result<SettleResponse, Self::Error>> + Send;

    /// Lists the (scheme, network) pairs this facilitator can process.
    fn supported(&self) -> impl Future<Output = Result<SupportedResponse, Self::Error>> + Send;
}

impl<T: Facilitator> Facilitator for Arc<T> {
    type Error = T::Error;

    fn verify(
        &self,
        request: &VerifyRequest,
    ) -> impl Future<Output = Result<VerifyResponse, Self::Error>> + Send {
        self.as_ref().verify(request)
    }

    fn settle(
        &self,
        request: &SettleRequest,
    ) -> impl Future<Output = Result<SettleResponse, Self::Error>> + Send {
        self.as_ref().settle(request)
    }

    fn supported(&self) -> impl Future<Output = Result<SupportedResponse, Self::Error>> + Send {
        self.as_ref().supported()
    }
}
