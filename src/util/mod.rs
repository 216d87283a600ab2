//! Utility types shared across the crate.
//!
//! - [`b64`] - Base64 encoding/decoding for the `X-Payment` header
//! - [`money`] - Human-readable decimal amount parsing

pub mod b64;
pub mod money;

pub use b64::Base64Bytes;
pub use money::{MoneyAmount, MoneyAmountError};
