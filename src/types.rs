//! Type definitions for the x402 protocol on Solana.
//!
//! The key objects are [`PaymentPayload`], [`PaymentRequirements`],
//! [`VerifyResponse`], and [`SettleResponse`], which encode payment intent,
//! published terms, and the result of verification/settlement. The wire
//! format is compatible with the TypeScript client SDK: the `X-Payment`
//! header carries `base64(JSON(PaymentPayload))`, amounts travel as decimal
//! strings, and timestamps as integer milliseconds.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use crate::network::Network;
use crate::timestamp::UnixTimestampMillis;
use crate::util::Base64Bytes;

/// Represents the protocol version. Currently only version 1 is supported.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum X402Version {
    /// Version `1`.
    V1,
}

impl Serialize for X402Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            X402Version::V1 => serializer.serialize_u8(1),
        }
    }
}

impl Display for X402Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            X402Version::V1 => write!(f, "1"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unsupported x402Version: {0}")]
pub struct X402VersionError(pub u64);

impl TryFrom<u64> for X402Version {
    type Error = X402VersionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(X402Version::V1),
            _ => Err(X402VersionError(value)),
        }
    }
}

impl<'de> Deserialize<'de> for X402Version {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let num = u64::deserialize(deserializer)?;
        X402Version::try_from(num).map_err(serde::de::Error::custom)
    }
}

/// Enumerates payment schemes: native SOL transfer or SPL token transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    /// Native SOL transfer via the system program.
    #[serde(rename = "solana-transfer")]
    SolanaTransfer,
    /// SPL token transfer between associated token accounts.
    #[serde(rename = "solana-spl")]
    SolanaSpl,
}

impl Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scheme::SolanaTransfer => "solana-transfer",
            Scheme::SolanaSpl => "solana-spl",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown scheme: {0}")]
pub struct SchemeParseError(String);

impl FromStr for Scheme {
    type Err = SchemeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solana-transfer" => Ok(Scheme::SolanaTransfer),
            "solana-spl" => Ok(Scheme::SolanaSpl),
            other => Err(SchemeParseError(other.to_string())),
        }
    }
}

impl Scheme {
    /// Return all known [`Scheme`] variants.
    pub fn variants() -> &'static [Scheme] {
        &[Scheme::SolanaTransfer, Scheme::SolanaSpl]
    }
}

/// An amount in atomic units (lamports for SOL, base units for SPL tokens).
///
/// Serialized as a stringified integer to prevent precision loss in JSON
/// consumers that parse numbers as floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AtomicAmount(pub u64);

impl AtomicAmount {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Serialize for AtomicAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for AtomicAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let amount = s
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom("amount must be a stringified integer"))?;
        Ok(AtomicAmount(amount))
    }
}

impl Display for AtomicAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheme-specific payload of a native SOL payment.
///
/// Addresses stay as raw strings here; the scheme engine validates them and
/// reports a taxonomy reason instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferPayload {
    /// The payer wallet, base58.
    pub from: String,
    /// Base58 signature of the client-signed transaction.
    pub signature: String,
    /// Lamports, as a decimal string.
    pub amount: AtomicAmount,
    /// Signing time, milliseconds since Unix epoch.
    pub timestamp: UnixTimestampMillis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Scheme-specific payload of an SPL token payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplPayload {
    pub from: String,
    pub signature: String,
    /// Token base units, as a decimal string.
    pub amount: AtomicAmount,
    pub timestamp: UnixTimestampMillis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// The token mint, base58.
    pub mint: String,
    /// The payer's associated token account.
    pub from_token_account: String,
    /// The recipient's associated token account.
    pub to_token_account: String,
}

/// The scheme-discriminated inner payload of a payment header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SchemePayload {
    Transfer(TransferPayload),
    Spl(SplPayload),
}

/// Describes a signed request to transfer funds on-chain, as carried inside
/// the `X-Payment` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: X402Version,
    pub scheme: Scheme,
    pub network: Network,
    pub payload: SchemePayload,
}

/// Intermediate shape used to dispatch on `scheme` before decoding the
/// scheme-specific payload.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPaymentPayload {
    x402_version: u64,
    scheme: String,
    network: String,
    payload: serde_json::Value,
}

/// Error returned when the `X-Payment` header cannot be decoded into a
/// valid [`PaymentPayload`].
#[derive(Debug, thiserror::Error)]
pub enum PaymentHeaderError {
    /// The input bytes were not valid base64.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The decoded bytes were not UTF-8.
    #[error("utf-8 decode error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// The JSON structure was invalid or did not conform to the payload shape.
    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// The envelope carried an x402 version other than 1.
    #[error("unsupported x402 version: {0}")]
    UnsupportedVersion(u64),
    /// The envelope named a scheme this facilitator does not know.
    #[error("unknown scheme: {0}")]
    UnknownScheme(String),
    /// The envelope named a network this facilitator does not know.
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
}

impl PaymentHeaderError {
    /// The taxonomy code this decode failure surfaces as.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            PaymentHeaderError::Base64(_)
            | PaymentHeaderError::Utf8(_)
            | PaymentHeaderError::Json(_) => ErrorCode::InvalidPayload,
            PaymentHeaderError::UnsupportedVersion(_) => ErrorCode::UnsupportedX402Version,
            PaymentHeaderError::UnknownScheme(_) => ErrorCode::InvalidScheme,
            PaymentHeaderError::UnknownNetwork(_) => ErrorCode::InvalidNetwork,
        }
    }
}

impl PaymentPayload {
    fn from_raw(raw: RawPaymentPayload) -> Result<Self, PaymentHeaderError> {
        let x402_version = X402Version::try_from(raw.x402_version)
            .map_err(|e| PaymentHeaderError::UnsupportedVersion(e.0))?;
        let scheme = Scheme::from_str(&raw.scheme)
            .map_err(|_| PaymentHeaderError::UnknownScheme(raw.scheme.clone()))?;
        let network = Network::from_str(&raw.network)
            .map_err(|_| PaymentHeaderError::UnknownNetwork(raw.network.clone()))?;
        let payload = match scheme {
            Scheme::SolanaTransfer => SchemePayload::Transfer(serde_json::from_value(raw.payload)?),
            Scheme::SolanaSpl => SchemePayload::Spl(serde_json::from_value(raw.payload)?),
        };
        Ok(PaymentPayload {
            x402_version,
            scheme,
            network,
            payload,
        })
    }

    /// Decode an `X-Payment` header value.
    ///
    /// Decoding is total-failing: any error yields a [`PaymentHeaderError`],
    /// never a partially parsed payload.
    pub fn from_base64(header: &str) -> Result<Self, PaymentHeaderError> {
        let bytes = Base64Bytes::from(header).decode()?;
        let text = std::str::from_utf8(&bytes)?;
        let raw: RawPaymentPayload = serde_json::from_str(text)?;
        Self::from_raw(raw)
    }

    /// Encode into an `X-Payment` header value: `base64(JSON(self))`.
    pub fn to_base64(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(Base64Bytes::encode(json)
            .into_string()
            .expect("base64 output is ASCII"))
    }
}

impl<'de> Deserialize<'de> for PaymentPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawPaymentPayload::deserialize(deserializer)?;
        PaymentPayload::from_raw(raw).map_err(serde::de::Error::custom)
    }
}

/// The token being transferred: native SOL or an SPL mint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    /// Native SOL, spelled `"SOL"` on the wire.
    Sol,
    /// An SPL token mint address, base58.
    Mint(String),
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Asset::Sol => serializer.serialize_str("SOL"),
            Asset::Mint(mint) => serializer.serialize_str(mint),
        }
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == "SOL" {
            Ok(Asset::Sol)
        } else {
            Ok(Asset::Mint(s))
        }
    }
}

impl Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Sol => write!(f, "SOL"),
            Asset::Mint(mint) => write!(f, "{mint}"),
        }
    }
}

/// Optional hints attached to a payment requirement.
///
/// `fee_payer` is reserved for a fee-delegation mode this facilitator does
/// not operate; it is parsed and surfaced but never acted on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_payer: Option<String>,
    /// Priority fee hint, lamports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_fee: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Requirements set by the resource server for one acceptable way to pay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: Scheme,
    pub network: Network,
    /// Minimum acceptable amount in human-readable units, e.g. `"0.01"`.
    pub max_amount_required: String,
    /// URL path being paid for (informational).
    pub resource: String,
    pub description: String,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    /// Recipient wallet, base58.
    pub pay_to: String,
    /// Suggested client-side timeout, seconds.
    pub max_timeout_seconds: u64,
    pub asset: Asset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<RequirementExtra>,
}

/// Body of `POST /verify` and `POST /settle`: the opaque payment header plus
/// the requirement it is checked against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub x402_version: u64,
    pub payment_header: String,
    pub payment_requirements: PaymentRequirements,
}

/// Settlement uses the same body as verification.
pub type SettleRequest = VerifyRequest;

/// Stable rejection and failure reasons.
///
/// Each variant has a machine-readable code (see [`ErrorCode::code`]) and a
/// human-readable message (its `Display` impl) used as `invalidReason` /
/// `error` in response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorCode {
    // Decode / shape
    #[error("Invalid payment payload")]
    InvalidPayload,
    #[error("Invalid payment scheme")]
    InvalidScheme,
    #[error("Invalid network")]
    InvalidNetwork,
    #[error("Invalid payTo address")]
    InvalidPayTo,
    #[error("Missing asset")]
    MissingAsset,
    #[error("Asset does not match scheme")]
    InvalidAssetScheme,
    #[error("Invalid payment amount")]
    InvalidAmount,
    #[error("Unsupported x402 version")]
    UnsupportedX402Version,
    // Verification
    #[error("Payment scheme mismatch")]
    SchemeMismatch,
    #[error("Network mismatch")]
    NetworkMismatch,
    #[error("Invalid transaction signature")]
    InvalidSignature,
    #[error("Invalid address")]
    InvalidAddress,
    #[error("Mint does not match required asset")]
    MintMismatch,
    #[error("Invalid from token account")]
    InvalidFromTokenAccount,
    #[error("Invalid to token account")]
    InvalidToTokenAccount,
    #[error("Insufficient payment amount")]
    InsufficientAmount,
    #[error("Payment payload expired")]
    PayloadExpired,
    // Settlement
    #[error("Confirmation timeout")]
    ConfirmationTimeout,
    #[error("Transaction rejected on chain")]
    TransactionRejected,
    #[error("Chain RPC error")]
    ChainRpcError,
    // Service
    #[error("Unsupported network")]
    UnsupportedNetwork,
    #[error("Unsupported scheme")]
    UnsupportedScheme,
}

impl ErrorCode {
    /// The stable machine-readable code, for logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
            ErrorCode::InvalidScheme => "INVALID_SCHEME",
            ErrorCode::InvalidNetwork => "INVALID_NETWORK",
            ErrorCode::InvalidPayTo => "INVALID_PAY_TO",
            ErrorCode::MissingAsset => "MISSING_ASSET",
            ErrorCode::InvalidAssetScheme => "INVALID_ASSET_SCHEME",
            ErrorCode::InvalidAmount => "INVALID_AMOUNT",
            ErrorCode::UnsupportedX402Version => "UNSUPPORTED_X402_VERSION",
            ErrorCode::SchemeMismatch => "SCHEME_MISMATCH",
            ErrorCode::NetworkMismatch => "NETWORK_MISMATCH",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::InvalidAddress => "INVALID_ADDRESS",
            ErrorCode::MintMismatch => "MINT_MISMATCH",
            ErrorCode::InvalidFromTokenAccount => "INVALID_FROM_TOKEN_ACCOUNT",
            ErrorCode::InvalidToTokenAccount => "INVALID_TO_TOKEN_ACCOUNT",
            ErrorCode::InsufficientAmount => "INSUFFICIENT_AMOUNT",
            ErrorCode::PayloadExpired => "PAYLOAD_EXPIRED",
            ErrorCode::ConfirmationTimeout => "CONFIRMATION_TIMEOUT",
            ErrorCode::TransactionRejected => "TRANSACTION_REJECTED",
            ErrorCode::ChainRpcError => "CHAIN_RPC_ERROR",
            ErrorCode::UnsupportedNetwork => "UNSUPPORTED_NETWORK",
            ErrorCode::UnsupportedScheme => "UNSUPPORTED_SCHEME",
        }
    }
}

/// Result returned by the facilitator after verifying a payment payload
/// against the provided requirements.
///
/// Serializes as `{"isValid": bool, "invalidReason": string|null}` — both
/// fields are always present so clients never need to probe for keys.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifyResponse {
    /// The payload matches the requirements and passes all checks.
    Valid,
    /// The payload was rejected for the specified reason.
    Invalid { reason: ErrorCode },
}

impl VerifyResponse {
    pub fn valid() -> Self {
        VerifyResponse::Valid
    }

    pub fn invalid(reason: ErrorCode) -> Self {
        VerifyResponse::Invalid { reason }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResponse::Valid)
    }
}

impl Serialize for VerifyResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = serializer.serialize_struct("VerifyResponse", 2)?;
        match self {
            VerifyResponse::Valid => {
                s.serialize_field("isValid", &true)?;
                s.serialize_field("invalidReason", &None::<String>)?;
            }
            VerifyResponse::Invalid { reason } => {
                s.serialize_field("isValid", &false)?;
                s.serialize_field("invalidReason", &reason.to_string())?;
            }
        }
        s.end()
    }
}

/// Returned from the facilitator after attempting to settle a payment on-chain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,
    pub error: Option<String>,
    pub tx_hash: Option<String>,
    pub network_id: Option<Network>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
}

impl SettleResponse {
    /// A settlement that landed (or was already on chain).
    pub fn settled(tx_hash: String, network: Network, confirmations: Option<u64>) -> Self {
        SettleResponse {
            success: true,
            error: None,
            tx_hash: Some(tx_hash),
            network_id: Some(network),
            confirmations,
        }
    }

    /// A settlement that failed; `tx_hash` is the attempted submission, if any.
    pub fn failed(reason: ErrorCode, tx_hash: Option<String>) -> Self {
        SettleResponse {
            success: false,
            error: Some(reason.to_string()),
            tx_hash,
            network_id: None,
            confirmations: None,
        }
    }

    /// Encode for the `X-Payment-Response` header a resource server echoes
    /// back to the client: `base64(JSON(self))`.
    pub fn to_header_value(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(Base64Bytes::encode(json)
            .into_string()
            .expect("base64 output is ASCII"))
    }
}

/// One supported (scheme, network) pair, as listed by `GET /supported`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedPaymentKind {
    pub scheme: Scheme,
    pub network: Network,
}

/// Body of `GET /supported`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponse {
    pub kinds: Vec<SupportedPaymentKind>,
}

/// Body of `GET /health`.
#[derive(Clone, Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Milliseconds since Unix epoch.
    pub timestamp: u64,
}

/// Body of `GET /transaction/:signature`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatusResponse {
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A simple error structure returned on unexpected or fatal server errors.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_payload() -> PaymentPayload {
        PaymentPayload {
            x402_version: X402Version::V1,
            scheme: Scheme::SolanaTransfer,
            network: Network::SolanaDevnet,
            payload: SchemePayload::Transfer(TransferPayload {
                from: "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T".to_string(),
                signature: "x".repeat(88),
                amount: AtomicAmount(10_000_000),
                timestamp: UnixTimestampMillis::from_millis(1_700_000_000_000),
                nonce: None,
            }),
        }
    }

    #[test]
    fn payment_payload_base64_round_trip() {
        let payload = transfer_payload();
        let encoded = payload.to_base64().unwrap();
        let decoded = PaymentPayload::from_base64(&encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn amount_serializes_as_string_timestamp_as_number() {
        let payload = transfer_payload();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["payload"]["amount"], "10000000");
        assert_eq!(json["payload"]["timestamp"], 1_700_000_000_000u64);
        assert_eq!(json["x402Version"], 1);
    }

    #[test]
    fn decode_rejects_bad_base64() {
        let err = PaymentPayload::from_base64("@@not-base64@@").unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidPayload);
    }

    #[test]
    fn decode_rejects_unsupported_version() {
        let json = serde_json::json!({
            "x402Version": 2,
            "scheme": "solana-transfer",
            "network": "solana-devnet",
            "payload": {},
        });
        let header = Base64Bytes::encode(serde_json::to_vec(&json).unwrap())
            .into_string()
            .unwrap();
        let err = PaymentPayload::from_base64(&header).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::UnsupportedX402Version);
    }

    #[test]
    fn decode_rejects_unknown_scheme_before_payload_shape() {
        let json = serde_json::json!({
            "x402Version": 1,
            "scheme": "solana-stake",
            "network": "solana-devnet",
            "payload": "garbage",
        });
        let header = Base64Bytes::encode(serde_json::to_vec(&json).unwrap())
            .into_string()
            .unwrap();
        let err = PaymentPayload::from_base64(&header).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidScheme);
    }

    #[test]
    fn decode_rejects_unknown_network() {
        let json = serde_json::json!({
            "x402Version": 1,
            "scheme": "solana-transfer",
            "network": "solana-localnet",
            "payload": {},
        });
        let header = Base64Bytes::encode(serde_json::to_vec(&json).unwrap())
            .into_string()
            .unwrap();
        let err = PaymentPayload::from_base64(&header).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::InvalidNetwork);
    }

    #[test]
    fn transfer_decode_ignores_spl_fields() {
        let json = serde_json::json!({
            "x402Version": 1,
            "scheme": "solana-transfer",
            "network": "solana-devnet",
            "payload": {
                "from": "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T",
                "signature": "s".repeat(88),
                "amount": "10000000",
                "timestamp": 1_700_000_000_000u64,
                "mint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                "fromTokenAccount": "whatever",
                "toTokenAccount": "whatever",
            },
        });
        let header = Base64Bytes::encode(serde_json::to_vec(&json).unwrap())
            .into_string()
            .unwrap();
        let decoded = PaymentPayload::from_base64(&header).unwrap();
        assert!(matches!(decoded.payload, SchemePayload::Transfer(_)));
    }

    #[test]
    fn asset_serde() {
        let sol: Asset = serde_json::from_str("\"SOL\"").unwrap();
        assert_eq!(sol, Asset::Sol);
        let mint: Asset =
            serde_json::from_str("\"EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v\"").unwrap();
        assert!(matches!(mint, Asset::Mint(_)));
        assert_eq!(serde_json::to_string(&Asset::Sol).unwrap(), "\"SOL\"");
    }

    #[test]
    fn verify_response_shapes() {
        let valid = serde_json::to_value(VerifyResponse::valid()).unwrap();
        assert_eq!(valid["isValid"], true);
        assert!(valid["invalidReason"].is_null());

        let invalid =
            serde_json::to_value(VerifyResponse::invalid(ErrorCode::InsufficientAmount)).unwrap();
        assert_eq!(invalid["isValid"], false);
        assert_eq!(invalid["invalidReason"], "Insufficient payment amount");
    }

    #[test]
    fn settle_response_shapes() {
        let ok = serde_json::to_value(SettleResponse::settled(
            "sig".to_string(),
            Network::SolanaDevnet,
            Some(3),
        ))
        .unwrap();
        assert_eq!(ok["success"], true);
        assert!(ok["error"].is_null());
        assert_eq!(ok["txHash"], "sig");
        assert_eq!(ok["networkId"], "solana-devnet");
        assert_eq!(ok["confirmations"], 3);

        let failed =
            serde_json::to_value(SettleResponse::failed(ErrorCode::InsufficientAmount, None))
                .unwrap();
        assert_eq!(failed["success"], false);
        assert_eq!(failed["error"], "Insufficient payment amount");
        assert!(failed["txHash"].is_null());
        assert!(failed["networkId"].is_null());
        assert!(failed.get("confirmations").is_none());
    }

    #[test]
    fn settle_response_header_value_is_base64_json() {
        let response = SettleResponse::settled("sig".to_string(), Network::SolanaDevnet, None);
        let header = response.to_header_value().unwrap();
        let bytes = Base64Bytes::from(header.as_str()).decode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["success"], true);
    }

    #[test]
    fn error_code_messages_match_taxonomy() {
        assert_eq!(ErrorCode::PayloadExpired.to_string(), "Payment payload expired");
        assert_eq!(
            ErrorCode::InvalidToTokenAccount.to_string(),
            "Invalid to token account"
        );
        assert_eq!(ErrorCode::InsufficientAmount.code(), "INSUFFICIENT_AMOUNT");
    }
}
