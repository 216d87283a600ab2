//! Cross-field validation of [`PaymentRequirements`].
//!
//! The validator enforces the consistency rules a resource server must obey
//! when publishing payment terms: scheme/asset agreement, a real recipient
//! key, and a positive decimal amount. It never performs network I/O, so it
//! can run on every request before any chain adapter is touched.

use solana_pubkey::Pubkey;
use std::str::FromStr;

use crate::types::{Asset, ErrorCode, PaymentRequirements, Scheme};
use crate::util::MoneyAmount;

/// Validate a [`PaymentRequirements`] against the protocol invariants.
///
/// Checks, in order:
/// 1. `solana-transfer` pairs with `asset = "SOL"`, `solana-spl` with a mint.
/// 2. For `solana-spl`, the mint is a well-formed base58 public key.
/// 3. `payTo` is a valid ed25519 public key.
/// 4. `maxAmountRequired` parses to a positive decimal.
pub fn validate(requirements: &PaymentRequirements) -> Result<(), ErrorCode> {
    match (&requirements.scheme, &requirements.asset) {
        (Scheme::SolanaTransfer, Asset::Sol) => {}
        (Scheme::SolanaTransfer, Asset::Mint(_)) => return Err(ErrorCode::InvalidAssetScheme),
        (Scheme::SolanaSpl, Asset::Sol) => return Err(ErrorCode::InvalidAssetScheme),
        (Scheme::SolanaSpl, Asset::Mint(mint)) => {
            if mint.is_empty() {
                return Err(ErrorCode::MissingAsset);
            }
            if Pubkey::from_str(mint).is_err() {
                return Err(ErrorCode::InvalidAssetScheme);
            }
        }
    }
    if Pubkey::from_str(&requirements.pay_to).is_err() {
        return Err(ErrorCode::InvalidPayTo);
    }
    if MoneyAmount::parse(&requirements.max_amount_required).is_err() {
        return Err(ErrorCode::InvalidAmount);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;

    const PAY_TO: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";
    const USDC_DEVNET: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

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

    fn spl_requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: Scheme::SolanaSpl,
            asset: Asset::Mint(USDC_DEVNET.to_string()),
            max_amount_required: "1.00".to_string(),
            ..sol_requirements()
        }
    }

    #[test]
    fn accepts_valid_sol_requirements() {
        assert!(validate(&sol_requirements()).is_ok());
    }

    #[test]
    fn accepts_valid_spl_requirements() {
        assert!(validate(&spl_requirements()).is_ok());
    }

    #[test]
    fn rejects_spl_scheme_with_sol_asset() {
        let requirements = PaymentRequirements {
            scheme: Scheme::SolanaSpl,
            asset: Asset::Sol,
            ..sol_requirements()
        };
        assert_eq!(validate(&requirements), Err(ErrorCode::InvalidAssetScheme));
    }

    #[test]
    fn rejects_transfer_scheme_with_mint_asset() {
        let requirements = PaymentRequirements {
            asset: Asset::Mint(USDC_DEVNET.to_string()),
            ..sol_requirements()
        };
        assert_eq!(validate(&requirements), Err(ErrorCode::InvalidAssetScheme));
    }

    #[test]
    fn rejects_empty_mint() {
        let requirements = PaymentRequirements {
            asset: Asset::Mint(String::new()),
            ..spl_requirements()
        };
        assert_eq!(validate(&requirements), Err(ErrorCode::MissingAsset));
    }

    #[test]
    fn rejects_malformed_mint() {
        let requirements = PaymentRequirements {
            asset: Asset::Mint("not-base58-0OIl".to_string()),
            ..spl_requirements()
        };
        assert_eq!(validate(&requirements), Err(ErrorCode::InvalidAssetScheme));
    }

    #[test]
    fn rejects_bad_pay_to() {
        let requirements = PaymentRequirements {
            pay_to: "nobody".to_string(),
            ..sol_requirements()
        };
        assert_eq!(validate(&requirements), Err(ErrorCode::InvalidPayTo));
    }

    #[test]
    fn rejects_non_positive_amounts() {
        for bad in ["0", "-0.01", "a lot"] {
            let requirements = PaymentRequirements {
                max_amount_required: bad.to_string(),
                ..sol_requirements()
            };
            assert_eq!(validate(&requirements), Err(ErrorCode::InvalidAmount));
        }
    }
}
