//! Marketplace deployment configuration.
//!
//! One [`MarketConfig`] describes a deployment: the chain the contracts live
//! on, the stablecoin, the marketplace contract and the paymaster that
//! sponsors gas. Defaults match the zkSync Sepolia deployment.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

use crate::chain::{ChainId, ChainMetadata};
use crate::client::{SponsorshipKind, SponsorshipParams};

/// A fungible token tracked by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token contract.
    pub address: Address,
    /// Ticker shown next to balances.
    #[serde(default = "TokenConfig::default_symbol")]
    pub symbol: String,
    /// Decimals of the smallest unit.
    #[serde(default = "TokenConfig::default_decimals")]
    pub decimals: u8,
}

impl TokenConfig {
    fn default_symbol() -> String {
        "mUSDT".to_owned()
    }

    const fn default_decimals() -> u8 {
        6
    }
}

/// Fee-sponsor contract settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymasterConfig {
    /// Paymaster contract.
    pub address: Address,
    /// Reimbursement flavour.
    #[serde(default)]
    pub kind: SponsorshipKind,
    /// Minimum allowance, in the fee token's smallest unit.
    #[serde(default = "PaymasterConfig::default_min_allowance")]
    pub min_allowance: u64,
    /// Gas-per-pubdata limit attached to sponsored transactions.
    #[serde(default = "PaymasterConfig::default_gas_per_pubdata")]
    pub gas_per_pubdata: u64,
    /// Gas limit attached to sponsored transactions.
    #[serde(default = "PaymasterConfig::default_gas_limit")]
    pub gas_limit: u64,
}

impl PaymasterConfig {
    const fn default_min_allowance() -> u64 {
        10
    }

    const fn default_gas_per_pubdata() -> u64 {
        50_000
    }

    const fn default_gas_limit() -> u64 {
        30_000_000
    }

    /// Settings for `address` with every other field at its default.
    #[must_use]
    pub const fn new(address: Address) -> Self {
        Self {
            address,
            kind: SponsorshipKind::ApprovalBased,
            min_allowance: Self::default_min_allowance(),
            gas_per_pubdata: Self::default_gas_per_pubdata(),
            gas_limit: Self::default_gas_limit(),
        }
    }
}

/// A marketplace deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// The required chain, with the metadata used to add it to a wallet.
    pub chain: ChainMetadata,
    /// The stablecoin prices and balances are denominated in.
    pub stablecoin: TokenConfig,
    /// Marketplace contract.
    pub marketplace: Address,
    /// Fee sponsor.
    pub paymaster: PaymasterConfig,
    /// Confirmations awaited for each transaction.
    #[serde(default = "MarketConfig::default_confirmations")]
    pub confirmations: u64,
    /// Upper bound on any confirmation wait, in seconds.
    #[serde(default = "MarketConfig::default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

impl MarketConfig {
    const fn default_confirmations() -> u64 {
        1
    }

    const fn default_confirmation_timeout_secs() -> u64 {
        120
    }

    /// The chain every operation requires.
    #[must_use]
    pub const fn required_chain(&self) -> ChainId {
        self.chain.chain_id
    }

    /// Confirmation wait bound.
    #[must_use]
    pub const fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    /// Sponsorship parameters for calls paid in the stablecoin.
    #[must_use]
    pub fn sponsorship(&self) -> SponsorshipParams {
        SponsorshipParams {
            kind: self.paymaster.kind,
            paymaster: self.paymaster.address,
            fee_token: self.stablecoin.address,
            min_allowance: U256::from(self.paymaster.min_allowance),
            inner_input: Bytes::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use serde_json::json;

    #[test]
    fn test_defaults_apply() {
        let config: MarketConfig = serde_json::from_value(json!({
            "chain": {
                "chainId": "0x12c",
                "chainName": "zkSync Sepolia",
                "nativeCurrency": { "name": "ETH", "symbol": "ETH", "decimals": 18 },
                "rpcUrls": ["https://sepolia.era.zksync.dev"]
            },
            "stablecoin": { "address": "0x0000000000000000000000000000000000000001" },
            "marketplace": "0x0000000000000000000000000000000000000002",
            "paymaster": { "address": "0x0000000000000000000000000000000000000003" }
        }))
        .unwrap();

        assert_eq!(config.required_chain(), ChainId::new(300));
        assert_eq!(config.stablecoin.symbol, "mUSDT");
        assert_eq!(config.stablecoin.decimals, 6);
        assert_eq!(config.confirmations, 1);
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(120));
        assert_eq!(config.paymaster, PaymasterConfig::new(address!("0x0000000000000000000000000000000000000003")));

        let sponsorship = config.sponsorship();
        assert_eq!(sponsorship.kind, SponsorshipKind::ApprovalBased);
        assert_eq!(sponsorship.min_allowance, U256::from(10u64));
        assert_eq!(sponsorship.fee_token, config.stablecoin.address);
        assert!(sponsorship.inner_input.is_empty());
    }
}
