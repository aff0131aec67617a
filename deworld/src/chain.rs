//! Chain identifiers and chain metadata.
//!
//! Wallet providers report the active chain as a `0x`-prefixed hexadecimal
//! string (`eth_chainId`). [`ChainId`] parses and renders that form while
//! comparing numerically, and [`ChainMetadata`] carries everything a wallet
//! needs to add an unrecognized chain (`wallet_addEthereumChain`).

use std::fmt;
use std::str::FromStr;

use alloy_primitives::TxHash;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An EIP-155 chain identifier, rendered in hexadecimal (e.g. `0x12c`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(u64);

impl ChainId {
    /// Creates a chain ID from its numeric value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Error returned when a chain ID string is not `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid chain id {0:?}: expected 0x-prefixed hexadecimal")]
pub struct ChainIdParseError(String);

impl FromStr for ChainId {
    type Err = ChainIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ChainIdParseError(s.to_owned()))?;
        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| ChainIdParseError(s.to_owned()))
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Native currency of a chain, as passed to `wallet_addEthereumChain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Currency name (e.g. `"ETH"`).
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Decimals of the smallest unit (18 for ETH).
    pub decimals: u8,
}

/// Chain parameters a wallet needs to add and switch to a chain.
///
/// Serializes to the `AddEthereumChainParameter` shape of EIP-3085.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainMetadata {
    /// Chain identifier.
    pub chain_id: ChainId,
    /// Human-readable chain name.
    pub chain_name: String,
    /// Native gas currency.
    pub native_currency: NativeCurrency,
    /// JSON-RPC endpoints, in preference order.
    pub rpc_urls: Vec<String>,
    /// Block explorer base URLs.
    #[serde(default)]
    pub block_explorer_urls: Vec<String>,
}

impl ChainMetadata {
    /// Returns the explorer link for a transaction, if an explorer is configured.
    #[must_use]
    pub fn explorer_tx_url(&self, tx_hash: &TxHash) -> Option<String> {
        self.block_explorer_urls
            .first()
            .map(|base| format!("{}/tx/{tx_hash}", base.trim_end_matches('/')))
    }
}

/// Whether the wallet's active chain is the required one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatus {
    /// The chain the marketplace contracts live on.
    pub required: ChainId,
    /// The chain last reported by the wallet, if it has been read.
    pub observed: Option<ChainId>,
}

impl NetworkStatus {
    /// Status before the wallet has been asked for its chain.
    #[must_use]
    pub const fn unknown(required: ChainId) -> Self {
        Self {
            required,
            observed: None,
        }
    }

    /// Status after observing `chain`.
    #[must_use]
    pub const fn observed(required: ChainId, chain: ChainId) -> Self {
        Self {
            required,
            observed: Some(chain),
        }
    }

    /// `true` iff the observed chain equals the required chain.
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.observed == Some(self.required)
    }

    /// `true` when a chain was observed and it is the wrong one, the state in
    /// which a switch affordance should be offered.
    #[must_use]
    pub fn needs_switch(&self) -> bool {
        self.observed.is_some() && !self.is_correct()
    }
}
