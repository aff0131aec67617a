#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EVM backend for the deworld marketplace.
//!
//! This crate connects the chain-agnostic session and purchase flow in
//! [`deworld`] to zkSync through alloy:
//!
//! - [`EvmMarketClient`]: balance reads plus gas-paying `mint`, `approve`
//!   and `purchaseProduct` writes submitted via the wallet
//! - [`PaymasterChannel`]: the same writes as zkSync EIP-712 transactions,
//!   with fees paid in the stablecoin through a paymaster
//! - [`LocalWallet`]: a private-key wallet implementing
//!   [`WalletProvider`](deworld::wallet::WalletProvider)
//!
//! # Feature Flags
//!
//! - `telemetry` - `tracing` spans around RPC calls

pub mod client;
pub mod contract;
pub mod eip712;
pub mod paymaster;
pub mod receipt;
pub mod wallet;

mod networks;
pub use networks::*;

pub use client::EvmMarketClient;
pub use paymaster::PaymasterChannel;
pub use wallet::LocalWallet;

#[cfg(test)]
pub(crate) mod testing;
