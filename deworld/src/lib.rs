#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the deworld marketplace client.
//!
//! This crate holds the chain-agnostic half of the client: the wallet
//! connection lifecycle, the network guard, balance formatting, the
//! marketplace entities read from the indexing service, and the purchase
//! orchestrator that drives either a direct gas-paying transaction or a
//! paymaster-sponsored one. Chain access is abstracted behind traits; the
//! `deworld-evm` crate implements them with alloy and `deworld-graph`
//! implements the indexing-service side.
//!
//! # Modules
//!
//! - [`amount`] - Fixed-precision rendering of on-chain integer amounts
//! - [`chain`] - Hex chain identifiers, chain metadata and network status
//! - [`wallet`] - The injected wallet-provider capability and its errors
//! - [`guard`] - Required-chain checks and network switching
//! - [`session`] - Connection state machine owning account and client handle
//! - [`balance`] - Balance reads for the session account
//! - [`client`] - Contract-call seams used by balances and purchases
//! - [`market`] - Products and purchases as served by the indexing service
//! - [`purchase`] - Dual-path purchase orchestration
//! - [`history`] - Purchase-history reads
//! - [`notify`] - User-visible, non-blocking notices
//! - [`config`] - Marketplace configuration
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation and the [`notify::TracingNotifier`]

pub mod amount;
pub mod balance;
pub mod chain;
pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod history;
pub mod market;
pub mod notify;
pub mod purchase;
pub mod session;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use error::Error;
