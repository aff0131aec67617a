//! The wallet-provider capability.
//!
//! In a browser the wallet is an ambient object injected by an extension.
//! Here it is an explicit [`WalletProvider`] handed to the session at
//! construction, so the lifecycle can be driven by a real wallet, a local
//! key-backed wallet, or a test double alike.
//!
//! Every call can reject with a [`ProviderRpcError`] whose numeric code
//! follows EIP-1193 (`4001` user rejected, `4902` unrecognized chain, ...).

use std::future::Future;
use std::sync::Arc;

use alloy_primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::chain::{ChainId, ChainMetadata};
use crate::error::Error;
use crate::notify::{Notice, Notifier};

/// An error object returned by a wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("wallet error {code}: {message}")]
pub struct ProviderRpcError {
    /// EIP-1193 / JSON-RPC error code.
    pub code: i64,
    /// Provider-supplied message.
    pub message: String,
}

impl ProviderRpcError {
    /// The user rejected the request.
    pub const USER_REJECTED: i64 = 4001;
    /// The requested account or method has not been authorized.
    pub const UNAUTHORIZED: i64 = 4100;
    /// The provider does not support the method.
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    /// The provider is disconnected from all chains.
    pub const DISCONNECTED: i64 = 4900;
    /// The provider does not recognize the requested chain.
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    /// Internal JSON-RPC error.
    pub const INTERNAL: i64 = -32603;

    /// Creates an error with an explicit code.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a [`Self::USER_REJECTED`] error.
    #[must_use]
    pub fn user_rejected() -> Self {
        Self::new(Self::USER_REJECTED, "User rejected the request.")
    }

    /// Shorthand for a [`Self::UNRECOGNIZED_CHAIN`] error.
    #[must_use]
    pub fn unrecognized_chain(chain_id: ChainId) -> Self {
        Self::new(
            Self::UNRECOGNIZED_CHAIN,
            format!("Unrecognized chain ID {chain_id}. Try adding the chain first."),
        )
    }

    /// Shorthand for an [`Self::INTERNAL`] error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL, message)
    }

    /// `true` if the user declined the prompt.
    #[must_use]
    pub const fn is_user_rejected(&self) -> bool {
        self.code == Self::USER_REJECTED
    }

    /// `true` if the provider signalled an unknown chain.
    #[must_use]
    pub const fn is_unrecognized_chain(&self) -> bool {
        self.code == Self::UNRECOGNIZED_CHAIN
    }
}

/// A contract call submitted through the wallet (`eth_sendTransaction`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCall {
    /// Sending account; the wallet signs for it.
    pub from: Address,
    /// Target contract.
    pub to: Address,
    /// ABI-encoded calldata.
    pub data: Bytes,
    /// Native value attached to the call.
    #[serde(default)]
    pub value: U256,
}

/// An injected wallet: account access, chain control, signing and submission.
pub trait WalletProvider: Send + Sync {
    /// Prompts for account access (`eth_requestAccounts`).
    fn request_accounts(&self)
    -> impl Future<Output = Result<Vec<Address>, ProviderRpcError>> + Send;

    /// Reads the active chain (`eth_chainId`).
    fn chain_id(&self) -> impl Future<Output = Result<ChainId, ProviderRpcError>> + Send;

    /// Asks the wallet to switch chains (`wallet_switchEthereumChain`).
    fn switch_chain(
        &self,
        chain_id: ChainId,
    ) -> impl Future<Output = Result<(), ProviderRpcError>> + Send;

    /// Asks the wallet to add a chain and switch to it (`wallet_addEthereumChain`).
    fn add_chain(
        &self,
        chain: &ChainMetadata,
    ) -> impl Future<Output = Result<(), ProviderRpcError>> + Send;

    /// Subscribes to `chainChanged` notifications.
    fn chain_changes(&self) -> broadcast::Receiver<ChainId>;

    /// Signs and submits a transaction, returning its hash (`eth_sendTransaction`).
    fn send_transaction(
        &self,
        tx: TransactionCall,
    ) -> impl Future<Output = Result<TxHash, ProviderRpcError>> + Send;

    /// Signs EIP-712 typed data (`eth_signTypedData_v4`), returning the
    /// 65-byte signature.
    fn sign_typed_data(
        &self,
        from: Address,
        typed_data: &serde_json::Value,
    ) -> impl Future<Output = Result<Bytes, ProviderRpcError>> + Send;
}

/// Resolves the injected provider, if the host environment has one.
///
/// # Errors
///
/// Returns [`Error::ProviderMissing`] when no provider was injected, after
/// telling the user to install a wallet.
pub fn detect_provider<W, N>(injected: Option<Arc<W>>, notifier: &N) -> Result<Arc<W>, Error>
where
    N: Notifier + ?Sized,
{
    injected.ok_or_else(|| {
        notifier.notify(Notice::error(
            "No wallet detected. Please install a wallet to continue.",
        ));
        Error::ProviderMissing
    })
}

/// Renders an address as `0xabcd...1234` for banners.
#[must_use]
pub fn short_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
