//! Contract-call seams.
//!
//! [`MarketClient`] is the chain client handle a session owns: balance reads
//! plus the conventional, gas-paying writes (`mint`, `approve`,
//! `purchaseProduct`). [`SponsoredChannel`] is the fee-sponsorship channel
//! that submits the same writes with gas paid in the stablecoin through a
//! paymaster contract, and separately waits for confirmations.
//!
//! Both normalize whatever receipt shape their transport produces into a
//! [`TxOutcome`] before handing it back.

use std::future::Future;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::wallet::ProviderRpcError;

/// Type-erased transport error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while reading from or writing to the chain.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The wallet rejected or failed the request.
    #[error(transparent)]
    Wallet(#[from] ProviderRpcError),
    /// RPC transport failure.
    #[error("rpc transport error: {0}")]
    Transport(#[source] BoxError),
    /// The transaction was mined but reverted.
    #[error("transaction {tx_hash} reverted")]
    Reverted {
        /// Hash of the reverted transaction.
        tx_hash: TxHash,
    },
    /// The confirmation wait exceeded its bound. The transaction may still land.
    #[error("transaction {tx_hash} not confirmed within {timeout:?}")]
    ConfirmationTimeout {
        /// Hash of the pending transaction.
        tx_hash: TxHash,
        /// The bound that was exceeded.
        timeout: Duration,
    },
    /// The node answered with something that could not be interpreted.
    #[error("invalid rpc response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Wraps a transport-level error.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }
}

/// A confirmed, successful transaction, normalized across submission channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOutcome {
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Block the transaction landed in.
    pub block_number: Option<u64>,
    /// Gas consumed.
    pub gas_used: u64,
    /// Price actually paid per gas unit, in wei, when the receipt reports it.
    pub effective_gas_price: Option<u128>,
    /// Purchase id emitted by the marketplace `Sale` event, for purchase transactions.
    pub purchase_id: Option<U256>,
}

/// Chain client handle: balance reads and direct-gas writes.
pub trait MarketClient: Send + Sync {
    /// Reads `balanceOf(owner)` on a fungible-token contract.
    fn token_balance(
        &self,
        token: Address,
        owner: Address,
    ) -> impl Future<Output = Result<U256, ClientError>> + Send;

    /// Reads the native-currency balance of `owner`.
    fn native_balance(&self, owner: Address)
    -> impl Future<Output = Result<U256, ClientError>> + Send;

    /// Calls the test token's `mint()` from `from`.
    fn mint(
        &self,
        token: Address,
        from: Address,
    ) -> impl Future<Output = Result<TxOutcome, ClientError>> + Send;

    /// Calls `approve(spender, amount)` on `token` from `from`.
    fn approve(
        &self,
        token: Address,
        from: Address,
        spender: Address,
        amount: U256,
    ) -> impl Future<Output = Result<TxOutcome, ClientError>> + Send;

    /// Calls `purchaseProduct(productId, quantity)` on the marketplace from `from`.
    fn purchase_product(
        &self,
        marketplace: Address,
        from: Address,
        product_id: U256,
        quantity: u64,
    ) -> impl Future<Output = Result<TxOutcome, ClientError>> + Send;
}

/// How the paymaster is reimbursed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SponsorshipKind {
    /// The paymaster pulls its fee in `token` from an allowance the sender grants.
    #[default]
    ApprovalBased,
    /// The paymaster sponsors without token reimbursement.
    General,
}

/// Sponsorship parameters attached to every sponsored call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsorshipParams {
    /// Reimbursement flavour.
    pub kind: SponsorshipKind,
    /// The fee-sponsor contract.
    pub paymaster: Address,
    /// Token gas is paid in.
    pub fee_token: Address,
    /// Minimum allowance the paymaster requires, in the fee token's smallest unit.
    pub min_allowance: U256,
    /// Extra paymaster-specific input.
    pub inner_input: Bytes,
}

/// A marketplace-level contract call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractCall {
    /// `approve(spender, amount)` on the token.
    Approve {
        /// Account allowed to spend.
        spender: Address,
        /// Allowance in the token's smallest unit.
        amount: U256,
    },
    /// `purchaseProduct(productId, quantity)` on the marketplace.
    PurchaseProduct {
        /// Product identifier.
        product_id: U256,
        /// Units to buy.
        quantity: u64,
    },
}

impl ContractCall {
    /// Solidity method name, for notices and logs.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
            Self::PurchaseProduct { .. } => "purchaseProduct",
        }
    }
}

/// One call submitted through the sponsored channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SponsoredCall {
    /// Contract the call targets.
    pub target: Address,
    /// What to call.
    pub call: ContractCall,
    /// Who pays the gas, and how.
    pub sponsorship: SponsorshipParams,
}

/// Fee-sponsorship channel: submit, then separately wait for confirmations.
pub trait SponsoredChannel: Send + Sync {
    /// Signs and submits `call` on behalf of `from`, returning the transaction hash.
    fn submit(
        &self,
        from: Address,
        call: SponsoredCall,
    ) -> impl Future<Output = Result<TxHash, ClientError>> + Send;

    /// Blocks until `tx_hash` has `confirmations` confirmations, within the
    /// channel's configured timeout.
    fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> impl Future<Output = Result<TxOutcome, ClientError>> + Send;
}
