//! Gas-paying market client.
//!
//! Reads go straight to the node through an alloy [`Provider`]. Writes are
//! handed to the connected wallet, which signs and pays for them, and are
//! then followed to confirmation with a [`ReceiptPoller`].

use std::sync::Arc;
use std::time::Duration;

use alloy_network::TransactionBuilder;
use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::Provider;
use alloy_rpc_types_eth::TransactionRequest;
use alloy_sol_types::SolCall;
use deworld::client::{ClientError, ContractCall, MarketClient, TxOutcome};
use deworld::config::MarketConfig;
use deworld::wallet::{TransactionCall, WalletProvider};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::contract::{IStablecoin, calldata};
use crate::receipt::ReceiptPoller;

/// [`MarketClient`] over an alloy provider and a signing wallet.
pub struct EvmMarketClient<P, W> {
    provider: P,
    wallet: Arc<W>,
    poller: ReceiptPoller,
    confirmations: u64,
}

impl<P, W> std::fmt::Debug for EvmMarketClient<P, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmMarketClient")
            .field("poller", &self.poller)
            .field("confirmations", &self.confirmations)
            .finish_non_exhaustive()
    }
}

impl<P: Provider, W: WalletProvider> EvmMarketClient<P, W> {
    /// Creates a client reading through `provider` and writing through `wallet`.
    #[must_use]
    pub fn new(provider: P, wallet: Arc<W>, config: &MarketConfig) -> Self {
        Self {
            provider,
            wallet,
            poller: ReceiptPoller::new(config.confirmation_timeout())
                .with_marketplace(config.marketplace),
            confirmations: config.confirmations,
        }
    }

    /// Overrides the receipt polling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poller = self.poller.with_interval(interval);
        self
    }

    /// The read provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    async fn read<C: SolCall + Send + Sync>(
        &self,
        to: Address,
        call: C,
    ) -> Result<C::Return, ClientError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(call.abi_encode());
        let raw = self
            .provider
            .call(tx)
            .await
            .map_err(ClientError::transport)?;
        C::abi_decode_returns(&raw).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    async fn write(&self, from: Address, to: Address, data: Bytes) -> Result<TxOutcome, ClientError> {
        let tx_hash = self
            .wallet
            .send_transaction(TransactionCall {
                from,
                to,
                data,
                value: U256::ZERO,
            })
            .await?;
        #[cfg(feature = "telemetry")]
        tracing::debug!(%tx_hash, "transaction submitted");
        self.poller
            .wait(&self.provider, tx_hash, self.confirmations)
            .await
    }
}

impl<P: Provider, W: WalletProvider> MarketClient for EvmMarketClient<P, W> {
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "deworld.evm.token_balance", skip(self), err)
    )]
    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ClientError> {
        self.read(token, IStablecoin::balanceOfCall { account: owner })
            .await
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "deworld.evm.native_balance", skip(self), err)
    )]
    async fn native_balance(&self, owner: Address) -> Result<U256, ClientError> {
        self.provider
            .get_balance(owner)
            .await
            .map_err(ClientError::transport)
    }

    #[cfg_attr(feature = "telemetry", instrument(name = "deworld.evm.mint", skip(self), err))]
    async fn mint(&self, token: Address, from: Address) -> Result<TxOutcome, ClientError> {
        self.write(from, token, IStablecoin::mintCall {}.abi_encode().into())
            .await
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "deworld.evm.approve", skip(self), err)
    )]
    async fn approve(
        &self,
        token: Address,
        from: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxOutcome, ClientError> {
        let data = calldata(&ContractCall::Approve { spender, amount });
        self.write(from, token, data).await
    }

    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "deworld.evm.purchase_product", skip(self), err)
    )]
    async fn purchase_product(
        &self,
        marketplace: Address,
        from: Address,
        product_id: U256,
        quantity: u64,
    ) -> Result<TxOutcome, ClientError> {
        let data = calldata(&ContractCall::PurchaseProduct {
            product_id,
            quantity,
        });
        self.write(from, marketplace, data).await
    }
}
