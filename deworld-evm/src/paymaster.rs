//! Fee-sponsored writes through a zkSync paymaster.
//!
//! [`PaymasterChannel`] builds an EIP-712 transaction around the call, has
//! the wallet sign its typed-data form, and broadcasts the signed bytes
//! itself. Gas is charged by the paymaster in the fee token rather than in
//! the native currency.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, TxHash, U256};
use alloy_provider::Provider;
use deworld::chain::ChainId;
use deworld::client::{ClientError, SponsoredCall, SponsoredChannel, TxOutcome};
use deworld::config::MarketConfig;
use deworld::wallet::WalletProvider;

use crate::contract::calldata;
use crate::eip712::{Eip712Transaction, PaymasterParams};
use crate::receipt::ReceiptPoller;

/// Awaits a future, optionally instrumenting it with a tracing span.
macro_rules! traced {
    ($fut:expr, $span:expr) => {{
        #[cfg(feature = "telemetry")]
        {
            use tracing::Instrument;
            std::future::IntoFuture::into_future($fut).instrument($span).await
        }
        #[cfg(not(feature = "telemetry"))]
        {
            $fut.await
        }
    }};
}

/// [`SponsoredChannel`] for zkSync chains.
pub struct PaymasterChannel<P, W> {
    provider: P,
    wallet: Arc<W>,
    chain_id: ChainId,
    gas_limit: u64,
    gas_per_pubdata: u64,
    poller: ReceiptPoller,
}

impl<P, W> std::fmt::Debug for PaymasterChannel<P, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymasterChannel")
            .field("chain_id", &self.chain_id)
            .field("gas_limit", &self.gas_limit)
            .field("gas_per_pubdata", &self.gas_per_pubdata)
            .finish_non_exhaustive()
    }
}

impl<P: Provider, W: WalletProvider> PaymasterChannel<P, W> {
    /// Creates a channel for the configured chain and paymaster limits.
    #[must_use]
    pub fn new(provider: P, wallet: Arc<W>, config: &MarketConfig) -> Self {
        Self {
            provider,
            wallet,
            chain_id: config.required_chain(),
            gas_limit: config.paymaster.gas_limit,
            gas_per_pubdata: config.paymaster.gas_per_pubdata,
            poller: ReceiptPoller::new(config.confirmation_timeout())
                .with_marketplace(config.marketplace),
        }
    }

    /// Overrides the receipt polling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poller = self.poller.with_interval(interval);
        self
    }

    /// Fills nonce and fees for `call` from the node.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the node cannot be reached.
    pub async fn prepare(
        &self,
        from: Address,
        call: &SponsoredCall,
    ) -> Result<Eip712Transaction, ClientError> {
        let nonce = traced!(
            self.provider.get_transaction_count(from).pending(),
            tracing::info_span!("get_transaction_count", %from)
        )
        .map_err(ClientError::transport)?;
        let gas_price: u128 = traced!(
            self.provider.get_gas_price(),
            tracing::info_span!("get_gas_price")
        )
        .map_err(ClientError::transport)?;
        Ok(Eip712Transaction {
            chain_id: self.chain_id,
            nonce,
            from,
            to: call.target,
            gas_limit: self.gas_limit,
            gas_per_pubdata: self.gas_per_pubdata,
            max_fee_per_gas: gas_price,
            max_priority_fee_per_gas: 0,
            value: U256::ZERO,
            data: calldata(&call.call),
            paymaster: Some(PaymasterParams::from(&call.sponsorship)),
        })
    }
}

impl<P: Provider, W: WalletProvider> SponsoredChannel for PaymasterChannel<P, W> {
    async fn submit(&self, from: Address, call: SponsoredCall) -> Result<TxHash, ClientError> {
        let tx = self.prepare(from, &call).await?;
        let signature = self.wallet.sign_typed_data(from, &tx.typed_data()).await?;
        let raw = tx.encode_signed(&signature);
        let pending = traced!(
            self.provider.send_raw_transaction(&raw),
            tracing::info_span!("send_raw_transaction", method = call.call.method())
        )
        .map_err(ClientError::transport)?;
        let tx_hash = *pending.tx_hash();
        #[cfg(feature = "telemetry")]
        tracing::info!(%tx_hash, method = call.call.method(), "sponsored transaction submitted");
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> Result<TxOutcome, ClientError> {
        traced!(
            self.poller.wait(&self.provider, tx_hash, confirmations),
            tracing::info_span!("wait_for_confirmation", %tx_hash, confirmations)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networks::zksync_sepolia;
    use crate::testing::{ANVIL_ADDRESS, ANVIL_KEY, RpcMock, receipt_json};
    use crate::wallet::LocalWallet;
    use alloy_primitives::B256;
    use deworld::client::ContractCall;
    use deworld::config::{PaymasterConfig, TokenConfig};
    use serde_json::json;

    const MARKETPLACE: Address = Address::repeat_byte(0x22);

    fn config() -> MarketConfig {
        MarketConfig {
            chain: zksync_sepolia(),
            stablecoin: TokenConfig {
                address: Address::repeat_byte(0x11),
                symbol: "mUSDT".to_owned(),
                decimals: 6,
            },
            marketplace: MARKETPLACE,
            paymaster: PaymasterConfig::new(Address::repeat_byte(0x33)),
            confirmations: 1,
            confirmation_timeout_secs: 5,
        }
    }

    fn channel(rpc: &RpcMock) -> PaymasterChannel<alloy_provider::DynProvider, LocalWallet> {
        let mut chain = zksync_sepolia();
        chain.rpc_urls = vec![rpc.url().to_string()];
        let wallet = Arc::new(LocalWallet::from_private_key(ANVIL_KEY, &chain).unwrap());
        PaymasterChannel::new(rpc.provider(), wallet, &config())
            .with_poll_interval(Duration::from_millis(10))
    }

    fn purchase_call(config: &MarketConfig) -> SponsoredCall {
        SponsoredCall {
            target: MARKETPLACE,
            call: ContractCall::PurchaseProduct {
                product_id: U256::from(1u64),
                quantity: 1,
            },
            sponsorship: config.sponsorship(),
        }
    }

    #[tokio::test]
    async fn test_prepare_uses_paymaster_limits() {
        let rpc = RpcMock::start().await;
        rpc.respond("eth_getTransactionCount", json!("0x7")).await;
        rpc.respond("eth_gasPrice", json!("0x17d7840")).await;
        let channel = channel(&rpc);
        let tx = channel
            .prepare(ANVIL_ADDRESS, &purchase_call(&config()))
            .await
            .unwrap();
        assert_eq!(tx.nonce, 7);
        assert_eq!(tx.max_fee_per_gas, 25_000_000);
        assert_eq!(tx.gas_limit, 30_000_000);
        assert_eq!(tx.gas_per_pubdata, 50_000);
        assert_eq!(tx.chain_id, ChainId::new(300));
        let paymaster = tx.paymaster.unwrap();
        assert_eq!(paymaster.paymaster, Address::repeat_byte(0x33));
    }

    #[tokio::test]
    async fn test_submit_broadcasts_eip712_bytes() {
        let rpc = RpcMock::start().await;
        let hash = B256::repeat_byte(0x0f);
        rpc.respond("eth_getTransactionCount", json!("0x0")).await;
        rpc.respond("eth_gasPrice", json!("0x17d7840")).await;
        rpc.respond("eth_sendRawTransaction", json!(hash)).await;
        let channel = channel(&rpc);

        let submitted = channel
            .submit(ANVIL_ADDRESS, purchase_call(&config()))
            .await
            .unwrap();
        assert_eq!(submitted, hash);

        let sent = rpc.requests("eth_sendRawTransaction").await;
        let raw = sent[0]["params"][0].as_str().unwrap();
        assert!(raw.starts_with("0x71"));
    }

    #[tokio::test]
    async fn test_wait_reports_sale() {
        let rpc = RpcMock::start().await;
        let hash = B256::repeat_byte(0x0f);
        rpc.respond(
            "eth_getTransactionReceipt",
            receipt_json(hash, true, Some((MARKETPLACE, 3))),
        )
        .await;
        rpc.respond("eth_blockNumber", json!("0x11")).await;
        let outcome = channel(&rpc)
            .wait_for_confirmation(hash, 2)
            .await
            .unwrap();
        assert_eq!(outcome.purchase_id, Some(U256::from(3u64)));
    }

    #[tokio::test]
    async fn test_node_rejection_is_transport_error() {
        let rpc = RpcMock::start().await;
        rpc.respond("eth_getTransactionCount", json!("0x0")).await;
        rpc.respond("eth_gasPrice", json!("0x17d7840")).await;
        rpc.fail("eth_sendRawTransaction", -32000, "paymaster validation failed")
            .await;
        let err = channel(&rpc)
            .submit(ANVIL_ADDRESS, purchase_call(&config()))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }
}
