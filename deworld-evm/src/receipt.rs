//! Confirmation waiting.
//!
//! zkSync receipts for `0x71` transactions do not fit alloy's Ethereum
//! receipt envelope, so receipts are fetched raw and only the fields the
//! marketplace needs are decoded.

use std::time::Duration;

use alloy_primitives::{Address, TxHash, U64, U128};
use alloy_provider::Provider;
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use deworld::client::{ClientError, TxOutcome};
use serde::Deserialize;

use crate::contract::IDeworld;

/// Default delay between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

/// Subset of a transaction receipt common to Ethereum and zkSync.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    /// Transaction hash.
    pub transaction_hash: TxHash,
    /// `1` for success, `0` for revert.
    #[serde(default)]
    pub status: Option<U64>,
    /// Gas consumed.
    pub gas_used: U64,
    /// Price actually paid per unit of gas.
    #[serde(default)]
    pub effective_gas_price: Option<U128>,
    /// Block the transaction was included in.
    #[serde(default)]
    pub block_number: Option<U64>,
    /// Emitted logs.
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl RawReceipt {
    /// Whether execution reverted.
    #[must_use]
    pub fn is_reverted(&self) -> bool {
        self.status.is_some_and(|s| s.is_zero())
    }

    /// First `Sale` purchase id emitted by `marketplace`.
    #[must_use]
    pub fn purchase_id(&self, marketplace: Address) -> Option<alloy_primitives::U256> {
        self.logs
            .iter()
            .filter(|log| log.address() == marketplace)
            .find_map(|log| IDeworld::Sale::decode_log_data(log.data()).ok())
            .map(|sale| sale.purchaseId)
    }

    /// Normalizes into a [`TxOutcome`].
    #[must_use]
    pub fn into_outcome(self, marketplace: Option<Address>) -> TxOutcome {
        let purchase_id = marketplace.and_then(|m| self.purchase_id(m));
        TxOutcome {
            tx_hash: self.transaction_hash,
            block_number: self.block_number.map(|b| b.to::<u64>()),
            gas_used: self.gas_used.to::<u64>(),
            effective_gas_price: self
                .effective_gas_price
                .map(|p| p.to::<u128>())
                .filter(|p| *p != 0),
            purchase_id,
        }
    }
}

/// Polls for a receipt until it has the requested confirmations.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptPoller {
    timeout: Duration,
    interval: Duration,
    marketplace: Option<Address>,
}

impl ReceiptPoller {
    /// Creates a poller that gives up after `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            interval: DEFAULT_POLL_INTERVAL,
            marketplace: None,
        }
    }

    /// Sets the delay between polls.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Decodes `Sale` events emitted by `marketplace` into the outcome.
    #[must_use]
    pub const fn with_marketplace(mut self, marketplace: Address) -> Self {
        self.marketplace = Some(marketplace);
        self
    }

    /// Waits for `tx_hash` to be mined with at least `confirmations` blocks
    /// (minimum one).
    ///
    /// # Errors
    ///
    /// - [`ClientError::Reverted`] if the receipt reports failure
    /// - [`ClientError::ConfirmationTimeout`] if the deadline passes first
    /// - [`ClientError::Transport`] on RPC failure
    pub async fn wait<P: Provider>(
        &self,
        provider: &P,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> Result<TxOutcome, ClientError> {
        tokio::time::timeout(self.timeout, self.poll(provider, tx_hash, confirmations.max(1)))
            .await
            .map_err(|_| ClientError::ConfirmationTimeout {
                tx_hash,
                timeout: self.timeout,
            })?
    }

    async fn poll<P: Provider>(
        &self,
        provider: &P,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> Result<TxOutcome, ClientError> {
        loop {
            let receipt: Option<RawReceipt> = provider
                .raw_request("eth_getTransactionReceipt".into(), (tx_hash,))
                .await
                .map_err(ClientError::transport)?;
            if let Some(receipt) = receipt {
                if receipt.is_reverted() {
                    return Err(ClientError::Reverted { tx_hash });
                }
                if let Some(mined) = receipt.block_number {
                    let latest = provider
                        .get_block_number()
                        .await
                        .map_err(ClientError::transport)?;
                    let depth = latest.saturating_sub(mined.to::<u64>()) + 1;
                    if depth >= confirmations {
                        return Ok(receipt.into_outcome(self.marketplace));
                    }
                }
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
