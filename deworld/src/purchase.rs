//! Dual-path purchase orchestration.
//!
//! A purchase is always two transactions: an `approve` granting the
//! marketplace `price × quantity` of the stablecoin, then `purchaseProduct`.
//! The second is never issued before the first is confirmed, and a failed
//! purchase leaves the approval in place.
//!
//! [`PurchasePath::DirectGas`] pays gas from the account's native balance
//! through the session's [`MarketClient`]. [`PurchasePath::PaymasterSponsored`]
//! routes both calls through a [`SponsoredChannel`] that pays gas in the
//! stablecoin and waits for the configured number of confirmations.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::{Address, U256};

use crate::amount::{INLINE_PRECISION, TABLE_PRECISION, format_units_fixed};
use crate::balance::BalanceSnapshot;
use crate::chain::NativeCurrency;
use crate::client::{ClientError, ContractCall, MarketClient, SponsoredCall, SponsoredChannel, TxOutcome};
use crate::error::{Error, PurchaseError};
use crate::market::Product;
use crate::notify::{Notice, NoticeId, Notifier};
use crate::session::SessionManager;
use crate::wallet::WalletProvider;

/// Gas price assumed when a receipt does not report the effective one: 10 gwei.
pub const FALLBACK_GAS_PRICE_WEI: u128 = 10_000_000_000;

/// How gas is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PurchasePath {
    /// Gas paid in the native currency by the buyer.
    DirectGas,
    /// Gas paid in the stablecoin through the paymaster.
    PaymasterSponsored,
}

impl fmt::Display for PurchasePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DirectGas => "direct gas",
            Self::PaymasterSponsored => "paymaster sponsored",
        })
    }
}

/// One of the two transactions of a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PurchaseStep {
    /// Stablecoin `approve`.
    Approve,
    /// Marketplace `purchaseProduct`.
    Purchase,
}

impl fmt::Display for PurchaseStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Approve => "approval",
            Self::Purchase => "purchase",
        })
    }
}

/// Gas paid across a purchase, in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPaid {
    /// Total cost in the native currency's smallest unit.
    pub wei: U256,
    /// `true` if any step used [`FALLBACK_GAS_PRICE_WEI`] instead of a reported price.
    pub estimated: bool,
}

impl GasPaid {
    /// Renders the cost in the native display unit, e.g. `"0.000210 ETH"`,
    /// prefixed with `~` when estimated.
    #[must_use]
    pub fn display(&self, native: &NativeCurrency) -> String {
        let amount = format_units_fixed(self.wei, native.decimals, TABLE_PRECISION);
        let prefix = if self.estimated { "~" } else { "" };
        format!("{prefix}{amount} {}", native.symbol)
    }
}

/// Sums `gas_used × effective_gas_price` over `outcomes`, substituting
/// `fallback_gas_price` where a receipt reported no price.
#[must_use]
pub fn gas_paid(outcomes: &[&TxOutcome], fallback_gas_price: u128) -> GasPaid {
    outcomes.iter().fold(
        GasPaid {
            wei: U256::ZERO,
            estimated: false,
        },
        |acc, outcome| {
            let price = outcome.effective_gas_price.unwrap_or(fallback_gas_price);
            GasPaid {
                wei: acc
                    .wei
                    .saturating_add(U256::from(outcome.gas_used).saturating_mul(U256::from(price))),
                estimated: acc.estimated || outcome.effective_gas_price.is_none(),
            }
        },
    )
}

/// Everything the details view needs after a purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseResult {
    /// Path used.
    pub path: PurchasePath,
    /// Product bought.
    pub product: Product,
    /// Units bought.
    pub quantity: u64,
    /// `price × quantity`, in the stablecoin's smallest unit.
    pub total: U256,
    /// The `approve` transaction.
    pub approval: TxOutcome,
    /// The `purchaseProduct` transaction.
    pub receipt: TxOutcome,
    /// Gas across both transactions.
    pub gas_paid: GasPaid,
    /// Purchase id from the marketplace `Sale` event, if the receipt carried it.
    pub purchase_id: Option<U256>,
    /// Balances before the first transaction.
    pub previous_balances: BalanceSnapshot,
    /// Balances re-read after the purchase. `None` if that read failed.
    pub new_balances: Option<BalanceSnapshot>,
}

/// Executes purchases for a session.
pub struct PurchaseOrchestrator<W, C, S> {
    session: Arc<SessionManager<W, C>>,
    sponsored: Arc<S>,
}

impl<W, C, S> fmt::Debug for PurchaseOrchestrator<W, C, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurchaseOrchestrator")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl<W, C, S> PurchaseOrchestrator<W, C, S>
where
    W: WalletProvider + 'static,
    C: MarketClient + 'static,
    S: SponsoredChannel,
{
    /// Creates an orchestrator bound to `session`.
    #[must_use]
    pub const fn new(session: Arc<SessionManager<W, C>>, sponsored: Arc<S>) -> Self {
        Self { session, sponsored }
    }

    /// Buys `quantity` units of `product` via `path`.
    ///
    /// When the session is not connected this fails immediately and starts a
    /// connection attempt in the background.
    ///
    /// # Errors
    ///
    /// - [`Error::WalletNotConnected`] or [`Error::WrongNetwork`] before any call.
    /// - [`Error::Purchase`] for an invalid quantity, or when a step fails.
    /// - [`Error::Rpc`] if the pre-purchase balance read fails.
    pub async fn buy(&self, path: PurchasePath, product: &Product, quantity: u64) -> Result<PurchaseResult, Error> {
        let notifier = self.session.notifier();
        let ready = self.session.ready();
        let (account, client) = match ready {
            Ok(ready) => ready,
            Err(err) => {
                if matches!(err, Error::WalletNotConnected) {
                    let session = Arc::clone(&self.session);
                    tokio::spawn(async move {
                        // Outcome is reported through the session's notices.
                        session.connect().await.ok();
                    });
                    notifier.notify(Notice::error("Please connect your wallet first."));
                } else {
                    notifier.notify(Notice::error(format!("Cannot purchase: {err}")));
                }
                return Err(err);
            }
        };

        let total = match check_quantity(product, quantity)
            .and_then(|()| product.total(quantity).map_err(PurchaseError::from))
        {
            Ok(total) => total,
            Err(err) => {
                notifier.notify(Notice::error(format!("Cannot purchase: {err}")));
                return Err(err.into());
            }
        };

        let previous_balances = self
            .session
            .balance_reader()
            .snapshot(&*client, account)
            .await
            .inspect_err(|err| {
                notifier.notify(Notice::error(format!("Failed to fetch balance: {err}")));
            })?;

        let config = self.session.config();
        let loading = Notice::loading(format!(
            "Approving {} {}...",
            format_units_fixed(total, config.stablecoin.decimals, INLINE_PRECISION),
            config.stablecoin.symbol
        ));
        let id = loading.id;
        notifier.notify(loading);

        #[cfg(feature = "telemetry")]
        tracing::info!(%account, product = %product.id, quantity, %path, "starting purchase");

        let steps = match path {
            PurchasePath::DirectGas => self.direct(&*client, account, product.id, quantity, total, id).await,
            PurchasePath::PaymasterSponsored => self.sponsored(account, product.id, quantity, total, id).await,
        };
        let (approval, receipt) = match steps {
            Ok(steps) => steps,
            Err(err) => {
                notifier.notify(Notice::error(format!("Purchase failed: {err}")).replacing(id));
                return Err(err.into());
            }
        };

        let gas_paid = gas_paid(&[&approval, &receipt], FALLBACK_GAS_PRICE_WEI);
        let link = config
            .chain
            .explorer_tx_url(&receipt.tx_hash)
            .unwrap_or_else(|| receipt.tx_hash.to_string());
        notifier.notify(
            Notice::success(format!(
                "Purchased {quantity} x {} (gas {}): {link}",
                product.name,
                gas_paid.display(&config.chain.native_currency)
            ))
            .replacing(id),
        );

        let new_balances = self
            .session
            .refresh_snapshot()
            .await
            .inspect_err(|err| {
                notifier.notify(Notice::error(format!("Failed to fetch balance: {err}")));
            })
            .ok();

        Ok(PurchaseResult {
            path,
            product: product.clone(),
            quantity,
            total,
            purchase_id: receipt.purchase_id,
            approval,
            receipt,
            gas_paid,
            previous_balances,
            new_balances,
        })
    }

    async fn direct(
        &self,
        client: &C,
        account: Address,
        product_id: U256,
        quantity: u64,
        total: U256,
        notice: NoticeId,
    ) -> Result<(TxOutcome, TxOutcome), PurchaseError> {
        let config = self.session.config();
        let approval = client
            .approve(config.stablecoin.address, account, config.marketplace, total)
            .await
            .map_err(step_failed(PurchaseStep::Approve))?;

        self.session
            .notifier()
            .notify(Notice::loading("Purchasing...").replacing(notice));
        let receipt = client
            .purchase_product(config.marketplace, account, product_id, quantity)
            .await
            .map_err(step_failed(PurchaseStep::Purchase))?;
        Ok((approval, receipt))
    }

    async fn sponsored(
        &self,
        account: Address,
        product_id: U256,
        quantity: u64,
        total: U256,
        notice: NoticeId,
    ) -> Result<(TxOutcome, TxOutcome), PurchaseError> {
        let config = self.session.config();
        let approval = self
            .submit_and_wait(
                account,
                SponsoredCall {
                    target: config.stablecoin.address,
                    call: ContractCall::Approve {
                        spender: config.marketplace,
                        amount: total,
                    },
                    sponsorship: config.sponsorship(),
                },
            )
            .await
            .map_err(step_failed(PurchaseStep::Approve))?;

        self.session
            .notifier()
            .notify(Notice::loading("Purchasing with paymaster...").replacing(notice));
        let receipt = self
            .submit_and_wait(
                account,
                SponsoredCall {
                    target: config.marketplace,
                    call: ContractCall::PurchaseProduct {
                        product_id,
                        quantity,
                    },
                    sponsorship: config.sponsorship(),
                },
            )
            .await
            .map_err(step_failed(PurchaseStep::Purchase))?;
        Ok((approval, receipt))
    }

    async fn submit_and_wait(&self, from: Address, call: SponsoredCall) -> Result<TxOutcome, ClientError> {
        let tx_hash = self.sponsored.submit(from, call).await?;
        self.sponsored
            .wait_for_confirmation(tx_hash, self.session.config().confirmations)
            .await
    }
}

fn check_quantity(product: &Product, quantity: u64) -> Result<(), PurchaseError> {
    if quantity == 0 {
        return Err(PurchaseError::ZeroQuantity);
    }
    if quantity > product.available() {
        return Err(PurchaseError::InsufficientStock {
            product: product.id,
            available: product.available(),
            requested: quantity,
        });
    }
    Ok(())
}

fn step_failed(step: PurchaseStep) -> impl FnOnce(ClientError) -> PurchaseError {
    move |source| PurchaseError::Step { step, source }
}
