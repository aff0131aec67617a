//! The wallet session state machine.
//!
//! ```text
//! Disconnected --connect()--> Connecting --accounts granted--> Connected
//!                                  \------rejected/failed----> ConnectionFailed
//! ```
//!
//! `Connected` persists until [`SessionManager::reset`]. Chain changes do not
//! move the state machine; they recompute the network status and, while
//! connected, refresh the balance on the required chain or clear it elsewhere.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use alloy_primitives::Address;
use tokio::sync::{Mutex as AsyncMutex, broadcast, watch};
use tokio::task::JoinHandle;

use crate::balance::{Balance, BalanceReader, BalanceSnapshot};
use crate::chain::ChainId;
use crate::client::{MarketClient, TxOutcome};
use crate::config::MarketConfig;
use crate::error::Error;
use crate::guard::ChainGuard;
use crate::notify::{Notice, Notifier};
use crate::wallet::{ProviderRpcError, WalletProvider, short_address};

/// Builds the chain client handle once a wallet has been connected.
pub type ClientFactory<W, C> = Box<dyn Fn(Arc<W>) -> C + Send + Sync>;

/// Connection state of a session.
pub enum SessionState<C> {
    /// No connection attempted yet.
    Disconnected,
    /// Waiting for the wallet to grant accounts.
    Connecting,
    /// Account granted and client handle created.
    Connected {
        /// The connected account.
        account: Address,
        /// Client handle bound to the account's wallet.
        client: Arc<C>,
    },
    /// The last attempt was rejected or failed; `connect` may be retried.
    ConnectionFailed,
}

impl<C> SessionState<C> {
    /// The account, when connected.
    #[must_use]
    pub const fn account(&self) -> Option<Address> {
        match self {
            Self::Connected { account, .. } => Some(*account),
            _ => None,
        }
    }

    /// `true` in the `Connected` state.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

impl<C> Clone for SessionState<C> {
    fn clone(&self) -> Self {
        match self {
            Self::Disconnected => Self::Disconnected,
            Self::Connecting => Self::Connecting,
            Self::Connected { account, client } => Self::Connected {
                account: *account,
                client: Arc::clone(client),
            },
            Self::ConnectionFailed => Self::ConnectionFailed,
        }
    }
}

impl<C> fmt::Debug for SessionState<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Connecting => f.write_str("Connecting"),
            Self::Connected { account, .. } => f
                .debug_struct("Connected")
                .field("account", account)
                .finish_non_exhaustive(),
            Self::ConnectionFailed => f.write_str("ConnectionFailed"),
        }
    }
}

/// Owns the connected account and the chain client handle.
pub struct SessionManager<W, C> {
    wallet: Arc<W>,
    guard: ChainGuard<W>,
    balances: BalanceReader,
    config: MarketConfig,
    notifier: Arc<dyn Notifier>,
    make_client: ClientFactory<W, C>,
    client: Mutex<Option<Arc<C>>>,
    state: watch::Sender<SessionState<C>>,
    balance: watch::Sender<Option<Balance>>,
    connecting: AsyncMutex<()>,
}

impl<W, C> fmt::Debug for SessionManager<W, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.state.borrow())
            .field("balance", &*self.balance.borrow())
            .finish_non_exhaustive()
    }
}

impl<W, C> SessionManager<W, C>
where
    W: WalletProvider,
    C: MarketClient,
{
    /// Creates a disconnected session.
    ///
    /// `make_client` runs at most once between resets, on the first
    /// successful connect.
    #[must_use]
    pub fn new(
        wallet: Arc<W>,
        config: MarketConfig,
        notifier: Arc<dyn Notifier>,
        make_client: ClientFactory<W, C>,
    ) -> Self {
        let guard = ChainGuard::new(
            Arc::clone(&wallet),
            config.chain.clone(),
            Arc::clone(&notifier),
        );
        let balances = BalanceReader::new(
            config.stablecoin.clone(),
            config.chain.native_currency.clone(),
        );
        let (state, _) = watch::channel(SessionState::Disconnected);
        let (balance, _) = watch::channel(None);
        Self {
            wallet,
            guard,
            balances,
            config,
            notifier,
            make_client,
            client: Mutex::new(None),
            state,
            balance,
            connecting: AsyncMutex::new(()),
        }
    }

    /// Deployment configuration.
    #[must_use]
    pub const fn config(&self) -> &MarketConfig {
        &self.config
    }

    /// The chain guard.
    #[must_use]
    pub const fn guard(&self) -> &ChainGuard<W> {
        &self.guard
    }

    /// The balance reader.
    #[must_use]
    pub const fn balance_reader(&self) -> &BalanceReader {
        &self.balances
    }

    /// The notice sink.
    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        &*self.notifier
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState<C> {
        self.state.borrow().clone()
    }

    /// Subscribes to state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState<C>> {
        self.state.subscribe()
    }

    /// Subscribes to balance updates.
    #[must_use]
    pub fn subscribe_balance(&self) -> watch::Receiver<Option<Balance>> {
        self.balance.subscribe()
    }

    /// The account and client handle, when connected.
    #[must_use]
    pub fn connected(&self) -> Option<(Address, Arc<C>)> {
        match &*self.state.borrow() {
            SessionState::Connected { account, client } => Some((*account, Arc::clone(client))),
            _ => None,
        }
    }

    /// The last fetched stablecoin balance.
    #[must_use]
    pub fn balance(&self) -> Option<Balance> {
        self.balance.borrow().clone()
    }

    fn client_handle(&self) -> Arc<C> {
        let mut slot = self.client.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slot.get_or_insert_with(|| Arc::new((self.make_client)(Arc::clone(&self.wallet)))))
    }

    /// Requests account access and enters `Connected`.
    ///
    /// Calling this while connected, or while another attempt is in flight,
    /// does not prompt the wallet again. On entering `Connected` the network
    /// status is read and, on the required chain, the balance is fetched.
    ///
    /// # Errors
    ///
    /// - [`Error::UserRejected`] if the user declined the prompt.
    /// - [`Error::ProviderUnavailable`] if the wallet failed or granted no account.
    pub async fn connect(&self) -> Result<Address, Error> {
        let _gate = self.connecting.lock().await;
        let current = self.state.borrow().account();
        if let Some(account) = current {
            return Ok(account);
        }

        self.state.send_replace(SessionState::Connecting);
        let loading = Notice::loading("Connecting wallet...");
        let id = loading.id;
        self.notifier.notify(loading);

        let account = match self.wallet.request_accounts().await {
            Ok(accounts) => accounts.first().copied().ok_or_else(|| {
                Error::ProviderUnavailable(ProviderRpcError::new(
                    ProviderRpcError::UNAUTHORIZED,
                    "wallet granted no accounts",
                ))
            }),
            Err(err) => Err(Error::from_provider(err)),
        };
        let account = match account {
            Ok(account) => account,
            Err(err) => {
                self.state.send_replace(SessionState::ConnectionFailed);
                self.notifier
                    .notify(Notice::error(format!("Failed to connect wallet: {err}")).replacing(id));
                return Err(err);
            }
        };

        let client = self.client_handle();
        self.state
            .send_replace(SessionState::Connected { account, client });
        self.notifier.notify(
            Notice::success(format!("Connected {}", short_address(&account))).replacing(id),
        );
        #[cfg(feature = "telemetry")]
        tracing::info!(%account, "wallet connected");

        self.sync_network().await;
        Ok(account)
    }

    /// Reacts to a `chainChanged` notification.
    ///
    /// The chain id is re-read from the wallet rather than trusted from the
    /// notification.
    pub async fn handle_chain_changed(&self, reported: ChainId) {
        #[cfg(feature = "telemetry")]
        tracing::debug!(chain = %reported, "chain changed");
        #[cfg(not(feature = "telemetry"))]
        let _ = reported;
        self.sync_network().await;
    }

    async fn sync_network(&self) {
        match self.guard.refresh().await {
            Ok(status) if status.is_correct() => {
                let connected = self.state.borrow().is_connected();
                if connected {
                    // Failures are already reported by refresh_balance.
                    self.refresh_balance().await.ok();
                }
            }
            Ok(_) => {
                // A balance read on another chain does not describe the marketplace token.
                self.balance.send_replace(None);
                self.notifier.notify(Notice::error(format!(
                    "Wrong network. Please switch to {}.",
                    self.config.chain.chain_name
                )));
            }
            Err(err) => self
                .notifier
                .notify(Notice::error(format!("Failed to read network: {err}"))),
        }
    }

    /// Spawns a task that feeds the wallet's chain-change notifications into
    /// [`Self::handle_chain_changed`] until the wallet drops its sender.
    pub fn watch_chain_changes(self: Arc<Self>) -> JoinHandle<()>
    where
        W: 'static,
        C: 'static,
    {
        let mut changes = self.wallet.chain_changes();
        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(chain) => self.handle_chain_changed(chain).await,
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Fetches the stablecoin balance of the connected account.
    ///
    /// # Errors
    ///
    /// - [`Error::WalletNotConnected`] outside `Connected`.
    /// - [`Error::Rpc`] if the read fails; the previous balance is kept.
    pub async fn refresh_balance(&self) -> Result<Balance, Error> {
        let (account, client) = self.connected().ok_or(Error::WalletNotConnected)?;
        match self.balances.fetch(&*client, account).await {
            Ok(balance) => {
                self.balance.send_replace(Some(balance.clone()));
                Ok(balance)
            }
            Err(err) => {
                self.notifier
                    .notify(Notice::error(format!("Failed to fetch balance: {err}")));
                Err(err)
            }
        }
    }

    /// Fetches native and stablecoin balances, storing the stablecoin one.
    ///
    /// # Errors
    ///
    /// - [`Error::WalletNotConnected`] outside `Connected`.
    /// - [`Error::Rpc`] if a read fails.
    pub async fn refresh_snapshot(&self) -> Result<BalanceSnapshot, Error> {
        let (account, client) = self.connected().ok_or(Error::WalletNotConnected)?;
        let snapshot = self.balances.snapshot(&*client, account).await?;
        self.balance.send_replace(Some(snapshot.token.clone()));
        Ok(snapshot)
    }

    /// The connected account and client, on the required chain.
    ///
    /// # Errors
    ///
    /// - [`Error::WalletNotConnected`] outside `Connected`.
    /// - [`Error::WrongNetwork`] when the wallet is not on the required chain.
    pub fn ready(&self) -> Result<(Address, Arc<C>), Error> {
        let connected = self.connected().ok_or(Error::WalletNotConnected)?;
        let status = self.guard.status();
        if !status.is_correct() {
            return Err(Error::WrongNetwork {
                expected: status.required,
                observed: status.observed,
            });
        }
        Ok(connected)
    }

    /// Mints test stablecoin to the connected account, then refreshes the balance.
    ///
    /// # Errors
    ///
    /// - [`Error::WalletNotConnected`] or [`Error::WrongNetwork`] before any call.
    /// - [`Error::Rpc`] if the mint transaction fails.
    pub async fn mint_stablecoin(&self) -> Result<TxOutcome, Error> {
        let (account, client) = match self.ready() {
            Ok(ready) => ready,
            Err(err) => {
                self.notifier.notify(Notice::error(format!("Cannot mint: {err}")));
                return Err(err);
            }
        };

        let symbol = &self.config.stablecoin.symbol;
        let loading = Notice::loading(format!("Minting {symbol}..."));
        let id = loading.id;
        self.notifier.notify(loading);

        match client.mint(self.config.stablecoin.address, account).await {
            Ok(outcome) => {
                let link = self
                    .config
                    .chain
                    .explorer_tx_url(&outcome.tx_hash)
                    .unwrap_or_else(|| outcome.tx_hash.to_string());
                self.notifier
                    .notify(Notice::success(format!("Minted {symbol}: {link}")).replacing(id));
                // Failures are already reported by refresh_balance.
                self.refresh_balance().await.ok();
                Ok(outcome)
            }
            Err(err) => {
                self.notifier
                    .notify(Notice::error(format!("Mint failed: {err}")).replacing(id));
                Err(err.into())
            }
        }
    }

    /// Drops the account, the client handle and the cached balance.
    pub fn reset(&self) {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.balance.send_replace(None);
        self.state.send_replace(SessionState::Disconnected);
    }
}
