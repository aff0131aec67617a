//! Wires the wallet, session, purchase and indexing clients together and
//! runs one [`Command`] against them.

use std::sync::Arc;

use alloy_primitives::Address;
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use deworld::config::MarketConfig;
use deworld::history::{HistoryFilter, HistoryReader};
use deworld::notify::Notifier;
use deworld::purchase::PurchaseOrchestrator;
use deworld::session::{ClientFactory, SessionManager};
use deworld::wallet::{detect_provider, short_address};
use deworld_evm::{EvmMarketClient, LocalWallet, PaymasterChannel};
use deworld_graph::GraphClient;
use tokio::task::JoinHandle;
use url::Url;

use crate::cli::Command;
use crate::config::CliConfig;
use crate::console::{
    print, render_history, render_network, render_products, render_purchase, render_snapshot,
};
use crate::error::CliError;

/// Direct-gas client bound to the local wallet.
pub type Client = EvmMarketClient<DynProvider, LocalWallet>;

/// Session over the local wallet.
pub type Session = SessionManager<LocalWallet, Client>;

/// Paymaster channel bound to the local wallet.
pub type Channel = PaymasterChannel<DynProvider, LocalWallet>;

/// A configured client, ready to run commands.
#[derive(Debug)]
pub struct App {
    market: MarketConfig,
    session: Arc<Session>,
    orchestrator: PurchaseOrchestrator<LocalWallet, Client, Channel>,
    history: HistoryReader<GraphClient>,
    indexer: GraphClient,
    auto_switch: bool,
    watcher: JoinHandle<()>,
}

impl App {
    /// Builds every client from `config`. No network request is made.
    ///
    /// Must be called inside a tokio runtime: the session starts following
    /// the wallet's chain changes immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the private key is missing or malformed, or if an
    /// endpoint URL is invalid.
    pub fn new(config: CliConfig, notifier: Arc<dyn Notifier>) -> Result<Self, CliError> {
        if config.private_key_missing() {
            return Err(CliError::MissingPrivateKey);
        }
        let injected = LocalWallet::from_private_key(&config.private_key, config.starting_chain())?;
        let wallet = detect_provider(Some(Arc::new(injected)), &*notifier)?;

        let chain = &config.market.chain;
        let rpc_url: Url = chain
            .rpc_urls
            .first()
            .ok_or(CliError::NoRpcUrl(chain.chain_id))?
            .parse()?;
        #[cfg(feature = "telemetry")]
        tracing::info!(chain = %chain.chain_id, rpc_url = %rpc_url, "Using HTTP transport");
        let provider = ProviderBuilder::new().connect_http(rpc_url).erased();

        let indexer =
            GraphClient::try_new(config.indexer_url.clone())?.with_timeout(config.indexer_timeout());
        let history = HistoryReader::new(indexer.clone(), Arc::clone(&notifier));

        let reads = provider.clone();
        let market = config.market.clone();
        let make_client: ClientFactory<LocalWallet, Client> =
            Box::new(move |wallet| EvmMarketClient::new(reads.clone(), wallet, &market));
        let session = Arc::new(SessionManager::new(
            Arc::clone(&wallet),
            config.market.clone(),
            Arc::clone(&notifier),
            make_client,
        ));
        let watcher = Arc::clone(&session).watch_chain_changes();

        let channel = PaymasterChannel::new(provider, wallet, &config.market);
        let orchestrator = PurchaseOrchestrator::new(Arc::clone(&session), Arc::new(channel));

        Ok(Self {
            market: config.market,
            session,
            orchestrator,
            history,
            indexer,
            auto_switch: false,
            watcher,
        })
    }

    /// Switches the wallet to the marketplace chain before commands that need it.
    #[must_use]
    pub fn with_auto_switch(mut self, auto_switch: bool) -> Self {
        self.auto_switch = auto_switch;
        self
    }

    /// The session.
    #[must_use]
    pub const fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Connects the wallet, switching chains first when asked to.
    async fn open(&self) -> Result<Address, CliError> {
        let account = self.session.connect().await?;
        if self.auto_switch && self.session.guard().status().needs_switch() {
            self.switch().await?;
        }
        Ok(account)
    }

    async fn switch(&self) -> Result<(), CliError> {
        let status = self.session.guard().request_switch().await?;
        if status.is_correct() {
            // Failures are already reported as notices.
            self.session.refresh_balance().await.ok();
        }
        Ok(())
    }

    fn print_status(&self, account: Address) {
        print(&format!("account: {} ({account})", short_address(&account)));
        print(&render_network(&self.session.guard().status(), &self.market.chain));
        if let Some(balance) = self.session.balance() {
            print(&format!("balance: {balance}"));
        }
    }

    /// Runs `command`.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error. Failures have already been
    /// reported through the notifier.
    pub async fn execute(&self, command: Command) -> Result<(), CliError> {
        match command {
            Command::Connect => {
                let account = self.open().await?;
                self.print_status(account);
            }
            Command::SwitchNetwork => {
                let account = self.session.connect().await?;
                self.switch().await?;
                self.print_status(account);
            }
            Command::Mint => {
                self.open().await?;
                self.session.mint_stablecoin().await?;
                if let Some(balance) = self.session.balance() {
                    print(&format!("balance: {balance}"));
                }
            }
            Command::Balance => {
                self.open().await?;
                let snapshot = self.session.refresh_snapshot().await?;
                print(&render_snapshot(&snapshot));
            }
            Command::Products { planet } => {
                let products = self.indexer.products(&planet).await?;
                print(&render_products(&products, &self.market.stablecoin));
            }
            Command::Buy {
                product,
                quantity,
                pay,
            } => {
                self.open().await?;
                let listing = self
                    .indexer
                    .product(product)
                    .await?
                    .ok_or(CliError::ProductNotFound(product))?;
                let result = self
                    .orchestrator
                    .buy(pay.into(), &listing, quantity)
                    .await?;
                print(&render_purchase(&result, &self.market.chain, &self.market.stablecoin));
            }
            Command::History { purchase } => {
                let filter = match purchase {
                    Some(id) => HistoryFilter::PurchaseId(id),
                    None => HistoryFilter::Account(self.open().await?),
                };
                let purchases = self.history.query(filter).await?;
                print(&render_history(&purchases, &self.market.stablecoin));
            }
        }
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
