//! In-memory doubles for the wallet, the chain and the indexing service.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use alloy_primitives::{Address, Bytes, TxHash, U256};
use tokio::sync::broadcast;

use crate::chain::{ChainId, ChainMetadata, NativeCurrency};
use crate::client::{ClientError, ContractCall, MarketClient, SponsoredCall, SponsoredChannel, TxOutcome};
use crate::config::{MarketConfig, PaymasterConfig, TokenConfig};
use crate::error::QueryError;
use crate::history::{HistoryFilter, HistorySource};
use crate::market::{Product, Purchase};
use crate::notify::{Notice, Notifier};
use crate::session::SessionManager;
use crate::wallet::{ProviderRpcError, TransactionCall, WalletProvider};

pub(crate) const MINT_AMOUNT: u64 = 100_000_000;

pub(crate) fn zksync_sepolia() -> ChainMetadata {
    ChainMetadata {
        chain_id: ChainId::new(300),
        chain_name: "zkSync Sepolia".into(),
        native_currency: NativeCurrency {
            name: "Ether".into(),
            symbol: "ETH".into(),
            decimals: 18,
        },
        rpc_urls: vec!["https://sepolia.era.zksync.dev".into()],
        block_explorer_urls: vec!["https://sepolia.explorer.zksync.io".into()],
    }
}

pub(crate) fn token_config() -> TokenConfig {
    TokenConfig {
        address: Address::repeat_byte(0x11),
        symbol: "mUSDT".into(),
        decimals: 6,
    }
}

pub(crate) fn market_config() -> MarketConfig {
    MarketConfig {
        chain: zksync_sepolia(),
        stablecoin: token_config(),
        marketplace: Address::repeat_byte(0x22),
        paymaster: PaymasterConfig::new(Address::repeat_byte(0x33)),
        confirmations: 1,
        confirmation_timeout_secs: 120,
    }
}

pub(crate) fn product(price: u64, quantity: u64, sales: u64) -> Product {
    Product {
        id: U256::from(1u64),
        name: "Moon rock".into(),
        price: U256::from(price),
        quantity,
        sales,
        seller: Some(Address::repeat_byte(0x44)),
        product_image: None,
    }
}

pub(crate) fn purchase(id: u64) -> Purchase {
    Purchase {
        id: U256::from(id),
        amount: 1,
        is_delivered: false,
        is_refunded: false,
        is_released: false,
        timestamp: Some(1_700_000_000 + id),
        product: product(10_000_000, 5, 0),
        buyer: None,
    }
}

/// A session over `wallet` whose client factory hands out clones of one fake market.
pub(crate) fn session(
    wallet: &Arc<FakeWallet>,
) -> (
    SessionManager<FakeWallet, FakeMarketClient>,
    FakeMarketClient,
    Arc<RecordingNotifier>,
) {
    session_with(wallet, market_config())
}

/// Like [`session`], over a custom deployment.
pub(crate) fn session_with(
    wallet: &Arc<FakeWallet>,
    config: MarketConfig,
) -> (
    SessionManager<FakeWallet, FakeMarketClient>,
    FakeMarketClient,
    Arc<RecordingNotifier>,
) {
    let client = FakeMarketClient::default();
    let notifier = Arc::new(RecordingNotifier::default());
    let factory_client = client.clone();
    let session = SessionManager::new(
        Arc::clone(wallet),
        config,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        Box::new(move |_| factory_client.clone()),
    );
    (session, client, notifier)
}

#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub(crate) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub(crate) fn last(&self) -> Option<Notice> {
        self.notices.lock().unwrap().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[derive(Debug)]
struct WalletState {
    chain: ChainId,
    known: Vec<ChainId>,
    reject_accounts: Option<ProviderRpcError>,
    reject_switch: Option<ProviderRpcError>,
    reject_add: Option<ProviderRpcError>,
    request_accounts_calls: usize,
    switch_chain_calls: usize,
    add_chain_calls: usize,
    sent: Vec<TransactionCall>,
}

/// A wallet that knows its starting chain plus any chain added to it.
#[derive(Debug)]
pub(crate) struct FakeWallet {
    account: Address,
    state: Mutex<WalletState>,
    changes: broadcast::Sender<ChainId>,
}

impl FakeWallet {
    pub(crate) fn new(chain: ChainId) -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            account: "0xabcd000000000000000000000000000000001234".parse().unwrap(),
            state: Mutex::new(WalletState {
                chain,
                known: vec![chain],
                reject_accounts: None,
                reject_switch: None,
                reject_add: None,
                request_accounts_calls: 0,
                switch_chain_calls: 0,
                add_chain_calls: 0,
                sent: Vec::new(),
            }),
            changes,
        }
    }

    pub(crate) fn with_known_chain(self, chain: ChainId) -> Self {
        self.state.lock().unwrap().known.push(chain);
        self
    }

    pub(crate) const fn account(&self) -> Address {
        self.account
    }

    /// Changes the active chain without emitting `chainChanged`.
    pub(crate) fn set_chain(&self, chain: ChainId) {
        self.state.lock().unwrap().chain = chain;
    }

    /// Switches as if the user picked `chain` in the wallet UI.
    pub(crate) async fn switch_to(&self, chain: ChainId) {
        self.switch_chain(chain).await.unwrap();
    }

    pub(crate) fn reject_next_accounts(&self, err: ProviderRpcError) {
        self.state.lock().unwrap().reject_accounts = Some(err);
    }

    pub(crate) fn reject_next_switch(&self, err: ProviderRpcError) {
        self.state.lock().unwrap().reject_switch = Some(err);
    }

    pub(crate) fn reject_next_add(&self, err: ProviderRpcError) {
        self.state.lock().unwrap().reject_add = Some(err);
    }

    pub(crate) fn request_accounts_calls(&self) -> usize {
        self.state.lock().unwrap().request_accounts_calls
    }

    pub(crate) fn switch_chain_calls(&self) -> usize {
        self.state.lock().unwrap().switch_chain_calls
    }

    pub(crate) fn add_chain_calls(&self) -> usize {
        self.state.lock().unwrap().add_chain_calls
    }
}

impl WalletProvider for FakeWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderRpcError> {
        let mut state = self.state.lock().unwrap();
        state.request_accounts_calls += 1;
        match state.reject_accounts.take() {
            Some(err) => Err(err),
            None => Ok(vec![self.account]),
        }
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderRpcError> {
        Ok(self.state.lock().unwrap().chain)
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), ProviderRpcError> {
        {
            let mut state = self.state.lock().unwrap();
            state.switch_chain_calls += 1;
            if let Some(err) = state.reject_switch.take() {
                return Err(err);
            }
            if !state.known.contains(&chain_id) {
                return Err(ProviderRpcError::unrecognized_chain(chain_id));
            }
            state.chain = chain_id;
        }
        self.changes.send(chain_id).ok();
        Ok(())
    }

    async fn add_chain(&self, chain: &ChainMetadata) -> Result<(), ProviderRpcError> {
        {
            let mut state = self.state.lock().unwrap();
            state.add_chain_calls += 1;
            if let Some(err) = state.reject_add.take() {
                return Err(err);
            }
            state.known.push(chain.chain_id);
            state.chain = chain.chain_id;
        }
        self.changes.send(chain.chain_id).ok();
        Ok(())
    }

    fn chain_changes(&self) -> broadcast::Receiver<ChainId> {
        self.changes.subscribe()
    }

    async fn send_transaction(&self, tx: TransactionCall) -> Result<TxHash, ProviderRpcError> {
        let mut state = self.state.lock().unwrap();
        state.sent.push(tx);
        Ok(TxHash::with_last_byte(u8::try_from(state.sent.len()).unwrap_or(u8::MAX)))
    }

    async fn sign_typed_data(
        &self,
        _from: Address,
        _typed_data: &serde_json::Value,
    ) -> Result<Bytes, ProviderRpcError> {
        Ok(Bytes::from(vec![0u8; 65]))
    }
}

#[derive(Debug, Default)]
struct MarketState {
    token: HashMap<Address, U256>,
    native: HashMap<Address, U256>,
    allowance: U256,
    calls: Vec<String>,
    failing: HashSet<String>,
    fail_reads: bool,
    token_reads: usize,
    purchases: u64,
    txs: u8,
}

impl MarketState {
    fn next_hash(&mut self) -> TxHash {
        self.txs = self.txs.wrapping_add(1);
        TxHash::with_last_byte(self.txs)
    }

    fn outcome(&mut self, effective_gas_price: Option<u128>) -> TxOutcome {
        TxOutcome {
            tx_hash: self.next_hash(),
            block_number: Some(u64::from(self.txs)),
            gas_used: 21_000,
            effective_gas_price,
            purchase_id: None,
        }
    }

    fn check(&mut self, method: &str) -> Result<(), ClientError> {
        if self.failing.contains(method) {
            return Err(ClientError::Reverted {
                tx_hash: self.next_hash(),
            });
        }
        Ok(())
    }

    fn apply_approve(&mut self, amount: U256) {
        self.allowance = amount;
    }

    fn apply_purchase(&mut self, buyer: Address) -> U256 {
        let balance = self.token.entry(buyer).or_default();
        *balance = balance.saturating_sub(self.allowance);
        self.allowance = U256::ZERO;
        self.purchases += 1;
        U256::from(self.purchases)
    }
}

/// A chain in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeMarketClient {
    state: Arc<Mutex<MarketState>>,
}

impl FakeMarketClient {
    pub(crate) fn set_token_balance(&self, owner: Address, amount: U256) {
        self.state.lock().unwrap().token.insert(owner, amount);
    }

    pub(crate) fn set_native_balance(&self, owner: Address, amount: U256) {
        self.state.lock().unwrap().native.insert(owner, amount);
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    /// Makes every subsequent direct call to `method` revert.
    pub(crate) fn fail_call(&self, method: &str) {
        self.state.lock().unwrap().failing.insert(method.to_owned());
    }

    /// Direct-gas writes, in issue order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn token_reads(&self) -> usize {
        self.state.lock().unwrap().token_reads
    }

    pub(crate) fn allowance(&self) -> U256 {
        self.state.lock().unwrap().allowance
    }
}

impl MarketClient for FakeMarketClient {
    async fn token_balance(&self, _token: Address, owner: Address) -> Result<U256, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.token_reads += 1;
        if state.fail_reads {
            return Err(ClientError::InvalidResponse("balanceOf failed".into()));
        }
        Ok(state.token.get(&owner).copied().unwrap_or_default())
    }

    async fn native_balance(&self, owner: Address) -> Result<U256, ClientError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(ClientError::InvalidResponse("eth_getBalance failed".into()));
        }
        Ok(state.native.get(&owner).copied().unwrap_or_default())
    }

    async fn mint(&self, _token: Address, from: Address) -> Result<TxOutcome, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("mint".into());
        state.check("mint")?;
        let balance = state.token.entry(from).or_default();
        *balance += U256::from(MINT_AMOUNT);
        Ok(state.outcome(Some(100_000_000)))
    }

    async fn approve(
        &self,
        _token: Address,
        _from: Address,
        _spender: Address,
        amount: U256,
    ) -> Result<TxOutcome, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("approve".into());
        state.check("approve")?;
        state.apply_approve(amount);
        Ok(state.outcome(Some(100_000_000)))
    }

    async fn purchase_product(
        &self,
        _marketplace: Address,
        from: Address,
        _product_id: U256,
        _quantity: u64,
    ) -> Result<TxOutcome, ClientError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("purchaseProduct".into());
        state.check("purchaseProduct")?;
        let purchase_id = state.apply_purchase(from);
        let mut outcome = state.outcome(Some(100_000_000));
        outcome.purchase_id = Some(purchase_id);
        Ok(outcome)
    }
}

/// A sponsored channel over a [`FakeMarketClient`]'s state. Receipts carry no
/// effective gas price.
#[derive(Debug)]
pub(crate) struct FakeSponsoredChannel {
    market: FakeMarketClient,
    log: Mutex<Vec<String>>,
    calls: Mutex<Vec<SponsoredCall>>,
    confirmations: Mutex<Vec<u64>>,
    pending: Mutex<HashMap<TxHash, TxOutcome>>,
}

impl FakeSponsoredChannel {
    pub(crate) fn new(market: FakeMarketClient) -> Self {
        Self {
            market,
            log: Mutex::default(),
            calls: Mutex::default(),
            confirmations: Mutex::default(),
            pending: Mutex::default(),
        }
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> Vec<SponsoredCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Confirmation counts passed to each wait, in order.
    pub(crate) fn confirmations(&self) -> Vec<u64> {
        self.confirmations.lock().unwrap().clone()
    }
}

impl SponsoredChannel for FakeSponsoredChannel {
    async fn submit(&self, from: Address, call: SponsoredCall) -> Result<TxHash, ClientError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("submit {}", call.call.method()));
        let mut state = self.market.state.lock().unwrap();
        let purchase_id = match call.call {
            ContractCall::Approve { amount, .. } => {
                state.apply_approve(amount);
                None
            }
            ContractCall::PurchaseProduct { .. } => Some(state.apply_purchase(from)),
        };
        let mut outcome = state.outcome(None);
        outcome.purchase_id = purchase_id;
        let tx_hash = outcome.tx_hash;
        self.pending.lock().unwrap().insert(tx_hash, outcome);
        self.calls.lock().unwrap().push(call);
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> Result<TxOutcome, ClientError> {
        self.log.lock().unwrap().push("wait".into());
        self.confirmations.lock().unwrap().push(confirmations);
        self.pending
            .lock()
            .unwrap()
            .remove(&tx_hash)
            .ok_or_else(|| ClientError::InvalidResponse(format!("unknown transaction {tx_hash}")))
    }
}

#[derive(Debug, Default)]
struct HistoryState {
    purchases: Vec<Purchase>,
    failure: Option<String>,
    filters: Vec<HistoryFilter>,
}

/// An indexing service answering from a fixed list. Clones share state.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeHistory {
    state: Arc<Mutex<HistoryState>>,
}

impl FakeHistory {
    pub(crate) fn with(purchases: Vec<Purchase>) -> Self {
        let history = Self::default();
        history.state.lock().unwrap().purchases = purchases;
        history
    }

    pub(crate) fn failing(message: &str) -> Self {
        let history = Self::default();
        history.state.lock().unwrap().failure = Some(message.to_owned());
        history
    }

    pub(crate) fn filters(&self) -> Vec<HistoryFilter> {
        self.state.lock().unwrap().filters.clone()
    }
}

impl HistorySource for FakeHistory {
    async fn purchases(&self, filter: HistoryFilter) -> Result<Vec<Purchase>, QueryError> {
        let mut state = self.state.lock().unwrap();
        state.filters.push(filter);
        if let Some(message) = &state.failure {
            return Err(QueryError::new(message.clone()));
        }
        Ok(match filter {
            HistoryFilter::Account(_) => state.purchases.clone(),
            HistoryFilter::PurchaseId(id) => state
                .purchases
                .iter()
                .filter(|p| p.id == id)
                .cloned()
                .collect(),
        })
    }
}
