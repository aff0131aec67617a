//! Private-key wallet for headless use.
//!
//! [`LocalWallet`] stands in for an injected browser wallet: it owns one
//! signer and a provider per known chain, and answers the same requests an
//! EIP-1193 wallet would. Chains must be added before they can be selected.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock};

use alloy_dyn_abi::TypedData;
use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::{LocalSignerError, PrivateKeySigner};
use alloy_transport::TransportError;
use deworld::chain::{ChainId, ChainMetadata};
use deworld::wallet::{ProviderRpcError, TransactionCall, WalletProvider};
use tokio::sync::broadcast;
use url::Url;

/// Errors constructing a [`LocalWallet`].
#[derive(Debug, thiserror::Error)]
pub enum LocalWalletError {
    /// The private key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidKey(#[from] LocalSignerError),
    /// The chain metadata lists no RPC endpoint.
    #[error("chain {0} has no rpc url")]
    NoRpcUrl(ChainId),
    /// The RPC endpoint is not a valid URL.
    #[error("invalid rpc url: {0}")]
    InvalidRpcUrl(#[from] url::ParseError),
}

/// Single-key wallet backed by alloy providers.
pub struct LocalWallet {
    signer: PrivateKeySigner,
    chains: RwLock<HashMap<ChainId, DynProvider>>,
    active: Mutex<ChainId>,
    changes: broadcast::Sender<ChainId>,
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("address", &self.signer.address())
            .field("active", &self.active_chain())
            .finish_non_exhaustive()
    }
}

impl LocalWallet {
    /// Creates a wallet whose active chain is `chain`.
    ///
    /// # Errors
    ///
    /// Returns an error if `chain` has no usable RPC URL.
    pub fn new(signer: PrivateKeySigner, chain: &ChainMetadata) -> Result<Self, LocalWalletError> {
        let provider = connect(&signer, chain)?;
        let (changes, _) = broadcast::channel(16);
        Ok(Self {
            signer,
            chains: RwLock::new(HashMap::from([(chain.chain_id, provider)])),
            active: Mutex::new(chain.chain_id),
            changes,
        })
    }

    /// Creates a wallet from a hex-encoded private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is malformed or `chain` has no usable RPC URL.
    pub fn from_private_key(key: &str, chain: &ChainMetadata) -> Result<Self, LocalWalletError> {
        let signer: PrivateKeySigner = key.trim().parse()?;
        Self::new(signer, chain)
    }

    /// The signing account.
    #[must_use]
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    fn active_chain(&self) -> ChainId {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn select(&self, chain_id: ChainId) {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = chain_id;
        // No subscribers is fine.
        let _ = self.changes.send(chain_id);
    }

    fn active_provider(&self) -> Result<DynProvider, ProviderRpcError> {
        let chain_id = self.active_chain();
        self.chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&chain_id)
            .cloned()
            .ok_or_else(|| ProviderRpcError::new(ProviderRpcError::DISCONNECTED, "no active chain"))
    }

    fn check_account(&self, from: Address) -> Result<(), ProviderRpcError> {
        if from == self.signer.address() {
            Ok(())
        } else {
            Err(ProviderRpcError::new(
                ProviderRpcError::UNAUTHORIZED,
                format!("account {from} is not managed by this wallet"),
            ))
        }
    }
}

fn connect(signer: &PrivateKeySigner, chain: &ChainMetadata) -> Result<DynProvider, LocalWalletError> {
    let url: Url = chain
        .rpc_urls
        .first()
        .ok_or(LocalWalletError::NoRpcUrl(chain.chain_id))?
        .parse()?;
    #[cfg(feature = "telemetry")]
    tracing::info!(chain = %chain.chain_id, rpc_url = %url, "Using HTTP transport");
    Ok(ProviderBuilder::new()
        .wallet(EthereumWallet::from(signer.clone()))
        .connect_http(url)
        .erased())
}

/// Surfaces a JSON-RPC error object as a wallet error, keeping its code.
fn rpc_error(err: &TransportError) -> ProviderRpcError {
    err.as_error_resp().map_or_else(
        || ProviderRpcError::new(ProviderRpcError::DISCONNECTED, err.to_string()),
        |payload| ProviderRpcError::new(payload.code, payload.message.to_string()),
    )
}

impl WalletProvider for LocalWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderRpcError> {
        Ok(vec![self.signer.address()])
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderRpcError> {
        Ok(self.active_chain())
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), ProviderRpcError> {
        let known = self
            .chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&chain_id);
        if !known {
            return Err(ProviderRpcError::unrecognized_chain(chain_id));
        }
        self.select(chain_id);
        Ok(())
    }

    async fn add_chain(&self, chain: &ChainMetadata) -> Result<(), ProviderRpcError> {
        let provider =
            connect(&self.signer, chain).map_err(|e| ProviderRpcError::internal(e.to_string()))?;
        self.chains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(chain.chain_id, provider);
        self.select(chain.chain_id);
        Ok(())
    }

    fn chain_changes(&self) -> broadcast::Receiver<ChainId> {
        self.changes.subscribe()
    }

    async fn send_transaction(&self, tx: TransactionCall) -> Result<TxHash, ProviderRpcError> {
        self.check_account(tx.from)?;
        let provider = self.active_provider()?;
        let request = TransactionRequest::default()
            .with_from(tx.from)
            .with_to(tx.to)
            .with_input(tx.data)
            .with_value(tx.value);
        let pending = provider
            .send_transaction(request)
            .await
            .map_err(|e| rpc_error(&e))?;
        Ok(*pending.tx_hash())
    }

    async fn sign_typed_data(
        &self,
        from: Address,
        typed_data: &serde_json::Value,
    ) -> Result<Bytes, ProviderRpcError> {
        self.check_account(from)?;
        let typed: TypedData = serde_json::from_value(typed_data.clone())
            .map_err(|e| ProviderRpcError::internal(format!("invalid typed data: {e}")))?;
        let hash = typed
            .eip712_signing_hash()
            .map_err(|e| ProviderRpcError::internal(format!("invalid typed data: {e}")))?;
        let signature = self
            .signer
            .sign_hash(&hash)
            .await
            .map_err(|e| ProviderRpcError::internal(e.to_string()))?;
        Ok(Bytes::from(signature.as_bytes().to_vec()))
    }
}
