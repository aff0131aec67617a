//! Error types for the command-line client.

use alloy_primitives::U256;
use deworld::chain::ChainId;
use deworld_evm::wallet::LocalWalletError;
use deworld_graph::GraphClientError;

use crate::config::ConfigError;

/// Errors that end a command.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No private key was configured or the `$VAR` reference did not resolve.
    #[error("wallet private key is not set (export WALLET_PRIVATE_KEY or pass --private-key)")]
    MissingPrivateKey,

    /// The local wallet could not be created.
    #[error(transparent)]
    Wallet(#[from] LocalWalletError),

    /// The required chain lists no RPC endpoint.
    #[error("chain {0} has no rpc url")]
    NoRpcUrl(ChainId),

    /// An RPC endpoint is not a valid URL.
    #[error("invalid rpc url: {0}")]
    InvalidRpcUrl(#[from] url::ParseError),

    /// The indexing service request failed.
    #[error(transparent)]
    Indexer(#[from] GraphClientError),

    /// A session, purchase or history operation failed.
    #[error(transparent)]
    Market(#[from] deworld::Error),

    /// The indexing service has no product with this id.
    #[error("product {0} not found")]
    ProductNotFound(U256),
}
