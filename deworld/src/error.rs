//! Error types for the marketplace session.
//!
//! Every error here is caught at an operation boundary and turned into a
//! notice; none is fatal to the process.

use alloy_primitives::U256;

use crate::amount::AmountError;
use crate::chain::ChainId;
use crate::client::{BoxError, ClientError};
use crate::purchase::PurchaseStep;
use crate::wallet::ProviderRpcError;

/// Top-level error for session, balance, purchase and history operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No wallet provider is available in the host environment.
    #[error("no wallet provider detected")]
    ProviderMissing,

    /// The provider is present but failed the request.
    #[error("wallet provider unavailable: {0}")]
    ProviderUnavailable(#[source] ProviderRpcError),

    /// The user declined a wallet prompt.
    #[error("request rejected by user")]
    UserRejected(#[source] ProviderRpcError),

    /// The wallet does not know the required chain and adding it failed.
    #[error("chain {0} is not recognized by the wallet")]
    ChainUnrecognized(ChainId),

    /// A contract read or write failed.
    #[error("rpc error: {0}")]
    Rpc(#[from] ClientError),

    /// The operation needs a connected session.
    #[error("wallet not connected")]
    WalletNotConnected,

    /// The wallet is on the wrong chain.
    #[error("wrong network: expected {expected}, wallet is on {}", observed.map_or_else(|| "an unknown chain".to_owned(), |c| c.to_string()))]
    WrongNetwork {
        /// The required chain.
        expected: ChainId,
        /// The chain the wallet reported, if any.
        observed: Option<ChainId>,
    },

    /// A purchase failed.
    #[error(transparent)]
    Purchase(#[from] PurchaseError),

    /// The indexing service could not be queried.
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl Error {
    /// Classifies a provider error, separating user rejections from other failures.
    #[must_use]
    pub fn from_provider(err: ProviderRpcError) -> Self {
        if err.is_user_rejected() {
            Self::UserRejected(err)
        } else {
            Self::ProviderUnavailable(err)
        }
    }
}

/// Why a purchase did not complete.
#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    /// A purchase of zero units was requested.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// More units were requested than are available.
    #[error("product {product} has {available} units available, {requested} requested")]
    InsufficientStock {
        /// Product identifier.
        product: U256,
        /// Units currently available.
        available: u64,
        /// Units requested.
        requested: u64,
    },

    /// The purchase total could not be computed.
    #[error(transparent)]
    Amount(#[from] AmountError),

    /// A transaction step failed. Earlier steps are not rolled back.
    #[error("{step} failed: {source}")]
    Step {
        /// The step that failed.
        step: PurchaseStep,
        /// Proximate cause.
        #[source]
        source: ClientError,
    },
}

impl PurchaseError {
    /// The failing step, if the purchase got as far as submitting transactions.
    #[must_use]
    pub const fn step(&self) -> Option<PurchaseStep> {
        match self {
            Self::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// The indexing service request failed.
#[derive(Debug, thiserror::Error)]
#[error("indexing service query failed: {source}")]
pub struct QueryError {
    #[source]
    source: BoxError,
}

impl QueryError {
    /// Wraps an indexing-service failure.
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }
}
