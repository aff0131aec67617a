//! Indexing-service reads: the product catalogue and purchase history.
//!
//! Results are one-shot snapshots. An empty list is a valid answer and is
//! kept distinct from a failed query.

use std::future::Future;
use std::sync::Arc;

use alloy_primitives::{Address, U256};

use crate::error::{Error, QueryError};
use crate::market::{Product, Purchase};
use crate::notify::{Notice, Notifier};

/// Which purchases to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryFilter {
    /// All purchases made by an account, most recent first.
    Account(Address),
    /// A single purchase.
    PurchaseId(U256),
}

/// Source of purchase records.
pub trait HistorySource: Send + Sync {
    /// Fetches purchases matching `filter`.
    fn purchases(
        &self,
        filter: HistoryFilter,
    ) -> impl Future<Output = Result<Vec<Purchase>, QueryError>> + Send;
}

/// Source of product listings.
pub trait ProductSource: Send + Sync {
    /// Lists products under a marketplace grouping.
    fn products(&self, planet: &str)
    -> impl Future<Output = Result<Vec<Product>, QueryError>> + Send;

    /// Fetches a single product, `None` if it does not exist.
    fn product(&self, id: U256) -> impl Future<Output = Result<Option<Product>, QueryError>> + Send;
}

/// Reads purchase history and reports failures as notices.
pub struct HistoryReader<S> {
    source: S,
    notifier: Arc<dyn Notifier>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for HistoryReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryReader")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl<S: HistorySource> HistoryReader<S> {
    /// Creates a reader over `source`.
    #[must_use]
    pub fn new(source: S, notifier: Arc<dyn Notifier>) -> Self {
        Self { source, notifier }
    }

    /// Queries purchases.
    ///
    /// Account queries are ordered by descending purchase id regardless of
    /// the order the service returned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Query`] if the service request fails, after notifying.
    pub async fn query(&self, filter: HistoryFilter) -> Result<Vec<Purchase>, Error> {
        match self.source.purchases(filter).await {
            Ok(mut purchases) => {
                if matches!(filter, HistoryFilter::Account(_)) {
                    purchases.sort_by(|a, b| b.id.cmp(&a.id));
                }
                if purchases.is_empty() {
                    self.notifier.notify(Notice::info("No purchases found."));
                }
                Ok(purchases)
            }
            Err(err) => {
                self.notifier.notify(Notice::error(format!(
                    "Failed to fetch purchase details: {err}"
                )));
                Err(err.into())
            }
        }
    }
}
