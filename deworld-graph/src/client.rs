//! A client for the marketplace's GraphQL indexing service.
//!
//! [`GraphClient`] posts named operations with variables to a single
//! endpoint and implements the core [`ProductSource`] and [`HistorySource`]
//! traits on top of them.
//!
//! ## Error Handling
//!
//! [`GraphClientError`] captures
//! - URL construction
//! - HTTP transport failures
//! - JSON deserialization errors
//! - Unexpected HTTP status responses
//! - GraphQL `errors` lists and responses without `data`

use std::fmt::Display;
use std::time::Duration;

use alloy_primitives::U256;
use deworld::error::QueryError;
use deworld::history::{HistoryFilter, HistorySource, ProductSource};
use deworld::market::{Product, Purchase};
use http::StatusCode;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

use crate::error::GraphClientError;
use crate::query::{
    ACCOUNT_PURCHASES, GraphRequest, GraphResponse, PRODUCT, PRODUCTS, PURCHASE, ProductData,
    ProductsData, PurchasesData,
};

/// Indexing-service client.
#[derive(Clone, Debug)]
pub struct GraphClient {
    /// GraphQL endpoint.
    url: Url,
    /// Shared Reqwest HTTP client.
    client: Client,
    /// Optional request timeout.
    timeout: Option<Duration>,
}

impl GraphClient {
    /// Constructs a client for the GraphQL endpoint at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphClientError::UnsupportedScheme`] unless `url` is
    /// `http` or `https`.
    pub fn try_new(url: Url) -> Result<Self, GraphClientError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(GraphClientError::UnsupportedScheme(url.scheme().to_owned()));
        }
        Ok(Self {
            url,
            client: Client::new(),
            timeout: None,
        })
    }

    /// Returns the endpoint URL.
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Sets a timeout for all future requests.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Lists the products under `planet`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphClientError`] if the request or the operation fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "deworld.graph.products", skip(self), err)
    )]
    pub async fn products(&self, planet: &str) -> Result<Vec<Product>, GraphClientError> {
        let data: ProductsData = self
            .execute("Products", PRODUCTS, json!({ "planet": planet }))
            .await?;
        Ok(data.products)
    }

    /// Fetches one product, `None` if the service does not know it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphClientError`] if the request or the operation fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "deworld.graph.product", skip(self), err)
    )]
    pub async fn product(&self, id: U256) -> Result<Option<Product>, GraphClientError> {
        let data: ProductData = self
            .execute("Product", PRODUCT, json!({ "id": id.to_string() }))
            .await?;
        Ok(data.product)
    }

    /// Fetches purchases matching `filter`.
    ///
    /// Buyer addresses are sent lowercase, which is how the subgraph
    /// stores them.
    ///
    /// # Errors
    ///
    /// Returns [`GraphClientError`] if the request or the operation fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "deworld.graph.purchases", skip(self), err)
    )]
    pub async fn purchases(&self, filter: HistoryFilter) -> Result<Vec<Purchase>, GraphClientError> {
        let data: PurchasesData = match filter {
            HistoryFilter::Account(buyer) => {
                self.execute(
                    "AccountPurchases",
                    ACCOUNT_PURCHASES,
                    json!({ "buyer": buyer.to_string().to_lowercase() }),
                )
                .await?
            }
            HistoryFilter::PurchaseId(id) => {
                self.execute("Purchase", PURCHASE, json!({ "id": id.to_string() }))
                    .await?
            }
        };
        Ok(data.purchases)
    }

    /// Runs one named operation and unwraps its `data`.
    async fn execute<V, R>(
        &self,
        operation_name: &'static str,
        document: &'static str,
        variables: V,
    ) -> Result<R, GraphClientError>
    where
        V: Serialize + Sync,
        R: DeserializeOwned,
    {
        let request = GraphRequest {
            query: document,
            operation_name,
            variables,
        };
        let response: GraphResponse<R> = self.post_json(operation_name, &request).await?;
        if !response.errors.is_empty() {
            let err = GraphClientError::Graph {
                context: operation_name,
                messages: response.errors.into_iter().map(|e| e.message).collect(),
            };
            #[cfg(feature = "telemetry")]
            tracing::warn!(error = %err, "indexing service reported errors");
            return Err(err);
        }
        response.data.ok_or(GraphClientError::MissingData {
            context: operation_name,
        })
    }

    /// POST helper that handles JSON serialization, error mapping,
    /// timeout application, and telemetry integration.
    async fn post_json<T, R>(&self, context: &'static str, payload: &T) -> Result<R, GraphClientError>
    where
        T: Serialize + Sync + ?Sized,
        R: DeserializeOwned,
    {
        let mut req = self.client.post(self.url.clone()).json(payload);
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| GraphClientError::Http { context, source: e })?;

        let result = if http_response.status() == StatusCode::OK {
            http_response
                .json::<R>()
                .await
                .map_err(|e| GraphClientError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| GraphClientError::ResponseBodyRead { context, source: e })?;
            Err(GraphClientError::HttpStatus {
                context,
                status,
                body,
            })
        };

        record_result_on_span(&result);

        result
    }
}

impl ProductSource for GraphClient {
    async fn products(&self, planet: &str) -> Result<Vec<Product>, QueryError> {
        Self::products(self, planet).await.map_err(QueryError::new)
    }

    async fn product(&self, id: U256) -> Result<Option<Product>, QueryError> {
        Self::product(self, id).await.map_err(QueryError::new)
    }
}

impl HistorySource for GraphClient {
    async fn purchases(&self, filter: HistoryFilter) -> Result<Vec<Purchase>, QueryError> {
        Self::purchases(self, filter).await.map_err(QueryError::new)
    }
}

/// Parses an endpoint string into a [`GraphClient`].
impl TryFrom<&str> for GraphClient {
    type Error = GraphClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let url = Url::parse(value.trim()).map_err(|e| GraphClientError::UrlParse {
            context: "Failed to parse indexer url",
            source: e,
        })?;
        Self::try_new(url)
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            span.record("error.message", tracing::field::display(err));
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to indexer failed");
        }
    }
}

/// Noop if telemetry feature is off.
#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}
