//! Error types for the indexing-service client.

use http::StatusCode;

/// Errors that can occur while querying the indexing service.
#[derive(Debug, thiserror::Error)]
pub enum GraphClientError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// The endpoint is not an `http` or `https` URL.
    #[error("unsupported endpoint scheme: {0}")]
    UnsupportedScheme(String),
    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Operation name.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// JSON deserialization error.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Operation name.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status code.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Operation name.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// Failed to read response body.
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        /// Operation name.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The service answered with a GraphQL `errors` list.
    #[error("{context} failed: {}", messages.join("; "))]
    Graph {
        /// Operation name.
        context: &'static str,
        /// Messages reported by the service.
        messages: Vec<String>,
    },
    /// The response had neither `data` nor `errors`.
    #[error("{context} returned no data")]
    MissingData {
        /// Operation name.
        context: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_error_message_joins() {
        let err = GraphClientError::Graph {
            context: "Purchases",
            messages: vec!["bad filter".to_owned(), "timeout".to_owned()],
        };
        assert_eq!(err.to_string(), "Purchases failed: bad filter; timeout");
    }
}
