//! Indexing-service client for the deworld marketplace.
//!
//! The marketplace contracts are mirrored into a subgraph; this crate
//! queries it for product listings and purchase history.
//!
//! # Modules
//!
//! - [`client`]: [`GraphClient`], implementing the core product and history sources
//! - [`query`]: GraphQL documents and response envelopes
//! - [`error`]: HTTP and GraphQL error types

pub mod client;
pub mod error;
pub mod query;

pub use client::GraphClient;
pub use error::GraphClientError;
