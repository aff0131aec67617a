//! Command-line client for the deworld marketplace.
//!
//! Drives a private-key wallet through the same connect, network-switch,
//! balance and purchase flow a browser wallet would go through, and reads
//! products and purchase history from the indexing service.
//!
//! # Modules
//!
//! - [`cli`] - Command-line arguments
//! - [`config`] - TOML configuration with environment variable expansion
//! - [`app`] - Client wiring and command execution
//! - [`console`] - Notice printing and result rendering
//! - [`error`] - Command errors

pub mod app;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;

pub use app::App;
pub use error::CliError;
