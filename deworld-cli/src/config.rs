//! Command-line client configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! indexer_url = "https://api.studio.thegraph.com/query/deworld/v0.0.1"
//! indexer_timeout_secs = 30
//! private_key = "$WALLET_PRIVATE_KEY"
//!
//! [market]
//! marketplace = "0x9c1ab0b6f0e5bd6b3b5fb20b0f3f2e4b5f6a7c80"
//!
//! [market.stablecoin]
//! address = "0x1f4e2f4c6a1a0d0e0b5c7f0a8d4b3e2c1a0f9e8d"
//!
//! [market.paymaster]
//! address = "0x7ee9b2b9f3c0d1c2a8e5f6b4d3c2a1b0f9e8d7c6"
//! ```
//!
//! `[market.chain]` may be omitted, in which case zkSync Sepolia is used.
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `deworld.toml`)
//! - Secrets referenced by `$VAR` in the config file, usually `WALLET_PRIVATE_KEY`

use std::path::{Path, PathBuf};
use std::time::Duration;

use deworld::chain::ChainMetadata;
use deworld::config::MarketConfig;
use deworld_evm::zksync_sepolia;
use serde::{Deserialize, Serialize};
use url::Url;

/// File read when neither `--config` nor `CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "deworld.toml";

/// Errors loading a [`CliConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file does not exist.
    #[error("configuration file {} not found", .0.display())]
    Missing(PathBuf),
    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The TOML is malformed or does not match the expected shape.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The default chain could not be inserted into the document.
    #[error("invalid default chain: {0}")]
    DefaultChain(#[from] toml::ser::Error),
}

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Indexing-service GraphQL endpoint.
    pub indexer_url: Url,

    /// Per-request indexer timeout in seconds (default: 30).
    #[serde(default = "default_indexer_timeout_secs")]
    pub indexer_timeout_secs: u64,

    /// Hex private key of the local wallet (default: `$WALLET_PRIVATE_KEY`).
    #[serde(default = "default_private_key")]
    pub private_key: String,

    /// Chain the local wallet starts on. Defaults to the required chain.
    #[serde(default)]
    pub wallet_chain: Option<ChainMetadata>,

    /// Marketplace deployment.
    pub market: MarketConfig,
}

fn default_private_key() -> String {
    "$WALLET_PRIVATE_KEY".to_owned()
}

const fn default_indexer_timeout_secs() -> u64 {
    30
}

impl CliConfig {
    /// Loads configuration from a specific file path.
    ///
    /// All `$VAR` / `${VAR}` references are expanded from the process
    /// environment before parsing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable or malformed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML document, expanding environment variables first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is malformed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        let mut document: toml::Table = toml::from_str(&expanded)?;
        if let Some(market) = document
            .get_mut("market")
            .and_then(toml::Value::as_table_mut)
            && !market.contains_key("chain")
        {
            market.insert("chain".to_owned(), toml::Value::try_from(zksync_sepolia())?);
        }
        let config: Self = toml::Value::Table(document).try_into()?;
        Ok(config)
    }

    /// The chain the local wallet starts on.
    #[must_use]
    pub fn starting_chain(&self) -> &ChainMetadata {
        self.wallet_chain.as_ref().unwrap_or(&self.market.chain)
    }

    /// Timeout applied to each indexer request.
    #[must_use]
    pub const fn indexer_timeout(&self) -> Duration {
        Duration::from_secs(self.indexer_timeout_secs)
    }

    /// `true` if the private key is still an unexpanded reference or empty.
    #[must_use]
    pub fn private_key_missing(&self) -> bool {
        let key = self.private_key.trim();
        key.is_empty() || key.starts_with('$')
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment variables.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.peek() == Some(&'{');
        if braced {
            chars.next();
        }

        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if braced {
                if c == '}' {
                    chars.next();
                    break;
                }
            } else if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match (name.is_empty(), lookup(&name)) {
            (false, Some(value)) => result.push_str(&value),
            (empty, _) => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                if !empty {
                    result.push_str(&name);
                    if braced {
                        result.push('}');
                    }
                }
            }
        }
    }

    result
}
