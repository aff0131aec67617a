//! Command-line arguments.

use std::path::PathBuf;

use alloy_primitives::U256;
use clap::{Parser, Subcommand, ValueEnum};
use deworld::purchase::PurchasePath;
use url::Url;

use crate::config::DEFAULT_CONFIG_PATH;

/// Wallet, balance and purchase commands for the deworld marketplace.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Configuration file.
    #[arg(long, short, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Indexing-service endpoint, overriding `indexer_url`.
    #[arg(long, env = "DEWORLD_INDEXER_URL")]
    pub indexer_url: Option<Url>,

    /// Wallet private key, overriding `private_key`.
    #[arg(long, env = "WALLET_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Switch the wallet to the marketplace chain when it is on another one.
    #[arg(long, global = true)]
    pub switch: bool,

    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,
}

/// A single operation.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Connect the wallet and show account, network and balance.
    Connect,
    /// Switch the wallet to the marketplace chain, adding it if needed.
    SwitchNetwork,
    /// Mint test stablecoin to the wallet.
    Mint,
    /// Show native and stablecoin balances.
    Balance,
    /// List the products of a planet.
    Products {
        /// Marketplace grouping.
        planet: String,
    },
    /// Buy a product.
    Buy {
        /// Product id.
        product: U256,
        /// Units to buy.
        #[arg(long, short, default_value_t = 1)]
        quantity: u64,
        /// Who pays for gas.
        #[arg(long, value_enum, default_value_t = PayWith::Gas)]
        pay: PayWith,
    },
    /// Show purchase history for the wallet, or a single purchase.
    History {
        /// Purchase id.
        #[arg(long)]
        purchase: Option<U256>,
    },
}

/// How gas is paid for a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PayWith {
    /// Native currency from the wallet.
    Gas,
    /// Stablecoin, through the paymaster.
    Paymaster,
}

impl From<PayWith> for PurchasePath {
    fn from(pay: PayWith) -> Self {
        match pay {
            PayWith::Gas => Self::DirectGas,
            PayWith::Paymaster => Self::PaymasterSponsored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_defaults_to_direct_gas() {
        let cli = Cli::try_parse_from(["deworld", "buy", "7"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Buy {
                product: U256::from(7u64),
                quantity: 1,
                pay: PayWith::Gas,
            }
        );
    }

    #[test]
    fn test_buy_with_paymaster() {
        let cli = Cli::try_parse_from([
            "deworld", "buy", "7", "--quantity", "3", "--pay", "paymaster", "--switch",
        ])
        .unwrap();
        let Command::Buy { quantity, pay, .. } = cli.command else {
            panic!("expected buy");
        };
        assert_eq!(quantity, 3);
        assert_eq!(PurchasePath::from(pay), PurchasePath::PaymasterSponsored);
        assert!(cli.switch);
    }

    #[test]
    fn test_history_by_purchase_id() {
        let cli = Cli::try_parse_from(["deworld", "history", "--purchase", "42"]).unwrap();
        assert_eq!(
            cli.command,
            Command::History {
                purchase: Some(U256::from(42u64)),
            }
        );
    }

    #[test]
    fn test_products_requires_planet() {
        assert!(Cli::try_parse_from(["deworld", "products"]).is_err());
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
