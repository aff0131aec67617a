//! The `deworld` command-line client.
//!
//! # Usage
//!
//! ```bash
//! # Connect and show account, network and balance
//! deworld connect
//!
//! # Move the wallet to zkSync Sepolia, adding the chain if needed
//! deworld switch-network
//!
//! # Buy two units of product 7, gas paid in the stablecoin
//! deworld buy 7 --quantity 2 --pay paymaster
//!
//! # Configure logging level
//! RUST_LOG=debug deworld history
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `deworld.toml`)
//! - `WALLET_PRIVATE_KEY` - Wallet key, overriding the configured one
//! - `DEWORLD_INDEXER_URL` - Indexing-service endpoint override
//! - `RUST_LOG` - Log level filter (default: `info`)
//!
//! A `.env` file in the working directory is loaded first.

use std::sync::Arc;

use clap::Parser;
use deworld_cli::App;
use deworld_cli::cli::Cli;
use deworld_cli::config::CliConfig;
use deworld_cli::console::ConsoleNotifier;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("deworld failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::load_from(&cli.config)?;
    if let Some(url) = cli.indexer_url {
        config.indexer_url = url;
    }
    if let Some(key) = cli.private_key {
        config.private_key = key;
    }
    tracing::info!(
        config = %cli.config.display(),
        chain = %config.market.required_chain(),
        indexer = %config.indexer_url,
        "Loaded configuration"
    );

    let app = App::new(config, Arc::new(ConsoleNotifier))?.with_auto_switch(cli.switch);
    app.execute(cli.command).await?;
    Ok(())
}
