//! Known network configurations.

use deworld::chain::{ChainId, ChainMetadata, NativeCurrency};

/// zkSync Sepolia (testnet) chain ID.
pub const ZKSYNC_SEPOLIA: ChainId = ChainId::new(300);

/// Public zkSync Sepolia JSON-RPC endpoint.
pub const ZKSYNC_SEPOLIA_RPC: &str = "https://sepolia.era.zksync.dev";

/// zkSync Sepolia block explorer.
pub const ZKSYNC_SEPOLIA_EXPLORER: &str = "https://sepolia.explorer.zksync.io";

/// Default `gasPerPubdataByteLimit` for EIP-712 transactions on zkSync.
pub const DEFAULT_GAS_PER_PUBDATA: u64 = 50_000;

/// Returns the metadata used to add zkSync Sepolia to a wallet.
#[must_use]
pub fn zksync_sepolia() -> ChainMetadata {
    ChainMetadata {
        chain_id: ZKSYNC_SEPOLIA,
        chain_name: "zkSync Sepolia Testnet".to_owned(),
        native_currency: NativeCurrency {
            name: "Ether".to_owned(),
            symbol: "ETH".to_owned(),
            decimals: 18,
        },
        rpc_urls: vec![ZKSYNC_SEPOLIA_RPC.to_owned()],
        block_explorer_urls: vec![ZKSYNC_SEPOLIA_EXPLORER.to_owned()],
    }
}
