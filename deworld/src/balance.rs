//! Balance reads and their display form.

use std::fmt;

use alloy_primitives::{Address, U256};

use crate::amount::{INLINE_PRECISION, TABLE_PRECISION, format_units_fixed};
use crate::chain::NativeCurrency;
use crate::client::MarketClient;
use crate::config::TokenConfig;
use crate::error::Error;

/// A token amount held by an account, with what is needed to display it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    raw: U256,
    decimals: u8,
    symbol: String,
}

impl Balance {
    /// Creates a balance from its raw smallest-unit value.
    #[must_use]
    pub fn new(raw: U256, decimals: u8, symbol: impl Into<String>) -> Self {
        Self {
            raw,
            decimals,
            symbol: symbol.into(),
        }
    }

    /// Raw value in the smallest unit.
    #[must_use]
    pub const fn raw(&self) -> U256 {
        self.raw
    }

    /// Decimals of the smallest unit.
    #[must_use]
    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Ticker symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// `raw / 10^decimals` with `precision` fractional digits.
    #[must_use]
    pub fn amount(&self, precision: u8) -> String {
        format_units_fixed(self.raw, self.decimals, precision)
    }

    /// Inline form, two fractional digits (`"100.00"`).
    #[must_use]
    pub fn inline(&self) -> String {
        self.amount(INLINE_PRECISION)
    }

    /// Comparison-table form, six fractional digits (`"100.000000"`).
    #[must_use]
    pub fn table(&self) -> String {
        self.amount(TABLE_PRECISION)
    }
}

/// Renders as `"100.00 mUSDT"`.
impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.inline(), self.symbol)
    }
}

/// Native and stablecoin balances captured at one moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    /// Native gas currency.
    pub native: Balance,
    /// Stablecoin.
    pub token: Balance,
}

/// Reads balances through a [`MarketClient`]. Every call is a fresh read.
#[derive(Debug, Clone)]
pub struct BalanceReader {
    token: TokenConfig,
    native: NativeCurrency,
}

impl BalanceReader {
    /// Creates a reader for `token`, with `native` describing the gas currency.
    #[must_use]
    pub const fn new(token: TokenConfig, native: NativeCurrency) -> Self {
        Self { token, native }
    }

    /// The tracked token.
    #[must_use]
    pub const fn token(&self) -> &TokenConfig {
        &self.token
    }

    /// Reads the tracked token's `balanceOf(account)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rpc`] if the read fails.
    pub async fn fetch<C: MarketClient>(&self, client: &C, account: Address) -> Result<Balance, Error> {
        let raw = client.token_balance(self.token.address, account).await?;
        Ok(Balance::new(raw, self.token.decimals, self.token.symbol.clone()))
    }

    /// Reads the native-currency balance of `account`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rpc`] if the read fails.
    pub async fn fetch_native<C: MarketClient>(
        &self,
        client: &C,
        account: Address,
    ) -> Result<Balance, Error> {
        let raw = client.native_balance(account).await?;
        Ok(Balance::new(raw, self.native.decimals, self.native.symbol.clone()))
    }

    /// Reads both balances.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rpc`] if either read fails.
    pub async fn snapshot<C: MarketClient>(
        &self,
        client: &C,
        account: Address,
    ) -> Result<BalanceSnapshot, Error> {
        let native = self.fetch_native(client, account).await?;
        let token = self.fetch(client, account).await?;
        Ok(BalanceSnapshot { native, token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeMarketClient, token_config};

    #[test]
    fn test_balance_display() {
        let balance = Balance::new(U256::from(1_234_560u64), 6, "mUSDT");
        assert_eq!(balance.inline(), "1.23");
        assert_eq!(balance.table(), "1.234560");
        assert_eq!(balance.to_string(), "1.23 mUSDT");
    }

    #[tokio::test]
    async fn test_fetch_reads_token_and_native() {
        let client = FakeMarketClient::default();
        let account = Address::repeat_byte(0xab);
        client.set_token_balance(account, U256::from(100_000_000u64));
        client.set_native_balance(account, U256::from(2_000_000_000_000_000_000u128));

        let reader = BalanceReader::new(
            token_config(),
            NativeCurrency {
                name: "Ether".into(),
                symbol: "ETH".into(),
                decimals: 18,
            },
        );
        let snapshot = reader.snapshot(&client, account).await.unwrap();
        assert_eq!(snapshot.token.to_string(), "100.00 mUSDT");
        assert_eq!(snapshot.native.table(), "2.000000");
    }

    #[tokio::test]
    async fn test_fetch_propagates_rpc_error() {
        let client = FakeMarketClient::default();
        client.fail_reads(true);
        let reader = BalanceReader::new(
            token_config(),
            NativeCurrency {
                name: "Ether".into(),
                symbol: "ETH".into(),
                decimals: 18,
            },
        );
        let result = reader.fetch(&client, Address::ZERO).await;
        assert!(matches!(result, Err(Error::Rpc(_))));
    }
}
