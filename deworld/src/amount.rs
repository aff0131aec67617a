//! Fixed-precision rendering of on-chain integer amounts.
//!
//! Token contracts report balances and prices in their smallest unit. The
//! helpers here divide by `10^decimals` and render a fixed number of
//! fractional digits using exact [`U256`] arithmetic, rounding half away
//! from zero, so no floating-point error leaks into displayed values.

use alloy_primitives::U256;

/// Fractional digits used for balances shown inline (e.g. `"100.00 mUSDT"`).
pub const INLINE_PRECISION: u8 = 2;

/// Fractional digits used in balance-comparison tables.
pub const TABLE_PRECISION: u8 = 6;

/// Errors produced by amount arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// `price × quantity` does not fit in 256 bits.
    #[error("amount overflow: {price} x {quantity}")]
    Overflow {
        /// Unit price in the token's smallest unit.
        price: U256,
        /// Requested quantity.
        quantity: u64,
    },
}

/// Returns `10^exp`, saturating at [`U256::MAX`].
fn pow10(exp: u8) -> U256 {
    U256::from(10u64).saturating_pow(U256::from(exp))
}

/// Renders `raw / 10^decimals` with exactly `precision` fractional digits.
///
/// ```rust
/// use alloy_primitives::U256;
/// use deworld::amount::format_units_fixed;
///
/// assert_eq!(format_units_fixed(U256::from(1_234_560u64), 6, 2), "1.23");
/// assert_eq!(format_units_fixed(U256::from(5u64), 0, 2), "5.00");
/// ```
#[must_use]
pub fn format_units_fixed(raw: U256, decimals: u8, precision: u8) -> String {
    let scaled = if precision >= decimals {
        raw.saturating_mul(pow10(precision - decimals))
    } else {
        let divisor = pow10(decimals - precision);
        let quotient = raw / divisor;
        if raw % divisor >= divisor / U256::from(2u64) {
            quotient + U256::from(1u64)
        } else {
            quotient
        }
    };

    if precision == 0 {
        return scaled.to_string();
    }

    let unit = pow10(precision);
    let whole = scaled / unit;
    let fraction = (scaled % unit).to_string();
    format!(
        "{whole}.{fraction:0>width$}",
        width = usize::from(precision)
    )
}

/// Computes `price × quantity`, the allowance a purchase must grant.
///
/// # Errors
///
/// Returns [`AmountError::Overflow`] if the product exceeds 256 bits.
pub fn checked_total(price: U256, quantity: u64) -> Result<U256, AmountError> {
    price
        .checked_mul(U256::from(quantity))
        .ok_or(AmountError::Overflow { price, quantity })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_two_places() {
        assert_eq!(format_units_fixed(U256::from(1_234_560u64), 6, 2), "1.23");
    }

    #[test]
    fn test_format_rounds_half_up() {
        assert_eq!(format_units_fixed(U256::from(1_235_000u64), 6, 2), "1.24");
        assert_eq!(format_units_fixed(U256::from(1_234_999u64), 6, 2), "1.23");
    }

    #[test]
    fn test_format_pads_fraction() {
        assert_eq!(format_units_fixed(U256::from(100_000_000u64), 6, 2), "100.00");
        assert_eq!(format_units_fixed(U256::from(90_000_000u64), 6, 6), "90.000000");
        assert_eq!(format_units_fixed(U256::from(10_000u64), 6, 6), "0.010000");
    }

    #[test]
    fn test_format_zero() {
        assert_eq!(format_units_fixed(U256::ZERO, 18, 6), "0.000000");
        assert_eq!(format_units_fixed(U256::ZERO, 6, 0), "0");
    }

    #[test]
    fn test_format_native_units() {
        // 1.5 ETH in wei
        let wei = U256::from(1_500_000_000_000_000_000u128);
        assert_eq!(format_units_fixed(wei, 18, 6), "1.500000");
    }

    #[test]
    fn test_format_rounding_carries_into_whole() {
        assert_eq!(format_units_fixed(U256::from(1_999_999u64), 6, 2), "2.00");
    }

    #[test]
    fn test_checked_total() {
        assert_eq!(
            checked_total(U256::from(10_000_000u64), 3).unwrap(),
            U256::from(30_000_000u64)
        );
        assert!(matches!(
            checked_total(U256::MAX, 2),
            Err(AmountError::Overflow { quantity: 2, .. })
        ));
    }
}
