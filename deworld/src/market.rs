//! Marketplace entities, as mirrored by the indexing service.
//!
//! Products and purchases are read-only here. The indexing service reports
//! big integers as decimal strings; counters are accepted either as strings
//! or as plain numbers.

use std::fmt;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use crate::amount::{AmountError, checked_total};

/// Image shown when a product has no usable image reference.
pub const DEFAULT_PRODUCT_IMAGE: &str = "/mega.avif";

/// A sellable item listed under a marketplace grouping ("planet").
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// On-chain product identifier.
    #[serde_as(as = "DisplayFromStr")]
    pub id: U256,
    /// Display name.
    pub name: String,
    /// Unit price in the stablecoin's smallest unit.
    #[serde_as(as = "DisplayFromStr")]
    pub price: U256,
    /// Units listed.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub quantity: u64,
    /// Units already sold.
    #[serde(default)]
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub sales: u64,
    /// Listing seller.
    #[serde(default)]
    pub seller: Option<Address>,
    /// Image reference as stored by the seller.
    #[serde(default)]
    pub product_image: Option<String>,
}

impl Product {
    /// Units still available, `quantity - sales`, never negative.
    #[must_use]
    pub const fn available(&self) -> u64 {
        self.quantity.saturating_sub(self.sales)
    }

    /// `true` if `quantity` units can be bought right now.
    #[must_use]
    pub const fn is_purchasable(&self, quantity: u64) -> bool {
        quantity > 0 && quantity <= self.available()
    }

    /// The image to display: the stored reference when it is an `https://`
    /// URL, otherwise [`DEFAULT_PRODUCT_IMAGE`].
    #[must_use]
    pub fn image_url(&self) -> &str {
        self.product_image
            .as_deref()
            .filter(|url| url.starts_with("https://"))
            .unwrap_or(DEFAULT_PRODUCT_IMAGE)
    }

    /// `price × quantity`.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Overflow`] if the total exceeds 256 bits.
    pub fn total(&self, quantity: u64) -> Result<U256, AmountError> {
        checked_total(self.price, quantity)
    }
}

/// The single status label shown for a purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PurchaseStatus {
    /// The buyer confirmed delivery.
    Delivered,
    /// The escrow was refunded to the buyer.
    Refunded,
    /// The escrow was released to the seller.
    Released,
    /// Paid and held in escrow.
    Paid,
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Delivered => "Delivered",
            Self::Refunded => "Refunded",
            Self::Released => "Released",
            Self::Paid => "Paid",
        })
    }
}

/// A purchase recorded by the marketplace contract.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    /// Purchase identifier, increasing with time.
    #[serde_as(as = "DisplayFromStr")]
    pub id: U256,
    /// Units bought.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    pub amount: u64,
    /// Delivery confirmed.
    #[serde(default)]
    pub is_delivered: bool,
    /// Escrow refunded.
    #[serde(default)]
    pub is_refunded: bool,
    /// Escrow released.
    #[serde(default)]
    pub is_released: bool,
    /// Block timestamp, in seconds since the Unix epoch.
    #[serde(default)]
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    pub timestamp: Option<u64>,
    /// The product bought.
    pub product: Product,
    /// Buyer, when the query selects it.
    #[serde(default)]
    pub buyer: Option<Address>,
}

impl Purchase {
    /// Highest-priority status: Delivered, then Refunded, then Released, then Paid.
    #[must_use]
    pub const fn status(&self) -> PurchaseStatus {
        if self.is_delivered {
            PurchaseStatus::Delivered
        } else if self.is_refunded {
            PurchaseStatus::Refunded
        } else if self.is_released {
            PurchaseStatus::Released
        } else {
            PurchaseStatus::Paid
        }
    }

    /// Amount paid, `product.price × amount`.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Overflow`] if the total exceeds 256 bits.
    pub fn total(&self) -> Result<U256, AmountError> {
        self.product.total(self.amount)
    }
}
