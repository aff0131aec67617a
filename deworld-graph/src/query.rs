//! GraphQL documents and envelopes for the marketplace subgraph.

use deworld::market::{Product, Purchase};
use serde::{Deserialize, Serialize};

/// Products listed under a planet.
pub const PRODUCTS: &str = r"
query Products($planet: String!) {
  products(where: { planet: $planet }) {
    id
    name
    price
    quantity
    seller
    sales
    productImage
  }
}
";

/// A single product by id.
pub const PRODUCT: &str = r"
query Product($id: ID!) {
  product(id: $id) {
    id
    name
    price
    quantity
    seller
    sales
    productImage
  }
}
";

/// Purchases by buyer, most recent first.
pub const ACCOUNT_PURCHASES: &str = r"
query AccountPurchases($buyer: String!) {
  purchases(where: { buyer: $buyer }, orderDirection: desc, orderBy: id) {
    id
    amount
    isDelivered
    isRefunded
    isReleased
    timestamp
    buyer
    product {
      id
      name
      price
      productImage
      quantity
    }
  }
}
";

/// A single purchase by id.
pub const PURCHASE: &str = r"
query Purchase($id: ID!) {
  purchases(where: { id: $id }) {
    id
    amount
    isDelivered
    isRefunded
    isReleased
    timestamp
    buyer
    product {
      id
      name
      price
      productImage
      quantity
    }
  }
}
";

/// Request body for a single operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRequest<'a, V> {
    /// Document text.
    pub query: &'a str,
    /// Operation to run from the document.
    pub operation_name: &'a str,
    /// Operation variables.
    pub variables: V,
}

/// Response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphResponse<T> {
    /// Present unless the whole operation failed.
    pub data: Option<T>,
    /// Present when any field failed.
    #[serde(default)]
    pub errors: Vec<GraphError>,
}

/// A single error entry.
#[derive(Debug, Deserialize)]
pub struct GraphError {
    /// Human-readable message.
    pub message: String,
}

/// `data` for [`PRODUCTS`].
#[derive(Debug, Deserialize)]
pub struct ProductsData {
    /// Matching products.
    pub products: Vec<Product>,
}

/// `data` for [`PRODUCT`].
#[derive(Debug, Deserialize)]
pub struct ProductData {
    /// The product, `null` if unknown.
    pub product: Option<Product>,
}

/// `data` for [`ACCOUNT_PURCHASES`] and [`PURCHASE`].
#[derive(Debug, Deserialize)]
pub struct PurchasesData {
    /// Matching purchases.
    pub purchases: Vec<Purchase>,
}
