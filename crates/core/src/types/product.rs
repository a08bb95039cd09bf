//! Catalog product metadata and stock levels.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// Product metadata as served by the catalog endpoint.
///
/// The store treats everything except the id as display data: `name`,
/// `price`, and `image` are carried for the UI layer, and any additional
/// fields the catalog returns are kept in `extra` and passed through
/// serialization unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Catalog product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Decimal,
    /// Product image URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Any further catalog fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Stock level as served by the stock endpoint.
///
/// The stock service is the source of truth for availability. A missing,
/// zero, or negative `amount` all resolve to "nothing available".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    /// Product this stock level refers to.
    pub id: ProductId,
    /// Units available, as reported by the stock service.
    #[serde(default)]
    pub amount: Option<i64>,
}

impl StockLevel {
    /// Units actually available for sale.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.amount
            .map_or(0, |amount| u32::try_from(amount).unwrap_or(0))
    }
}
