//! Cart entries.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::product::ProductRecord;

/// A single line in the cart: one product and how many of it.
///
/// Serializes as the product's fields with an `amount` alongside, so a
/// persisted cart snapshot is an array of product objects each carrying its
/// quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    /// Catalog metadata for the product, carried for the UI layer.
    #[serde(flatten)]
    pub product: ProductRecord,
    /// Selected quantity, always at least 1.
    pub amount: u32,
}

impl CartEntry {
    /// ID of the product this entry holds.
    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product.id
    }
}
