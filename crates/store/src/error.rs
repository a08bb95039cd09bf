//! Cart operation errors.
//!
//! Every failed operation returns one of these and publishes the same
//! user-facing message on the notification channel. None of them are fatal
//! to the store; the cart stays usable after any failure.

use thiserror::Error;

use wicker_core::ProductId;

use crate::catalog::CatalogError;
use crate::storage::StorageError;

/// Errors a cart operation can fail with.
#[derive(Debug, Error)]
pub enum CartError {
    /// Requested quantity is not covered by the available stock.
    #[error("requested quantity exceeds available stock")]
    OutOfStock,

    /// The operation referenced a product that is not in the cart.
    #[error("product {0} is not in the cart")]
    ProductNotFound(ProductId),

    /// The catalog or stock service failed while adding a product.
    #[error("could not add product")]
    AddProduct(#[source] CatalogError),

    /// The stock service failed while updating a quantity.
    #[error("could not update product quantity")]
    UpdateAmount(#[source] CatalogError),

    /// Writing the cart snapshot failed; the mutation was not applied.
    #[error("could not persist cart")]
    Storage(#[from] StorageError),
}
