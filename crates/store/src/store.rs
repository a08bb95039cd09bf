//! The cart state container.
//!
//! [`CartStore`] owns the in-memory cart, validates every quantity request
//! against the stock service, persists a full snapshot after each successful
//! mutation, and reports failures without ever poisoning itself.
//!
//! All three mutating operations run their whole check-stock / mutate /
//! persist sequence under one async mutex, so two concurrent operations on
//! the same product cannot both pass the stock check and oversell.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, warn};

use wicker_core::{CartEntry, ProductId};

use crate::catalog::{CatalogApi, CatalogError, HttpCatalogClient};
use crate::config::StoreConfig;
use crate::error::CartError;
use crate::notify::{Notification, Notifier};
use crate::storage::{JsonFileStorage, KeyValueStorage, StorageError};

/// Fixed key the cart snapshot is persisted under.
pub const CART_STORAGE_KEY: &str = "cart";

/// The cart state container.
///
/// Cheaply cloneable; clones share the same cart. Collaborators are
/// injected at construction so tests can substitute fakes.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    catalog: Arc<dyn CatalogApi>,
    storage: Arc<dyn KeyValueStorage>,
    notifier: Notifier,
    /// Guards the whole check-stock -> mutate -> persist sequence.
    entries: Mutex<Vec<CartEntry>>,
    /// Mirrors `entries` after every successful mutation.
    view: watch::Sender<Vec<CartEntry>>,
}

impl CartStore {
    /// Create a store over the given collaborators.
    ///
    /// The initial cart is loaded from the persisted snapshot under
    /// [`CART_STORAGE_KEY`]; an absent or unreadable snapshot yields an
    /// empty cart.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogApi>, storage: Arc<dyn KeyValueStorage>) -> Self {
        let initial = load_snapshot(storage.as_ref());
        let (view, _) = watch::channel(initial.clone());

        Self {
            inner: Arc::new(CartStoreInner {
                catalog,
                storage,
                notifier: Notifier::new(),
                entries: Mutex::new(initial),
                view,
            }),
        }
    }

    /// Create a store wired to the shipped HTTP client and file storage.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn from_config(config: &StoreConfig) -> Result<Self, CatalogError> {
        let catalog = HttpCatalogClient::new(config)?;
        let storage = JsonFileStorage::new(config.storage_dir.clone());
        Ok(Self::new(Arc::new(catalog), Arc::new(storage)))
    }

    /// Current cart contents, in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<CartEntry> {
        self.inner.view.borrow().clone()
    }

    /// Subscribe to cart changes.
    ///
    /// The receiver yields the full cart after every successful mutation;
    /// UI layers re-render from it.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<CartEntry>> {
        self.inner.view.subscribe()
    }

    /// Subscribe to user-facing error notifications.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifier.subscribe()
    }

    /// Add one unit of a product to the cart.
    ///
    /// A product already in the cart has its quantity incremented by one;
    /// otherwise its catalog metadata is fetched and a new entry with
    /// quantity one is appended. Either way the requested quantity is
    /// validated against live stock first, and nothing is mutated or
    /// persisted on failure.
    ///
    /// # Errors
    ///
    /// [`CartError::OutOfStock`] when stock does not cover the request,
    /// [`CartError::AddProduct`] when a remote lookup fails, and
    /// [`CartError::Storage`] when the snapshot write fails. Every error is
    /// also published on the notification channel.
    pub async fn add_product(&self, product_id: ProductId) -> Result<(), CartError> {
        self.report(self.try_add_product(product_id).await)
    }

    /// Remove a product's entry from the cart.
    ///
    /// The relative order of the remaining entries is preserved.
    ///
    /// # Errors
    ///
    /// [`CartError::ProductNotFound`] when the product has no entry (a
    /// repeated remove is safe and reports the same), and
    /// [`CartError::Storage`] when the snapshot write fails.
    pub async fn remove_product(&self, product_id: ProductId) -> Result<(), CartError> {
        self.report(self.try_remove_product(product_id).await)
    }

    /// Set a product's quantity to an absolute value.
    ///
    /// The value replaces the current quantity outright. Quantities below
    /// one are rejected; use [`Self::remove_product`] to delete an entry.
    ///
    /// # Errors
    ///
    /// [`CartError::OutOfStock`] for a zero request or one above available
    /// stock, [`CartError::UpdateAmount`] when the stock lookup fails,
    /// [`CartError::ProductNotFound`] when the product has no entry, and
    /// [`CartError::Storage`] when the snapshot write fails.
    pub async fn update_product_amount(
        &self,
        product_id: ProductId,
        amount: u32,
    ) -> Result<(), CartError> {
        self.report(self.try_update_product_amount(product_id, amount).await)
    }

    async fn try_add_product(&self, product_id: ProductId) -> Result<(), CartError> {
        let mut entries = self.inner.entries.lock().await;
        let existing_amount = entries
            .iter()
            .find(|entry| entry.product_id() == product_id)
            .map(|entry| entry.amount);

        let stock = self
            .inner
            .catalog
            .stock(product_id)
            .await
            .map_err(CartError::AddProduct)?;
        let available = stock.available();
        if available == 0 {
            return Err(CartError::OutOfStock);
        }

        let mut next = entries.clone();
        if let Some(amount) = existing_amount {
            let requested = amount + 1;
            if requested > available {
                return Err(CartError::OutOfStock);
            }
            for entry in &mut next {
                if entry.product_id() == product_id {
                    entry.amount = requested;
                }
            }
        } else {
            let product = self
                .inner
                .catalog
                .product(product_id)
                .await
                .map_err(CartError::AddProduct)?;
            next.push(CartEntry { product, amount: 1 });
        }

        self.commit(&mut entries, next)
    }

    async fn try_remove_product(&self, product_id: ProductId) -> Result<(), CartError> {
        let mut entries = self.inner.entries.lock().await;
        if !entries.iter().any(|entry| entry.product_id() == product_id) {
            return Err(CartError::ProductNotFound(product_id));
        }

        let next = entries
            .iter()
            .filter(|entry| entry.product_id() != product_id)
            .cloned()
            .collect();
        self.commit(&mut entries, next)
    }

    async fn try_update_product_amount(
        &self,
        product_id: ProductId,
        amount: u32,
    ) -> Result<(), CartError> {
        if amount == 0 {
            return Err(CartError::OutOfStock);
        }

        let mut entries = self.inner.entries.lock().await;
        let stock = self
            .inner
            .catalog
            .stock(product_id)
            .await
            .map_err(CartError::UpdateAmount)?;
        let available = stock.available();
        if available == 0 || amount > available {
            return Err(CartError::OutOfStock);
        }

        let mut next = entries.clone();
        let Some(entry) = next
            .iter_mut()
            .find(|entry| entry.product_id() == product_id)
        else {
            return Err(CartError::ProductNotFound(product_id));
        };
        entry.amount = amount;

        self.commit(&mut entries, next)
    }

    /// Persist `next` and make it the current cart.
    ///
    /// The snapshot write happens first; if it fails the in-memory cart and
    /// the reactive view are left untouched.
    fn commit(
        &self,
        entries: &mut Vec<CartEntry>,
        next: Vec<CartEntry>,
    ) -> Result<(), CartError> {
        let raw = serde_json::to_string(&next).map_err(StorageError::from)?;
        self.inner.storage.set(CART_STORAGE_KEY, &raw)?;

        *entries = next;
        self.inner.view.send_replace(entries.clone());
        debug!(items = entries.len(), "cart updated");
        Ok(())
    }

    /// Publish a failed outcome on the notification channel, pass the
    /// result through either way.
    fn report(&self, result: Result<(), CartError>) -> Result<(), CartError> {
        if let Err(error) = &result {
            self.inner.notifier.publish(error.to_string());
        }
        result
    }
}

/// Read the persisted snapshot, treating anything unreadable as absent.
fn load_snapshot(storage: &dyn KeyValueStorage) -> Vec<CartEntry> {
    match storage.get(CART_STORAGE_KEY) {
        Ok(Some(raw)) => match serde_json::from_str::<Vec<CartEntry>>(&raw) {
            Ok(entries) => {
                debug!(items = entries.len(), "cart loaded from snapshot");
                entries
            }
            Err(error) => {
                warn!(%error, "discarding unreadable cart snapshot");
                Vec::new()
            }
        },
        Ok(None) => Vec::new(),
        Err(error) => {
            warn!(%error, "could not read cart snapshot");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use wicker_core::{ProductRecord, StockLevel};

    use crate::catalog::CatalogError;
    use crate::storage::MemoryStorage;

    use super::*;

    // =========================================================================
    // Fakes
    // =========================================================================

    #[derive(Default)]
    struct FakeCatalog {
        products: StdMutex<HashMap<ProductId, ProductRecord>>,
        stock: StdMutex<HashMap<ProductId, i64>>,
        stock_unreachable: AtomicBool,
        products_unreachable: AtomicBool,
    }

    impl FakeCatalog {
        fn with_product(self, id: i32, name: &str, stock: i64) -> Self {
            let product_id = ProductId::new(id);
            self.products.lock().unwrap().insert(
                product_id,
                ProductRecord {
                    id: product_id,
                    name: name.to_string(),
                    price: Decimal::new(13990, 2),
                    image: Some(format!("https://cdn.example.com/{name}.jpg")),
                    extra: serde_json::Map::new(),
                },
            );
            self.stock.lock().unwrap().insert(product_id, stock);
            self
        }

        fn set_stock(&self, id: i32, amount: i64) {
            self.stock
                .lock()
                .unwrap()
                .insert(ProductId::new(id), amount);
        }

        fn clear_stock(&self, id: i32) {
            self.stock.lock().unwrap().remove(&ProductId::new(id));
        }

        fn set_stock_unreachable(&self, on: bool) {
            self.stock_unreachable.store(on, Ordering::SeqCst);
        }

        fn set_products_unreachable(&self, on: bool) {
            self.products_unreachable.store(on, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl CatalogApi for FakeCatalog {
        async fn product(&self, id: ProductId) -> Result<ProductRecord, CatalogError> {
            if self.products_unreachable.load(Ordering::SeqCst) {
                return Err(CatalogError::Api {
                    status: 500,
                    message: "catalog down".to_string(),
                });
            }
            self.products
                .lock()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or(CatalogError::Api {
                    status: 404,
                    message: "no such product".to_string(),
                })
        }

        async fn stock(&self, id: ProductId) -> Result<StockLevel, CatalogError> {
            if self.stock_unreachable.load(Ordering::SeqCst) {
                return Err(CatalogError::Api {
                    status: 500,
                    message: "stock down".to_string(),
                });
            }
            Ok(StockLevel {
                id,
                amount: self.stock.lock().unwrap().get(&id).copied(),
            })
        }
    }

    /// Storage whose writes always fail.
    struct BrokenStorage;

    impl KeyValueStorage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io(std::io::Error::other("disk full")))
        }
    }

    fn store_over(catalog: FakeCatalog) -> (CartStore, Arc<FakeCatalog>, Arc<MemoryStorage>) {
        let catalog = Arc::new(catalog);
        let storage = Arc::new(MemoryStorage::default());
        let store = CartStore::new(catalog.clone(), storage.clone());
        (store, catalog, storage)
    }

    fn amounts(store: &CartStore) -> Vec<(i32, u32)> {
        store
            .entries()
            .iter()
            .map(|entry| (entry.product_id().as_i32(), entry.amount))
            .collect()
    }

    // =========================================================================
    // add_product
    // =========================================================================

    #[tokio::test]
    async fn test_add_new_product_appends_entry_with_metadata() {
        let (store, _, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 5));

        store.add_product(ProductId::new(1)).await.unwrap();

        let entries = store.entries();
        assert_eq!(amounts(&store), vec![(1, 1)]);
        assert_eq!(entries.first().unwrap().product.name, "sneaker");
    }

    #[tokio::test]
    async fn test_add_existing_product_increments_by_one() {
        let (store, _, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 5));

        store.add_product(ProductId::new(1)).await.unwrap();
        store.add_product(ProductId::new(1)).await.unwrap();

        assert_eq!(amounts(&store), vec![(1, 2)]);
    }

    #[tokio::test]
    async fn test_add_is_bounded_by_stock() {
        let (store, _, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 2));

        store.add_product(ProductId::new(1)).await.unwrap();
        store.add_product(ProductId::new(1)).await.unwrap();
        let result = store.add_product(ProductId::new(1)).await;

        assert!(matches!(result, Err(CartError::OutOfStock)));
        assert_eq!(amounts(&store), vec![(1, 2)]);
    }

    #[tokio::test]
    async fn test_add_rejects_exhausted_missing_and_negative_stock() {
        let (store, catalog, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 0));

        for setup in [Some(0), Some(-4), None] {
            match setup {
                Some(amount) => catalog.set_stock(1, amount),
                None => catalog.clear_stock(1),
            }
            let result = store.add_product(ProductId::new(1)).await;
            assert!(matches!(result, Err(CartError::OutOfStock)), "{setup:?}");
            assert!(store.entries().is_empty());
        }
    }

    #[tokio::test]
    async fn test_add_fails_without_mutation_when_stock_service_down() {
        let (store, catalog, storage) =
            store_over(FakeCatalog::default().with_product(1, "sneaker", 5));
        catalog.set_stock_unreachable(true);

        let result = store.add_product(ProductId::new(1)).await;

        assert!(matches!(result, Err(CartError::AddProduct(_))));
        assert!(store.entries().is_empty());
        assert_eq!(storage.get(CART_STORAGE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_add_fails_without_mutation_when_catalog_fetch_fails() {
        let (store, catalog, storage) =
            store_over(FakeCatalog::default().with_product(1, "sneaker", 5));
        catalog.set_products_unreachable(true);

        let result = store.add_product(ProductId::new(1)).await;

        assert!(matches!(result, Err(CartError::AddProduct(_))));
        assert!(store.entries().is_empty());
        assert_eq!(storage.get(CART_STORAGE_KEY).unwrap(), None);
    }

    // =========================================================================
    // remove_product
    // =========================================================================

    #[tokio::test]
    async fn test_remove_preserves_order_of_remaining_entries() {
        let (store, _, _) = store_over(
            FakeCatalog::default()
                .with_product(1, "sneaker", 5)
                .with_product(2, "boot", 5)
                .with_product(3, "sandal", 5),
        );
        for id in [1, 2, 3] {
            store.add_product(ProductId::new(id)).await.unwrap();
        }

        store.remove_product(ProductId::new(2)).await.unwrap();

        assert_eq!(amounts(&store), vec![(1, 1), (3, 1)]);
    }

    #[tokio::test]
    async fn test_remove_absent_product_reports_not_found_and_is_repeatable() {
        let (store, _, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 5));
        store.add_product(ProductId::new(1)).await.unwrap();
        store.remove_product(ProductId::new(1)).await.unwrap();

        // Second remove of the same product: same structured error, no
        // panic, cart untouched.
        let result = store.remove_product(ProductId::new(1)).await;
        assert!(matches!(
            result,
            Err(CartError::ProductNotFound(id)) if id == ProductId::new(1)
        ));
        assert!(store.entries().is_empty());
    }

    // =========================================================================
    // update_product_amount
    // =========================================================================

    #[tokio::test]
    async fn test_update_sets_absolute_amount() {
        let (store, _, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 5));
        store.add_product(ProductId::new(1)).await.unwrap();
        store.add_product(ProductId::new(1)).await.unwrap();

        store
            .update_product_amount(ProductId::new(1), 5)
            .await
            .unwrap();

        // Absolute set, not additive.
        assert_eq!(amounts(&store), vec![(1, 5)]);
    }

    #[tokio::test]
    async fn test_update_rejects_zero_amount() {
        let (store, _, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 5));
        store.add_product(ProductId::new(1)).await.unwrap();

        let result = store.update_product_amount(ProductId::new(1), 0).await;

        assert!(matches!(result, Err(CartError::OutOfStock)));
        assert_eq!(amounts(&store), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn test_update_rejects_amount_above_stock() {
        let (store, _, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 5));
        store.add_product(ProductId::new(1)).await.unwrap();

        let result = store.update_product_amount(ProductId::new(1), 10).await;

        assert!(matches!(result, Err(CartError::OutOfStock)));
        assert_eq!(amounts(&store), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn test_update_absent_product_reports_not_found() {
        let (store, _, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 5));

        let result = store.update_product_amount(ProductId::new(1), 2).await;

        assert!(matches!(result, Err(CartError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_checks_stock_before_cart_membership() {
        let (store, catalog, _) = store_over(FakeCatalog::default());
        catalog.set_stock_unreachable(true);

        // Product 9 is neither in stock nor in the cart; the stock fault
        // wins because stock is consulted first.
        let result = store.update_product_amount(ProductId::new(9), 2).await;

        assert!(matches!(result, Err(CartError::UpdateAmount(_))));
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    #[tokio::test]
    async fn test_snapshot_roundtrip_restores_entries() {
        let catalog = Arc::new(
            FakeCatalog::default()
                .with_product(1, "sneaker", 5)
                .with_product(2, "boot", 5),
        );
        let storage = Arc::new(MemoryStorage::default());

        let store = CartStore::new(catalog.clone(), storage.clone());
        store.add_product(ProductId::new(1)).await.unwrap();
        store.add_product(ProductId::new(2)).await.unwrap();
        store.add_product(ProductId::new(2)).await.unwrap();
        let before = store.entries();

        // A fresh store over the same storage sees the same cart.
        let reloaded = CartStore::new(catalog, storage);
        assert_eq!(reloaded.entries(), before);
        assert_eq!(amounts(&reloaded), vec![(1, 1), (2, 2)]);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_starts_empty() {
        let storage = Arc::new(MemoryStorage::default());
        storage.set(CART_STORAGE_KEY, "definitely not json").unwrap();

        let store = CartStore::new(Arc::new(FakeCatalog::default()), storage);

        assert!(store.entries().is_empty());
    }

    #[tokio::test]
    async fn test_failed_operation_leaves_snapshot_untouched() {
        let (store, catalog, storage) =
            store_over(FakeCatalog::default().with_product(1, "sneaker", 5));
        store.add_product(ProductId::new(1)).await.unwrap();
        let persisted = storage.get(CART_STORAGE_KEY).unwrap();

        catalog.set_stock_unreachable(true);
        let _ = store.update_product_amount(ProductId::new(1), 3).await;

        assert_eq!(storage.get(CART_STORAGE_KEY).unwrap(), persisted);
        assert_eq!(amounts(&store), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn test_storage_write_failure_aborts_mutation() {
        let catalog = Arc::new(FakeCatalog::default().with_product(1, "sneaker", 5));
        let store = CartStore::new(catalog, Arc::new(BrokenStorage));

        let result = store.add_product(ProductId::new(1)).await;

        assert!(matches!(result, Err(CartError::Storage(_))));
        assert!(store.entries().is_empty());
    }

    // =========================================================================
    // View & notifications
    // =========================================================================

    #[tokio::test]
    async fn test_subscription_sees_each_successful_mutation() {
        let (store, _, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 5));
        let mut view = store.subscribe();

        store.add_product(ProductId::new(1)).await.unwrap();
        view.changed().await.unwrap();
        assert_eq!(view.borrow_and_update().len(), 1);

        store.remove_product(ProductId::new(1)).await.unwrap();
        view.changed().await.unwrap();
        assert!(view.borrow_and_update().is_empty());
    }

    #[tokio::test]
    async fn test_failed_operation_does_not_move_the_view() {
        let (store, _, _) = store_over(FakeCatalog::default());
        let mut view = store.subscribe();
        view.mark_unchanged();

        let _ = store.add_product(ProductId::new(1)).await;

        assert!(!view.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_notifications_distinguish_error_kinds() {
        let (store, catalog, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 0));
        let mut notifications = store.notifications();

        let _ = store.add_product(ProductId::new(1)).await;
        assert_eq!(
            notifications.try_recv().unwrap().message,
            "requested quantity exceeds available stock"
        );

        catalog.set_stock_unreachable(true);
        let _ = store.add_product(ProductId::new(1)).await;
        assert_eq!(
            notifications.try_recv().unwrap().message,
            "could not add product"
        );
    }

    #[tokio::test]
    async fn test_successful_operations_emit_no_notification() {
        let (store, _, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 5));
        let mut notifications = store.notifications();

        store.add_product(ProductId::new(1)).await.unwrap();

        assert!(notifications.try_recv().is_err());
    }

    // =========================================================================
    // End-to-end scenario
    // =========================================================================

    #[tokio::test]
    async fn test_full_cart_session() {
        let (store, _, _) = store_over(FakeCatalog::default().with_product(1, "sneaker", 5));
        let id = ProductId::new(1);

        store.add_product(id).await.unwrap();
        assert_eq!(amounts(&store), vec![(1, 1)]);

        store.add_product(id).await.unwrap();
        assert_eq!(amounts(&store), vec![(1, 2)]);

        let mut notifications = store.notifications();
        let result = store.update_product_amount(id, 10).await;
        assert!(matches!(result, Err(CartError::OutOfStock)));
        assert_eq!(amounts(&store), vec![(1, 2)]);
        assert!(notifications.try_recv().is_ok());

        store.update_product_amount(id, 5).await.unwrap();
        assert_eq!(amounts(&store), vec![(1, 5)]);

        store.remove_product(id).await.unwrap();
        assert!(store.entries().is_empty());
    }
}
