//! Integration test harness for Wicker.
//!
//! Provides an in-process catalog/stock service the real
//! [`wicker_store::HttpCatalogClient`] talks to over loopback, plus helpers
//! for unique snapshot directories and test logging.
//!
//! # Example
//!
//! ```rust,ignore
//! let service = MockCatalogService::spawn().await;
//! service.put_product(1, json!({"id": 1, "name": "Sneaker", "price": 139.9}));
//! service.put_stock(1, 5);
//!
//! let config = StoreConfig::new(service.base_url(), temp_storage_dir());
//! let cart = CartStore::from_config(&config)?;
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

/// Shared state behind the mock service's endpoints.
#[derive(Default)]
struct CatalogState {
    products: Mutex<HashMap<i32, Value>>,
    stock: Mutex<HashMap<i32, Value>>,
}

/// An in-process catalog/stock service bound to an ephemeral loopback port.
///
/// Serves `GET /products/{id}` and `GET /stock/{id}` from mutable in-memory
/// maps; unknown ids answer 404.
pub struct MockCatalogService {
    addr: SocketAddr,
    state: Arc<CatalogState>,
}

impl MockCatalogService {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the loopback listener cannot be bound.
    pub async fn spawn() -> Self {
        let state = Arc::new(CatalogState::default());
        let app = Router::new()
            .route("/products/{id}", get(product))
            .route("/stock/{id}", get(stock))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock catalog listener");
        let addr = listener.local_addr().expect("Failed to read listener addr");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock catalog server stopped");
        });

        Self { addr, state }
    }

    /// Base URL clients should be configured with.
    ///
    /// # Panics
    ///
    /// Panics if the bound address does not form a valid URL (it always
    /// does).
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("Loopback addr forms a valid URL")
    }

    /// Serve `product` under `/products/{id}`.
    pub fn put_product(&self, id: i32, product: Value) {
        lock(&self.state.products).insert(id, product);
    }

    /// Serve `{"id": id, "amount": amount}` under `/stock/{id}`.
    pub fn put_stock(&self, id: i32, amount: i64) {
        lock(&self.state.stock).insert(id, json!({ "id": id, "amount": amount }));
    }

    /// Serve an arbitrary body under `/stock/{id}`, for malformed or
    /// amount-less responses.
    pub fn put_stock_body(&self, id: i32, body: Value) {
        lock(&self.state.stock).insert(id, body);
    }

    /// Make `/stock/{id}` answer 404.
    pub fn remove_stock(&self, id: i32) {
        lock(&self.state.stock).remove(&id);
    }
}

async fn product(State(state): State<Arc<CatalogState>>, Path(id): Path<i32>) -> Response {
    lookup(&state.products, id)
}

async fn stock(State(state): State<Arc<CatalogState>>, Path(id): Path<i32>) -> Response {
    lookup(&state.stock, id)
}

fn lookup(map: &Mutex<HashMap<i32, Value>>, id: i32) -> Response {
    lock(map).get(&id).map_or_else(
        || StatusCode::NOT_FOUND.into_response(),
        |value| Json(value.clone()).into_response(),
    )
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Unique snapshot directory under the system temp dir.
#[must_use]
pub fn temp_storage_dir() -> PathBuf {
    std::env::temp_dir().join(format!("wicker-it-{}", Uuid::new_v4()))
}

/// Initialize test logging once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
