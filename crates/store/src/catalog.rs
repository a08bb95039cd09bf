//! Remote catalog and stock lookups.
//!
//! The store validates every quantity request against the stock service and
//! fetches product metadata when a product first enters the cart. Both live
//! behind [`CatalogApi`] so tests can substitute fakes;
//! [`HttpCatalogClient`] is the REST implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use wicker_core::{ProductId, ProductRecord, StockLevel};

use crate::config::StoreConfig;

/// Product metadata cache size.
const PRODUCT_CACHE_CAPACITY: u64 = 1000;
/// Product metadata cache TTL.
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

/// Errors that can occur when talking to the catalog/stock service.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response or build a request URL.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Remote catalog and stock lookups used by the cart store.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch catalog metadata for a product.
    ///
    /// # Errors
    ///
    /// Returns error if the service cannot be reached or answers with a
    /// non-success status.
    async fn product(&self, id: ProductId) -> Result<ProductRecord, CatalogError>;

    /// Fetch the current stock level for a product.
    ///
    /// Implementations must report the live value; the store relies on this
    /// being uncached.
    ///
    /// # Errors
    ///
    /// Returns error if the service cannot be reached or answers with a
    /// non-success status.
    async fn stock(&self, id: ProductId) -> Result<StockLevel, CatalogError>;
}

/// REST client for the catalog/stock service.
///
/// Product metadata is cached for 5 minutes; stock lookups always hit the
/// service.
#[derive(Clone)]
pub struct HttpCatalogClient {
    inner: Arc<HttpCatalogClientInner>,
}

struct HttpCatalogClientInner {
    client: reqwest::Client,
    base_url: Url,
    products: Cache<ProductId, ProductRecord>,
}

impl HttpCatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StoreConfig) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder().build()?;

        let products = Cache::builder()
            .max_capacity(PRODUCT_CACHE_CAPACITY)
            .time_to_live(PRODUCT_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(HttpCatalogClientInner {
                client,
                base_url: config.api_url.clone(),
                products,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }

    /// GET an endpoint and decode the JSON body.
    async fn fetch_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CatalogError> {
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }
}

#[async_trait]
impl CatalogApi for HttpCatalogClient {
    async fn product(&self, id: ProductId) -> Result<ProductRecord, CatalogError> {
        if let Some(hit) = self.inner.products.get(&id).await {
            return Ok(hit);
        }

        let url = self.endpoint(&format!("products/{id}"))?;
        let product: ProductRecord = self.fetch_json(url).await?;
        self.inner.products.insert(id, product.clone()).await;
        Ok(product)
    }

    async fn stock(&self, id: ProductId) -> Result<StockLevel, CatalogError> {
        // Availability is the one thing that must never be stale.
        let url = self.endpoint(&format!("stock/{id}"))?;
        self.fetch_json(url).await
    }
}
