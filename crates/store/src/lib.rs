//! Wicker Store - cart state container for a headless storefront.
//!
//! This crate owns the client-side shopping cart: an in-memory ordered list
//! of entries, validated against a remote stock service on every mutation,
//! persisted to a local key-value store, and exposed to UI layers through a
//! reactive view plus a notification side channel.
//!
//! # Architecture
//!
//! - [`store::CartStore`] holds the cart behind an async mutex and runs the
//!   whole check-stock / mutate / persist sequence under it
//! - [`catalog::CatalogApi`] abstracts the remote catalog and stock
//!   endpoints; [`catalog::HttpCatalogClient`] is the REST implementation
//! - [`storage::KeyValueStorage`] abstracts the persisted snapshot;
//!   [`storage::JsonFileStorage`] is the shipped file-backed implementation
//! - [`notify::Notifier`] broadcasts one user-facing message per failed
//!   operation; successful operations stay silent
//!
//! # Example
//!
//! ```rust,ignore
//! use wicker_store::{CartStore, StoreConfig};
//! use wicker_core::ProductId;
//!
//! let config = StoreConfig::from_env()?;
//! let cart = CartStore::from_config(&config)?;
//!
//! cart.add_product(ProductId::new(1)).await?;
//! cart.update_product_amount(ProductId::new(1), 3).await?;
//! for entry in cart.entries() {
//!     println!("{} x{}", entry.product.name, entry.amount);
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod notify;
pub mod storage;
pub mod store;

pub use catalog::{CatalogApi, CatalogError, HttpCatalogClient};
pub use config::{ConfigError, StoreConfig};
pub use error::CartError;
pub use notify::{Notification, Notifier};
pub use storage::{JsonFileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use store::{CART_STORAGE_KEY, CartStore};
