//! Core types for Wicker.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod product;

pub use cart::CartEntry;
pub use id::*;
pub use product::{ProductRecord, StockLevel};
