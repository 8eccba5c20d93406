//! Persistence collaborators for carts, orders, supplier stock and promotions.
//!
//! Each concern is a trait plus an in-memory implementation for tests/dev.
//! Cart and order repositories are synchronous (local state behind a lock);
//! supplier and promotion sources are async because in production they sit
//! behind a network hop.

pub mod carts;
pub mod orders;
pub mod promotions;
pub mod suppliers;

use thiserror::Error;

pub use carts::{CartRepository, InMemoryCartRepository};
pub use orders::{InMemoryOrderRepository, OrderRepository, OrderStatus, PlacedOrder};
pub use promotions::{InMemoryPromotions, PromotionSource};
pub use suppliers::{InMemorySupplierStore, StockError, SupplierSource, fetch_snapshot, within};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Optimistic concurrency or uniqueness failure.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        StoreError::Unavailable("lock poisoned".to_string())
    }
}
