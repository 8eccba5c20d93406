use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use storefront_cart::{
    ListingStatus, LookupError, SupplierAllocation, SupplierListing, SupplierSnapshot,
};
use storefront_core::{ListingId, OrderId, ProductId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("listing {listing_id} can no longer supply {requested} (available: {available})")]
    Insufficient {
        listing_id: ListingId,
        requested: u32,
        available: u32,
    },

    #[error("unknown supplier listing {0}")]
    UnknownListing(ListingId),

    #[error("supplier store unavailable: {0}")]
    Unavailable(String),
}

/// The supplier data store.
///
/// Reads feed the pricing and validation engines through a
/// [`SupplierSnapshot`]; writes commit stock for a placed order.
#[async_trait]
pub trait SupplierSource: Send + Sync {
    /// Every listing (any status) for the given products.
    async fn listings_for(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<SupplierListing>, LookupError>;

    /// Display name of a product, `None` if the catalog does not know it.
    async fn product_name(&self, product_id: ProductId) -> Result<Option<String>, LookupError>;

    /// Deduct an allocation's quantity for `order_id`.
    ///
    /// Idempotent per `(order_id, listing_id)`: a repeated call is a no-op.
    async fn deduct(
        &self,
        order_id: OrderId,
        allocation: &SupplierAllocation,
    ) -> Result<(), StockError>;

    /// Undo a previous [`deduct`](Self::deduct). No-op if nothing was deducted.
    async fn restore(
        &self,
        order_id: OrderId,
        allocation: &SupplierAllocation,
    ) -> Result<(), StockError>;
}

/// Fetch one consistent snapshot for a request, bounded by `timeout`.
pub async fn fetch_snapshot<S>(
    source: &S,
    product_ids: &[ProductId],
    timeout: Duration,
) -> Result<SupplierSnapshot, LookupError>
where
    S: SupplierSource + ?Sized,
{
    if product_ids.is_empty() {
        return Ok(SupplierSnapshot::new());
    }

    let listings = within(timeout, source.listings_for(product_ids)).await?;
    Ok(listings.into_iter().collect())
}

/// Bound a lookup by `timeout`, turning expiry into [`LookupError::Timeout`].
pub async fn within<T, F>(timeout: Duration, lookup: F) -> Result<T, LookupError>
where
    F: Future<Output = Result<T, LookupError>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "lookup timed out");
            Err(LookupError::Timeout(timeout))
        }
    }
}

#[derive(Debug, Default)]
struct Stock {
    listings: BTreeMap<ListingId, SupplierListing>,
    products: BTreeMap<ProductId, String>,
    /// `(order, listing)` → deducted quantity.
    deductions: BTreeMap<(OrderId, ListingId), u32>,
}

/// In-memory supplier store for tests/dev.
///
/// Each deduction is a read-check-update under one write lock, the
/// equivalent of a row lock on the listing.
#[derive(Debug, Default)]
pub struct InMemorySupplierStore {
    inner: RwLock<Stock>,
}

impl InMemorySupplierStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a product's display name.
    pub fn register_product(
        &self,
        product_id: ProductId,
        name: impl Into<String>,
    ) -> Result<(), LookupError> {
        let mut stock = self.write()?;
        stock.products.insert(product_id, name.into());
        Ok(())
    }

    /// Insert or replace a listing.
    pub fn upsert(&self, listing: SupplierListing) -> Result<(), LookupError> {
        let mut stock = self.write()?;
        stock.listings.insert(listing.listing_id, listing);
        Ok(())
    }

    pub fn set_status(&self, listing_id: ListingId, status: ListingStatus) -> Result<(), StockError> {
        let mut stock = self
            .inner
            .write()
            .map_err(|_| StockError::Unavailable("lock poisoned".to_string()))?;
        let listing = stock
            .listings
            .get_mut(&listing_id)
            .ok_or(StockError::UnknownListing(listing_id))?;
        listing.status = status;
        Ok(())
    }

    pub fn listing(&self, listing_id: ListingId) -> Option<SupplierListing> {
        let stock = self.inner.read().ok()?;
        stock.listings.get(&listing_id).cloned()
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Stock>, LookupError> {
        self.inner
            .write()
            .map_err(|_| LookupError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait]
impl SupplierSource for InMemorySupplierStore {
    async fn listings_for(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<SupplierListing>, LookupError> {
        let wanted: HashSet<ProductId> = product_ids.iter().copied().collect();
        let stock = self
            .inner
            .read()
            .map_err(|_| LookupError::Unavailable("lock poisoned".to_string()))?;
        Ok(stock
            .listings
            .values()
            .filter(|l| wanted.contains(&l.product_id))
            .cloned()
            .collect())
    }

    async fn product_name(&self, product_id: ProductId) -> Result<Option<String>, LookupError> {
        let stock = self
            .inner
            .read()
            .map_err(|_| LookupError::Unavailable("lock poisoned".to_string()))?;
        Ok(stock.products.get(&product_id).cloned())
    }

    async fn deduct(
        &self,
        order_id: OrderId,
        allocation: &SupplierAllocation,
    ) -> Result<(), StockError> {
        let mut stock = self
            .inner
            .write()
            .map_err(|_| StockError::Unavailable("lock poisoned".to_string()))?;
        let key = (order_id, allocation.listing_id);
        if stock.deductions.contains_key(&key) {
            return Ok(());
        }

        let listing = stock
            .listings
            .get_mut(&allocation.listing_id)
            .ok_or(StockError::UnknownListing(allocation.listing_id))?;
        if listing.status != ListingStatus::Active
            || listing.available_quantity < allocation.quantity
        {
            return Err(StockError::Insufficient {
                listing_id: allocation.listing_id,
                requested: allocation.quantity,
                available: if listing.status == ListingStatus::Active {
                    listing.available_quantity
                } else {
                    0
                },
            });
        }

        listing.available_quantity -= allocation.quantity;
        stock.deductions.insert(key, allocation.quantity);
        Ok(())
    }

    async fn restore(
        &self,
        order_id: OrderId,
        allocation: &SupplierAllocation,
    ) -> Result<(), StockError> {
        let mut stock = self
            .inner
            .write()
            .map_err(|_| StockError::Unavailable("lock poisoned".to_string()))?;
        let Some(quantity) = stock.deductions.remove(&(order_id, allocation.listing_id)) else {
            return Ok(());
        };

        let listing = stock
            .listings
            .get_mut(&allocation.listing_id)
            .ok_or(StockError::UnknownListing(allocation.listing_id))?;
        listing.available_quantity = listing.available_quantity.saturating_add(quantity);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::SupplierId;

    fn listing(id: u64, product: u64, qty: u32, price: u64) -> SupplierListing {
        SupplierListing {
            listing_id: ListingId::new(id),
            supplier_id: SupplierId::new(id),
            product_id: ProductId::new(product),
            available_quantity: qty,
            unit_price: price,
            min_order_qty: 1,
            status: ListingStatus::Active,
        }
    }

    fn allocation(listing: u64, quantity: u32) -> SupplierAllocation {
        SupplierAllocation {
            listing_id: ListingId::new(listing),
            supplier_id: SupplierId::new(listing),
            quantity,
            unit_price: 90_000,
        }
    }

    fn store() -> InMemorySupplierStore {
        let store = InMemorySupplierStore::new();
        store.upsert(listing(1, 1, 10, 90_000)).unwrap();
        store.upsert(listing(2, 2, 4, 50_000)).unwrap();
        store
    }

    #[tokio::test]
    async fn snapshot_contains_only_requested_products() {
        let store = store();
        let snapshot = fetch_snapshot(&store, &[ProductId::new(1)], Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn deduction_is_idempotent_per_order() {
        let store = store();
        let order = OrderId::new(1);

        store.deduct(order, &allocation(1, 3)).await.unwrap();
        store.deduct(order, &allocation(1, 3)).await.unwrap();
        assert_eq!(store.listing(ListingId::new(1)).unwrap().available_quantity, 7);

        // A different order deducts again.
        store.deduct(OrderId::new(2), &allocation(1, 3)).await.unwrap();
        assert_eq!(store.listing(ListingId::new(1)).unwrap().available_quantity, 4);
    }

    #[tokio::test]
    async fn over_deduction_is_refused_without_side_effects() {
        let store = store();
        let err = store.deduct(OrderId::new(1), &allocation(2, 5)).await.unwrap_err();
        assert_eq!(
            err,
            StockError::Insufficient {
                listing_id: ListingId::new(2),
                requested: 5,
                available: 4,
            }
        );
        assert_eq!(store.listing(ListingId::new(2)).unwrap().available_quantity, 4);
    }

    #[tokio::test]
    async fn restore_reverses_only_what_was_deducted() {
        let store = store();
        let order = OrderId::new(1);
        store.restore(order, &allocation(1, 3)).await.unwrap();
        assert_eq!(store.listing(ListingId::new(1)).unwrap().available_quantity, 10);

        store.deduct(order, &allocation(1, 3)).await.unwrap();
        store.restore(order, &allocation(1, 3)).await.unwrap();
        store.restore(order, &allocation(1, 3)).await.unwrap();
        assert_eq!(store.listing(ListingId::new(1)).unwrap().available_quantity, 10);
    }

    #[tokio::test]
    async fn inactive_listings_cannot_be_deducted() {
        let store = store();
        store.set_status(ListingId::new(1), ListingStatus::Inactive).unwrap();
        let err = store.deduct(OrderId::new(1), &allocation(1, 1)).await.unwrap_err();
        assert!(matches!(err, StockError::Insufficient { available: 0, .. }));
    }

    struct Stalled;

    #[async_trait]
    impl SupplierSource for Stalled {
        async fn listings_for(&self, _: &[ProductId]) -> Result<Vec<SupplierListing>, LookupError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }

        async fn product_name(&self, _: ProductId) -> Result<Option<String>, LookupError> {
            Ok(None)
        }

        async fn deduct(&self, _: OrderId, _: &SupplierAllocation) -> Result<(), StockError> {
            Ok(())
        }

        async fn restore(&self, _: OrderId, _: &SupplierAllocation) -> Result<(), StockError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_lookups_time_out() {
        let timeout = Duration::from_millis(50);
        let err = fetch_snapshot(&Stalled, &[ProductId::new(1)], timeout)
            .await
            .unwrap_err();
        assert_eq!(err, LookupError::Timeout(timeout));
    }
}
