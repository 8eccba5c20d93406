//! Supplier listings: the live source of truth for price and availability.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::{ListingId, ProductId, SupplierId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Inactive,
}

/// A supplier's current offer for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierListing {
    pub listing_id: ListingId,
    pub supplier_id: SupplierId,
    pub product_id: ProductId,
    pub available_quantity: u32,
    /// Price in smallest currency unit.
    pub unit_price: u64,
    /// Smallest quantity this supplier will ship in one order line.
    pub min_order_qty: u32,
    pub status: ListingStatus,
}

impl SupplierListing {
    /// Active and holding stock.
    pub fn is_sellable(&self) -> bool {
        self.status == ListingStatus::Active && self.available_quantity > 0
    }
}

/// The supplier data store could not answer.
///
/// Always propagated to the caller; the domain never retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("supplier lookup unavailable: {0}")]
    Unavailable(String),

    #[error("supplier lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// Read access to current supplier listings.
pub trait SupplierLookup {
    /// All listings for `product_id` (any status). Unknown products yield an
    /// empty list, not an error.
    fn listings(&self, product_id: ProductId) -> Result<Vec<SupplierListing>, LookupError>;
}

impl<T: SupplierLookup + ?Sized> SupplierLookup for &T {
    fn listings(&self, product_id: ProductId) -> Result<Vec<SupplierListing>, LookupError> {
        (**self).listings(product_id)
    }
}

/// Live availability of one product across all its sellable listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: u32,
    /// Lowest sellable unit price; 0 when nothing is sellable.
    pub unit_price: u64,
}

impl Availability {
    pub fn of(product_id: ProductId, listings: &[SupplierListing]) -> Self {
        listings
            .iter()
            .filter(|l| l.product_id == product_id && l.is_sellable())
            .fold(None::<Availability>, |acc, l| {
                Some(match acc {
                    None => Availability {
                        available: l.available_quantity,
                        unit_price: l.unit_price,
                    },
                    Some(a) => Availability {
                        available: a.available.saturating_add(l.available_quantity),
                        unit_price: a.unit_price.min(l.unit_price),
                    },
                })
            })
            .unwrap_or_default()
    }
}

/// An in-memory, point-in-time copy of the listings for a set of products.
///
/// The infra layer fetches one of these per request so that validation and
/// pricing see the same data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierSnapshot {
    by_product: BTreeMap<ProductId, Vec<SupplierListing>>,
}

impl SupplierSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, listing: SupplierListing) {
        self.by_product
            .entry(listing.product_id)
            .or_default()
            .push(listing);
    }

    pub fn len(&self) -> usize {
        self.by_product.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_product.is_empty()
    }
}

impl FromIterator<SupplierListing> for SupplierSnapshot {
    fn from_iter<I: IntoIterator<Item = SupplierListing>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for listing in iter {
            snapshot.insert(listing);
        }
        snapshot
    }
}

impl SupplierLookup for SupplierSnapshot {
    fn listings(&self, product_id: ProductId) -> Result<Vec<SupplierListing>, LookupError> {
        Ok(self.by_product.get(&product_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: u64, product: u64, qty: u32, price: u64, status: ListingStatus) -> SupplierListing {
        SupplierListing {
            listing_id: ListingId::new(id),
            supplier_id: SupplierId::new(id),
            product_id: ProductId::new(product),
            available_quantity: qty,
            unit_price: price,
            min_order_qty: 1,
            status,
        }
    }

    #[test]
    fn availability_sums_sellable_stock_and_takes_lowest_price() {
        let listings = vec![
            listing(1, 1, 3, 90_000, ListingStatus::Active),
            listing(2, 1, 4, 85_000, ListingStatus::Active),
            listing(3, 1, 50, 10_000, ListingStatus::Inactive),
            listing(4, 1, 0, 5_000, ListingStatus::Active),
        ];
        let a = Availability::of(ProductId::new(1), &listings);
        assert_eq!(a.available, 7);
        assert_eq!(a.unit_price, 85_000);
    }

    #[test]
    fn nothing_sellable_means_zero() {
        let a = Availability::of(ProductId::new(1), &[]);
        assert_eq!(a, Availability::default());
    }

    #[test]
    fn snapshot_groups_by_product_and_tolerates_unknown_products() {
        let snapshot: SupplierSnapshot = vec![
            listing(1, 1, 3, 90_000, ListingStatus::Active),
            listing(2, 2, 4, 85_000, ListingStatus::Active),
            listing(3, 1, 1, 80_000, ListingStatus::Active),
        ]
        .into_iter()
        .collect();

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.listings(ProductId::new(1)).unwrap().len(), 2);
        assert!(snapshot.listings(ProductId::new(9)).unwrap().is_empty());
    }
}
