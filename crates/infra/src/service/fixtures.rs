//! Shared wiring for service tests.

use std::sync::Arc;

use storefront_auth::{AuthorizationGuard, Claim, PermissionCatalog, Principal};
use storefront_cart::{ListingStatus, SupplierListing};
use storefront_core::{ListingId, ProductId, SupplierId, UserId};

use super::{CartService, CheckoutService};
use crate::config::StorefrontConfig;
use crate::store::{
    InMemoryCartRepository, InMemoryOrderRepository, InMemoryPromotions, InMemorySupplierStore,
    SupplierSource,
};

pub(crate) struct Harness {
    pub stock: Arc<InMemorySupplierStore>,
    pub promotions: Arc<InMemoryPromotions>,
    pub carts: Arc<InMemoryCartRepository>,
    pub orders: Arc<InMemoryOrderRepository>,
    pub cart: CartService,
    pub checkout: CheckoutService,
}

impl Harness {
    pub fn new() -> Self {
        let stock = Arc::new(InMemorySupplierStore::new());
        Self::with_source(stock.clone(), stock)
    }

    /// Route supplier traffic through `source` while seeding via `stock`.
    pub fn with_source(source: Arc<dyn SupplierSource>, stock: Arc<InMemorySupplierStore>) -> Self {
        let config = StorefrontConfig::default();
        let guard = AuthorizationGuard::new(Arc::new(PermissionCatalog::seeded()));
        let promotions = Arc::new(InMemoryPromotions::new());
        let carts = Arc::new(InMemoryCartRepository::new());
        let orders = Arc::new(InMemoryOrderRepository::new());

        Self {
            cart: CartService::new(
                guard.clone(),
                source.clone(),
                carts.clone(),
                config.supplier_timeout,
            ),
            checkout: CheckoutService::new(
                guard,
                config,
                source,
                promotions.clone(),
                carts.clone(),
                orders.clone(),
            ),
            stock,
            promotions,
            carts,
            orders,
        }
    }

    pub fn seed(&self, product: u64, name: &str, listings: &[SupplierListing]) {
        self.stock.register_product(ProductId::new(product), name).unwrap();
        for l in listings {
            self.stock.upsert(l.clone()).unwrap();
        }
    }

    pub fn available(&self, listing: u64) -> u32 {
        self.stock
            .listing(ListingId::new(listing))
            .unwrap()
            .available_quantity
    }
}

pub(crate) fn listing(id: u64, product: u64, qty: u32, price: u64) -> SupplierListing {
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

pub(crate) fn with_role(role: &str) -> Principal {
    Principal::authenticated(UserId::new(), vec![Claim::role(role)])
}

pub(crate) fn shopper() -> Principal {
    with_role("User")
}
