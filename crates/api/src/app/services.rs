//! Service wiring for the HTTP layer.

use std::sync::Arc;

use storefront_auth::{AuthorizationGuard, PermissionCatalog};
use storefront_cart::{DiscountPolicy, ListingStatus, LookupError, SupplierListing};
use storefront_core::{BasisPoints, ListingId, ProductId, SupplierId};
use storefront_infra::{
    CartService, CheckoutService, InMemoryCartRepository, InMemoryOrderRepository,
    InMemoryPromotions, InMemorySupplierStore, StorefrontConfig,
};

/// Everything handlers need, shared behind an `Arc`.
#[derive(Clone)]
pub struct AppServices {
    pub guard: AuthorizationGuard,
    pub cart: CartService,
    pub checkout: CheckoutService,
    /// Seeding handles for the in-memory supplier catalog.
    pub stock: Arc<InMemorySupplierStore>,
    pub promotions: Arc<InMemoryPromotions>,
}

impl AppServices {
    /// In-memory wiring (dev/test).
    pub fn in_memory(config: StorefrontConfig) -> Self {
        let guard = AuthorizationGuard::new(Arc::new(PermissionCatalog::seeded()))
            .with_role_match(config.role_match);
        let stock = Arc::new(InMemorySupplierStore::new());
        let promotions = Arc::new(InMemoryPromotions::new());
        let carts = Arc::new(InMemoryCartRepository::new());
        let orders = Arc::new(InMemoryOrderRepository::new());

        let cart = CartService::new(
            guard.clone(),
            stock.clone(),
            carts.clone(),
            config.supplier_timeout,
        );
        let checkout = CheckoutService::new(
            guard.clone(),
            config,
            stock.clone(),
            promotions.clone(),
            carts,
            orders,
        );

        Self {
            guard,
            cart,
            checkout,
            stock,
            promotions,
        }
    }

    /// A small flower catalog so a fresh dev server has something to sell.
    pub fn seed_demo_catalog(&self) -> Result<(), LookupError> {
        let catalog: [(u64, &str, &[(u64, u32, u64, u32)]); 3] = [
            (1, "Red Rose", &[(1, 40, 90_000, 1), (2, 100, 95_000, 10)]),
            (2, "White Lily", &[(3, 25, 60_000, 1)]),
            (3, "Sunflower Bouquet", &[(4, 8, 250_000, 1), (5, 12, 240_000, 5)]),
        ];

        for (product, name, listings) in catalog {
            let product_id = ProductId::new(product);
            self.stock.register_product(product_id, name)?;
            for &(listing, available, price, min_order_qty) in listings {
                self.stock.upsert(SupplierListing {
                    listing_id: ListingId::new(listing),
                    supplier_id: SupplierId::new(listing),
                    product_id,
                    available_quantity: available,
                    unit_price: price,
                    min_order_qty,
                    status: ListingStatus::Active,
                })?;
            }
        }

        self.promotions.insert(
            "WELCOME10",
            DiscountPolicy::Percentage(BasisPoints::from_percent(10)),
        )?;
        Ok(())
    }
}
