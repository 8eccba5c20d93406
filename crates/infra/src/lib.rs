//! Infrastructure layer: configuration, storage collaborators and the
//! application services that wire them to the cart engines.

pub mod config;
pub mod service;
pub mod store;

pub use config::{ConfigError, StorefrontConfig};
pub use service::{CartService, CheckoutService, ServiceError, ServiceResult};
pub use store::{
    CartRepository, InMemoryCartRepository, InMemoryOrderRepository, InMemoryPromotions,
    InMemorySupplierStore, OrderRepository, OrderStatus, PlacedOrder, PromotionSource, StockError,
    StoreError, SupplierSource,
};
