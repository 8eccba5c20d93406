//! Cart domain: the cart aggregate plus the validate → price → assemble
//! pipeline that turns a cart into an order draft.
//!
//! Everything here is deterministic domain logic over snapshots passed in by
//! the caller (no IO, no clocks, no shared state). Supplier data arrives
//! through the [`SupplierLookup`] capability; its failures are propagated,
//! never retried.

pub mod cart;
pub mod checkout;
pub mod pricing;
pub mod supplier;
pub mod validation;

pub use cart::{Cart, CartItem, CartItemPatch};
pub use checkout::{
    CartIssue, DiscountPolicy, InvalidCartError, IssueKind, OrderDraft, OrderLine,
    ShippingPolicy, TaxPolicy, assemble, pricing_issues, validation_issues,
};
pub use pricing::{
    PriceCalculationResult, PricedItem, PricingPolicy, ServiceFee, SupplierAllocation, calculate,
    quote,
};
pub use supplier::{
    Availability, ListingStatus, LookupError, SupplierListing, SupplierLookup, SupplierSnapshot,
};
pub use validation::{ValidatedItem, ValidationResult, validate};
