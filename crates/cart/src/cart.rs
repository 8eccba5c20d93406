use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{
    AggregateRoot, CartId, CartItemId, DomainError, DomainResult, OrderId, ProductId, UserId,
};

/// One product line in a cart.
///
/// `unit_price_snapshot` is the price shown when the item was added. It is
/// display-only: checkout always reprices from live supplier listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Price in smallest currency unit.
    pub unit_price_snapshot: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    pub fn line_total(&self) -> u64 {
        u64::from(self.quantity).saturating_mul(self.unit_price_snapshot)
    }

    /// Merge a partial update: fields left as `None` keep their current value.
    ///
    /// Returns whether anything changed.
    pub fn apply_patch(&mut self, patch: &CartItemPatch, now: DateTime<Utc>) -> DomainResult<bool> {
        if patch.quantity == Some(0) {
            return Err(DomainError::zero_quantity());
        }
        if patch
            .product_name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(DomainError::validation("product_name cannot be empty"));
        }

        let mut changed = false;
        if let Some(quantity) = patch.quantity {
            changed |= self.quantity != quantity;
            self.quantity = quantity;
        }
        if let Some(name) = &patch.product_name {
            changed |= &self.product_name != name;
            self.product_name = name.clone();
        }
        if let Some(price) = patch.unit_price_snapshot {
            changed |= self.unit_price_snapshot != price;
            self.unit_price_snapshot = price;
        }
        if changed {
            self.updated_at = now;
        }
        Ok(changed)
    }
}

/// Partial update for a cart item (`None` = leave unchanged).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemPatch {
    pub quantity: Option<u32>,
    pub product_name: Option<String>,
    pub unit_price_snapshot: Option<u64>,
}

/// Aggregate root: Cart.
///
/// # Invariants
/// - Every item has `quantity >= 1` and at most one item exists per product.
/// - A cart is checked out at most once; afterwards it is immutable and
///   carries the order it was converted into.
/// - Item ids are unique within the cart.
///
/// "One active cart per user" spans carts and is enforced by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    user_id: UserId,
    order_id: Option<OrderId>,
    is_checked_out: bool,
    items: Vec<CartItem>,
    next_item_seq: u64,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(id: CartId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            order_id: None,
            is_checked_out: false,
            items: Vec::new(),
            next_item_seq: 1,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id_typed(&self) -> CartId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    pub fn is_checked_out(&self) -> bool {
        self.is_checked_out
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Sum of snapshot line totals (display only).
    pub fn snapshot_total(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |acc, i| acc.saturating_add(i.line_total()))
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Add `quantity` of a product. Adding a product already in the cart
    /// merges into its line and refreshes the snapshot price.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: u32,
        unit_price: u64,
        now: DateTime<Utc>,
    ) -> DomainResult<CartItemId> {
        self.ensure_open()?;
        if quantity == 0 {
            return Err(DomainError::zero_quantity());
        }
        let product_name = product_name.into();
        if product_name.trim().is_empty() {
            return Err(DomainError::validation("product_name cannot be empty"));
        }

        let id = if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id)
        {
            existing.quantity = existing
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| DomainError::validation("quantity is too large"))?;
            existing.unit_price_snapshot = unit_price;
            existing.product_name = product_name;
            existing.updated_at = now;
            existing.id
        } else {
            let id = CartItemId::new(self.next_item_seq);
            self.next_item_seq += 1;
            self.items.push(CartItem {
                id,
                cart_id: self.id,
                product_id,
                product_name,
                quantity,
                unit_price_snapshot: unit_price,
                created_at: now,
                updated_at: now,
            });
            id
        };

        self.touch(now);
        Ok(id)
    }

    pub fn update_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let patch = CartItemPatch {
            quantity: Some(quantity),
            ..CartItemPatch::default()
        };
        self.patch_item(item_id, &patch, now).map(|_| ())
    }

    /// Apply a partial update to one item. Returns whether anything changed.
    pub fn patch_item(
        &mut self,
        item_id: CartItemId,
        patch: &CartItemPatch,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        self.ensure_open()?;
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| DomainError::not_found(format!("cart item {item_id}")))?;

        let changed = item.apply_patch(patch, now)?;
        if changed {
            self.touch(now);
        }
        Ok(changed)
    }

    pub fn remove_item(&mut self, item_id: CartItemId, now: DateTime<Utc>) -> DomainResult<CartItem> {
        self.ensure_open()?;
        let idx = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| DomainError::not_found(format!("cart item {item_id}")))?;
        let removed = self.items.remove(idx);
        self.touch(now);
        Ok(removed)
    }

    /// Freeze the cart as converted into `order_id`. Happens exactly once.
    pub fn mark_checked_out(&mut self, order_id: OrderId, now: DateTime<Utc>) -> DomainResult<()> {
        self.ensure_open()?;
        if self.items.is_empty() {
            return Err(DomainError::validation("cannot check out an empty cart"));
        }
        self.order_id = Some(order_id);
        self.is_checked_out = true;
        self.touch(now);
        Ok(())
    }

    fn ensure_open(&self) -> DomainResult<()> {
        if self.is_checked_out {
            return Err(DomainError::invariant(
                "cart is checked out and can no longer be modified",
            ));
        }
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version += 1;
    }
}

impl AggregateRoot for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart() -> Cart {
        Cart::new(CartId::new(1), UserId::new(), Utc::now())
    }

    #[test]
    fn adding_same_product_twice_merges_lines() {
        let mut cart = cart();
        let now = Utc::now();
        let a = cart.add_item(ProductId::new(1), "Rose", 2, 100_000, now).unwrap();
        let b = cart.add_item(ProductId::new(1), "Rose", 3, 95_000, now).unwrap();

        assert_eq!(a, b);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 5);
        assert_eq!(cart.items()[0].unit_price_snapshot, 95_000);
        assert_eq!(cart.snapshot_total(), 475_000);
    }

    #[test]
    fn item_ids_are_never_reused() {
        let mut cart = cart();
        let now = Utc::now();
        let first = cart.add_item(ProductId::new(1), "Rose", 1, 10, now).unwrap();
        cart.remove_item(first, now).unwrap();
        let second = cart.add_item(ProductId::new(2), "Tulip", 1, 10, now).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut cart = cart();
        let now = Utc::now();
        let err = cart.add_item(ProductId::new(1), "Rose", 0, 10, now).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let id = cart.add_item(ProductId::new(1), "Rose", 1, 10, now).unwrap();
        assert!(cart.update_quantity(id, 0, now).is_err());
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn patch_skips_absent_fields() {
        let mut cart = cart();
        let now = Utc::now();
        let id = cart.add_item(ProductId::new(1), "Rose", 1, 10, now).unwrap();
        let version = cart.version();

        let changed = cart
            .patch_item(
                id,
                &CartItemPatch {
                    quantity: Some(4),
                    ..CartItemPatch::default()
                },
                now,
            )
            .unwrap();
        assert!(changed);
        let item = cart.item(id).unwrap();
        assert_eq!(item.quantity, 4);
        assert_eq!(item.product_name, "Rose");
        assert_eq!(item.unit_price_snapshot, 10);
        assert_eq!(cart.version(), version + 1);

        let unchanged = cart.patch_item(id, &CartItemPatch::default(), now).unwrap();
        assert!(!unchanged);
        assert_eq!(cart.version(), version + 1);
    }

    #[test]
    fn unknown_item_is_not_found() {
        let mut cart = cart();
        let err = cart.remove_item(CartItemId::new(99), Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn checked_out_cart_is_immutable() {
        let mut cart = cart();
        let now = Utc::now();
        let id = cart.add_item(ProductId::new(1), "Rose", 1, 10, now).unwrap();
        cart.mark_checked_out(OrderId::new(7), now).unwrap();

        assert!(cart.is_checked_out());
        assert_eq!(cart.order_id(), Some(OrderId::new(7)));
        for err in [
            cart.clone().add_item(ProductId::new(2), "Lily", 1, 10, now).unwrap_err(),
            cart.clone().update_quantity(id, 2, now).unwrap_err(),
            cart.clone().remove_item(id, now).map(|_| ()).unwrap_err(),
            cart.clone().mark_checked_out(OrderId::new(8), now).unwrap_err(),
        ] {
            assert!(matches!(err, DomainError::InvariantViolation(_)));
        }
    }

    #[test]
    fn empty_cart_cannot_be_checked_out() {
        let mut cart = cart();
        assert!(cart.mark_checked_out(OrderId::new(1), Utc::now()).is_err());
        assert!(!cart.is_checked_out());
    }
}
