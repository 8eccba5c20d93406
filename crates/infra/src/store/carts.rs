use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use storefront_cart::Cart;
use storefront_core::{AggregateRoot, CartId, ExpectedVersion, UserId};

use super::StoreError;

/// Cart persistence.
///
/// Enforces "at most one active (not checked out) cart per user" across all
/// writes, and optimistic concurrency on `save`.
pub trait CartRepository: Send + Sync {
    fn get(&self, cart_id: CartId) -> Result<Option<Cart>, StoreError>;

    /// The user's cart that has not been checked out yet, if any.
    fn active_for(&self, user_id: UserId) -> Result<Option<Cart>, StoreError>;

    /// Create an empty active cart. Fails with `Conflict` if one exists.
    fn create(&self, user_id: UserId, now: DateTime<Utc>) -> Result<Cart, StoreError>;

    /// Persist `cart` if the stored copy is still at `expected`.
    fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<(), StoreError>;
}

impl<S> CartRepository for Arc<S>
where
    S: CartRepository + ?Sized,
{
    fn get(&self, cart_id: CartId) -> Result<Option<Cart>, StoreError> {
        (**self).get(cart_id)
    }

    fn active_for(&self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        (**self).active_for(user_id)
    }

    fn create(&self, user_id: UserId, now: DateTime<Utc>) -> Result<Cart, StoreError> {
        (**self).create(user_id, now)
    }

    fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).save(cart, expected)
    }
}

#[derive(Debug, Default)]
struct Carts {
    by_id: HashMap<CartId, Cart>,
    active: HashMap<UserId, CartId>,
    last_id: u64,
}

/// In-memory cart store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCartRepository {
    inner: RwLock<Carts>,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartRepository for InMemoryCartRepository {
    fn get(&self, cart_id: CartId) -> Result<Option<Cart>, StoreError> {
        let carts = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(carts.by_id.get(&cart_id).cloned())
    }

    fn active_for(&self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        let carts = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(carts
            .active
            .get(&user_id)
            .and_then(|id| carts.by_id.get(id))
            .cloned())
    }

    fn create(&self, user_id: UserId, now: DateTime<Utc>) -> Result<Cart, StoreError> {
        let mut carts = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if let Some(existing) = carts.active.get(&user_id) {
            return Err(StoreError::Conflict(format!(
                "user {user_id} already has active cart {existing}"
            )));
        }

        carts.last_id += 1;
        let cart = Cart::new(CartId::new(carts.last_id), user_id, now);
        carts.active.insert(user_id, cart.id_typed());
        carts.by_id.insert(cart.id_typed(), cart.clone());
        Ok(cart)
    }

    fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut carts = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let id = cart.id_typed();

        let stored = carts
            .by_id
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("cart {id}")))?;
        if stored.user_id() != cart.user_id() {
            return Err(StoreError::Conflict(format!("cart {id} changed owner")));
        }
        if stored.is_checked_out() {
            return Err(StoreError::Conflict(format!("cart {id} is already checked out")));
        }
        if !expected.matches(stored.version()) {
            return Err(StoreError::Conflict(format!(
                "cart {id}: expected {expected:?}, found {}",
                stored.version()
            )));
        }

        if cart.is_checked_out() {
            carts.active.remove(&cart.user_id());
        }
        carts.by_id.insert(id, cart.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::{OrderId, ProductId};

    #[test]
    fn one_active_cart_per_user() {
        let repo = InMemoryCartRepository::new();
        let user = UserId::new();
        let now = Utc::now();

        let cart = repo.create(user, now).unwrap();
        assert!(matches!(repo.create(user, now), Err(StoreError::Conflict(_))));
        assert_eq!(repo.active_for(user).unwrap().unwrap().id_typed(), cart.id_typed());

        // Another user is unaffected.
        assert!(repo.create(UserId::new(), now).is_ok());
    }

    #[test]
    fn stale_writes_are_rejected() {
        let repo = InMemoryCartRepository::new();
        let user = UserId::new();
        let now = Utc::now();
        let cart = repo.create(user, now).unwrap();

        let mut first = cart.clone();
        first.add_item(ProductId::new(1), "Rose", 1, 10, now).unwrap();
        repo.save(&first, ExpectedVersion::Exact(cart.version())).unwrap();

        let mut second = cart.clone();
        second.add_item(ProductId::new(2), "Lily", 1, 10, now).unwrap();
        let err = repo.save(&second, ExpectedVersion::Exact(cart.version())).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let stored = repo.get(cart.id_typed()).unwrap().unwrap();
        assert_eq!(stored.items()[0].product_id, ProductId::new(1));
    }

    #[test]
    fn checkout_releases_the_active_slot() {
        let repo = InMemoryCartRepository::new();
        let user = UserId::new();
        let now = Utc::now();
        let mut cart = repo.create(user, now).unwrap();
        let loaded = cart.version();
        cart.add_item(ProductId::new(1), "Rose", 1, 10, now).unwrap();
        cart.mark_checked_out(OrderId::new(1), now).unwrap();
        repo.save(&cart, ExpectedVersion::Exact(loaded)).unwrap();

        assert!(repo.active_for(user).unwrap().is_none());
        let next = repo.create(user, now).unwrap();
        assert_ne!(next.id_typed(), cart.id_typed());

        // The frozen cart cannot be written again.
        let err = repo.save(&cart, ExpectedVersion::Any).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
