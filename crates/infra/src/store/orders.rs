use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_cart::OrderDraft;
use storefront_core::{CartId, OrderId, UserId};

use super::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Persisted and awaiting fulfilment.
    Pending,
    /// Rolled back after a failed stock commit.
    Cancelled,
}

/// An order draft after persistence assigned its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    /// `ORD-YYYYMMDD-NNNNNN`, unique per order.
    pub order_number: String,
    pub user_id: UserId,
    pub cart_id: CartId,
    pub status: OrderStatus,
    pub draft: OrderDraft,
    pub placed_at: DateTime<Utc>,
}

pub trait OrderRepository: Send + Sync {
    /// Persist a draft. At most one live order exists per cart.
    fn place(
        &self,
        user_id: UserId,
        cart_id: CartId,
        draft: OrderDraft,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, StoreError>;

    fn get(&self, order_id: OrderId) -> Result<Option<PlacedOrder>, StoreError>;

    fn list_for_user(&self, user_id: UserId) -> Result<Vec<PlacedOrder>, StoreError>;

    /// Compensation for a placed order whose follow-up steps failed.
    fn cancel(&self, order_id: OrderId) -> Result<(), StoreError>;
}

impl<S> OrderRepository for Arc<S>
where
    S: OrderRepository + ?Sized,
{
    fn place(
        &self,
        user_id: UserId,
        cart_id: CartId,
        draft: OrderDraft,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, StoreError> {
        (**self).place(user_id, cart_id, draft, now)
    }

    fn get(&self, order_id: OrderId) -> Result<Option<PlacedOrder>, StoreError> {
        (**self).get(order_id)
    }

    fn list_for_user(&self, user_id: UserId) -> Result<Vec<PlacedOrder>, StoreError> {
        (**self).list_for_user(user_id)
    }

    fn cancel(&self, order_id: OrderId) -> Result<(), StoreError> {
        (**self).cancel(order_id)
    }
}

pub(crate) fn order_number(order_id: OrderId, placed_at: DateTime<Utc>) -> String {
    format!("ORD-{}-{:06}", placed_at.format("%Y%m%d"), order_id.get())
}

#[derive(Debug, Default)]
struct Orders {
    by_id: HashMap<OrderId, PlacedOrder>,
    last_id: u64,
}

/// In-memory order store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    inner: RwLock<Orders>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn place(
        &self,
        user_id: UserId,
        cart_id: CartId,
        draft: OrderDraft,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, StoreError> {
        let mut orders = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if let Some(existing) = orders
            .by_id
            .values()
            .find(|o| o.cart_id == cart_id && o.status == OrderStatus::Pending)
        {
            return Err(StoreError::Conflict(format!(
                "cart {cart_id} was already converted into {}",
                existing.order_number
            )));
        }

        orders.last_id += 1;
        let order_id = OrderId::new(orders.last_id);
        let order = PlacedOrder {
            order_id,
            order_number: order_number(order_id, now),
            user_id,
            cart_id,
            status: OrderStatus::Pending,
            draft,
            placed_at: now,
        };
        orders.by_id.insert(order_id, order.clone());
        Ok(order)
    }

    fn get(&self, order_id: OrderId) -> Result<Option<PlacedOrder>, StoreError> {
        let orders = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(orders.by_id.get(&order_id).cloned())
    }

    fn list_for_user(&self, user_id: UserId) -> Result<Vec<PlacedOrder>, StoreError> {
        let orders = self.inner.read().map_err(|_| StoreError::poisoned())?;
        let mut mine: Vec<PlacedOrder> = orders
            .by_id
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by_key(|o| o.order_id);
        Ok(mine)
    }

    fn cancel(&self, order_id: OrderId) -> Result<(), StoreError> {
        let mut orders = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let order = orders
            .by_id
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))?;
        order.status = OrderStatus::Cancelled;
        Ok(())
    }
}
