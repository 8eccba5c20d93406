use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_cart::{Cart, CartItem, OrderLine, SupplierAllocation};
use storefront_core::{CartId, CartItemId, OrderId, ProductId};
use storefront_infra::{OrderStatus, PlacedOrder};

// -------------------------
// Envelope
// -------------------------

/// Body shape shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub succeeded: bool,
    pub message: String,
    pub data: Option<T>,
    pub errors: Vec<String>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self::success_with(String::new(), data)
    }

    pub fn success_with(message: impl Into<String>, data: T) -> Self {
        Self {
            succeeded: true,
            message: message.into(),
            data: Some(data),
            errors: vec![],
        }
    }

    pub fn failure(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            succeeded: false,
            message: message.into(),
            data: None,
            errors,
        }
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub promo_code: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub line_total: u64,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price_snapshot,
            line_total: item.line_total(),
        }
    }
}

/// A cart as shown to its owner. Prices are the snapshots taken when items
/// were added; `POST /cart/price` gives live prices.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart_id: Option<CartId>,
    pub items: Vec<CartItemView>,
    pub total_quantity: u64,
    pub total: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartView {
    /// Shown before the first item is added.
    pub fn empty() -> Self {
        Self {
            cart_id: None,
            items: vec![],
            total_quantity: 0,
            total: 0,
            updated_at: None,
        }
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            cart_id: Some(cart.id_typed()),
            items: cart.items().iter().map(CartItemView::from).collect(),
            total_quantity: cart.total_quantity(),
            total: cart.snapshot_total(),
            updated_at: Some(cart.updated_at()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderLineView {
    pub line_no: u32,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub line_total: u64,
    pub suppliers: Vec<SupplierAllocation>,
}

impl From<&OrderLine> for OrderLineView {
    fn from(line: &OrderLine) -> Self {
        Self {
            line_no: line.line_no,
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
            suppliers: line.supplier_breakdown.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderView {
    pub order_id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    pub subtotal: u64,
    pub discount_amount: u64,
    pub service_fee: u64,
    pub tax_amount: u64,
    pub shipping_fee: u64,
    pub total_amount: u64,
    pub lines: Vec<OrderLineView>,
}

impl From<&PlacedOrder> for OrderView {
    fn from(order: &PlacedOrder) -> Self {
        let draft = &order.draft;
        Self {
            order_id: order.order_id,
            order_number: order.order_number.clone(),
            status: order.status,
            placed_at: order.placed_at,
            subtotal: draft.subtotal,
            discount_amount: draft.discount_amount,
            service_fee: draft.service_fee,
            tax_amount: draft.tax_amount,
            shipping_fee: draft.shipping_fee,
            total_amount: draft.total_amount,
            lines: draft.lines.iter().map(OrderLineView::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::UserId;

    #[test]
    fn cart_view_uses_snapshot_prices() {
        let now = Utc::now();
        let mut cart = Cart::new(CartId::new(3), UserId::new(), now);
        cart.add_item(ProductId::new(1), "Red Rose", 2, 100_000, now)
            .unwrap();

        let view = CartView::from(&cart);
        assert_eq!(view.cart_id, Some(CartId::new(3)));
        assert_eq!(view.items[0].line_total, 200_000);
        assert_eq!(view.total, 200_000);
        assert_eq!(view.total_quantity, 2);
    }

    #[test]
    fn failure_envelope_has_no_data() {
        let json = serde_json::to_value(Envelope::<()>::failure(
            "cart cannot be checked out",
            vec!["cart is empty".into()],
        ))
        .unwrap();
        assert_eq!(json["succeeded"], false);
        assert!(json["data"].is_null());
        assert_eq!(json["errors"][0], "cart is empty");
    }
}
