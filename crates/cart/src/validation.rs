//! Quantity validation against live supplier stock.

use serde::{Deserialize, Serialize};

use storefront_core::{CartItemId, ProductId};

use crate::cart::CartItem;
use crate::pricing::allocate;
use crate::supplier::{Availability, LookupError, SupplierLookup};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedItem {
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub requested_quantity: u32,
    /// Combined stock of sellable listings, reported whether or not the item
    /// is valid so the caller can offer "reduce to max". Supplier minimum
    /// order sizes can still rule out a quantity below this; the item's
    /// message then names how many can actually be supplied.
    pub max_available_quantity: u32,
    pub is_available: bool,
    /// Lowest live unit price (0 when nothing is sellable).
    pub unit_price: u64,
    /// `unit_price × requested_quantity`, for display only.
    pub requested_total: u64,
    /// Empty when the item is available.
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub items: Vec<ValidatedItem>,
    /// Availability of the first failing item; `None` when valid.
    pub max_quantity_allowed: Option<u32>,
    /// Best-effort total: `unit_price × min(requested, available)` summed.
    /// Not a checkout-usable subtotal.
    pub total_price: u64,
    /// Empty on success, otherwise the first failure (with a count of the rest).
    pub message: String,
}

impl ValidationResult {
    pub fn failing_items(&self) -> impl Iterator<Item = &ValidatedItem> {
        self.items.iter().filter(|i| !i.is_available)
    }
}

/// Check every requested quantity against live stock.
///
/// An item is available iff `requested >= 1`, `available >= requested` and
/// the listings can ship exactly `requested` within their minimum order
/// sizes (the same sourcing rule pricing applies). Products without listings
/// count as `available = 0`.
pub fn validate<L>(items: &[CartItem], lookup: &L) -> Result<ValidationResult, LookupError>
where
    L: SupplierLookup + ?Sized,
{
    let mut validated = Vec::with_capacity(items.len());
    let mut total_price = 0u64;

    for item in items {
        let listings = lookup.listings(item.product_id)?;
        let availability = Availability::of(item.product_id, &listings);
        let requested = item.quantity;

        let message = if requested < 1 {
            format!("Quantity for '{}' must be at least 1", item.product_name)
        } else if availability.available == 0 {
            format!("'{}' is no longer available", item.product_name)
        } else if availability.available < requested {
            format!(
                "Only {} of '{}' available (requested {})",
                availability.available, item.product_name, requested
            )
        } else {
            match allocate(item.product_id, requested, &listings) {
                (_, 0) => String::new(),
                (_, shortfall) => format!(
                    "Only {} of '{}' can be supplied within supplier minimum order sizes (requested {})",
                    requested - shortfall,
                    item.product_name,
                    requested
                ),
            }
        };

        let fulfillable = requested.min(availability.available);
        total_price = total_price
            .saturating_add(availability.unit_price.saturating_mul(u64::from(fulfillable)));

        validated.push(ValidatedItem {
            cart_item_id: item.id,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            requested_quantity: requested,
            max_available_quantity: availability.available,
            is_available: message.is_empty(),
            unit_price: availability.unit_price,
            requested_total: availability.unit_price.saturating_mul(u64::from(requested)),
            message,
        });
    }

    let mut failing = validated.iter().filter(|i| !i.is_available);
    let (message, max_quantity_allowed) = match failing.next() {
        None => (String::new(), None),
        Some(first) => {
            let rest = failing.count();
            let message = if rest == 0 {
                first.message.clone()
            } else {
                format!("{} (and {} more item(s))", first.message, rest)
            };
            (message, Some(first.max_available_quantity))
        }
    };

    Ok(ValidationResult {
        is_valid: max_quantity_allowed.is_none(),
        items: validated,
        max_quantity_allowed,
        total_price,
        message,
    })
}
