//! Authoritative cart pricing from live supplier listings.
//!
//! The price stored on a cart item is a snapshot taken when it was added and
//! may be stale or client-supplied. Pricing ignores it (beyond reporting the
//! difference) and sources every line from current listings:
//!
//! 1. Candidates are active listings with stock, ordered by unit price, then
//!    supplier id, then listing id.
//! 2. The first candidate able to ship the whole quantity on its own
//!    (`available >= qty` and `min_order_qty <= qty`) sources the line.
//! 3. Otherwise the line is split across candidates in that order, each
//!    taking as much as it can while the later listings can still make up
//!    the rest within their minimum orders. When no combination reaches the
//!    quantity, the largest reachable total is sourced and the rest reported
//!    as shortfall. A split line is charged the highest unit price among its
//!    contributors.

use serde::{Deserialize, Serialize};

use storefront_core::{BasisPoints, CartItemId, ListingId, ProductId, SupplierId};

use crate::cart::CartItem;
use crate::supplier::{LookupError, SupplierListing, SupplierLookup};

/// How the service fee is derived from the subtotal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ServiceFee {
    #[default]
    None,
    /// Fixed amount per non-empty order.
    Flat(u64),
    Percentage(BasisPoints),
}

impl ServiceFee {
    pub fn amount(self, subtotal: u64) -> u64 {
        match self {
            ServiceFee::None => 0,
            ServiceFee::Flat(_) if subtotal == 0 => 0,
            ServiceFee::Flat(fee) => fee,
            ServiceFee::Percentage(rate) => rate.apply_to(subtotal),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub service_fee: ServiceFee,
}

/// Quantity of a line taken from one supplier listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierAllocation {
    pub listing_id: ListingId,
    pub supplier_id: SupplierId,
    pub quantity: u32,
    pub unit_price: u64,
}

impl SupplierAllocation {
    pub fn cost(&self) -> u64 {
        u64::from(self.quantity).saturating_mul(self.unit_price)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedItem {
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// The cart item's snapshot price.
    pub original_unit_price: u64,
    pub calculated_unit_price: u64,
    /// `calculated_unit_price × quantity`.
    pub line_total: u64,
    /// `calculated_unit_price − original_unit_price`.
    pub price_difference: i64,
    pub supplier_breakdown: Vec<SupplierAllocation>,
    /// Units that no combination of listings could supply.
    pub shortfall: u32,
    /// Empty when the line is fully sourced.
    pub message: String,
}

impl PricedItem {
    pub fn is_priced(&self) -> bool {
        self.message.is_empty()
    }

    pub fn price_changed(&self) -> bool {
        self.price_difference != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceCalculationResult {
    pub is_valid: bool,
    pub items: Vec<PricedItem>,
    pub subtotal: u64,
    pub service_fee: u64,
    pub total_amount: u64,
    /// Empty on success, otherwise explains the first shortfall.
    pub message: String,
}

impl PriceCalculationResult {
    pub fn failing_items(&self) -> impl Iterator<Item = &PricedItem> {
        self.items.iter().filter(|i| !i.is_priced())
    }

    pub fn changed_items(&self) -> impl Iterator<Item = &PricedItem> {
        self.items.iter().filter(|i| i.price_changed())
    }
}

/// Recompute every line from current listings.
///
/// Pure and idempotent: with unchanged supplier data, repeated calls return
/// equal results.
pub fn calculate<L>(
    items: &[CartItem],
    lookup: &L,
    policy: &PricingPolicy,
) -> Result<PriceCalculationResult, LookupError>
where
    L: SupplierLookup + ?Sized,
{
    let mut priced = Vec::with_capacity(items.len());
    for item in items {
        let listings = lookup.listings(item.product_id)?;
        priced.push(price_item(item, &listings));
    }

    let subtotal = priced
        .iter()
        .fold(0u64, |acc, p| acc.saturating_add(p.line_total));
    let service_fee = policy.service_fee.amount(subtotal);
    let message = priced
        .iter()
        .find(|p| !p.is_priced())
        .map(|p| p.message.clone())
        .unwrap_or_default();

    Ok(PriceCalculationResult {
        is_valid: message.is_empty(),
        items: priced,
        subtotal,
        service_fee,
        total_amount: subtotal.saturating_add(service_fee),
        message,
    })
}

fn price_item(item: &CartItem, listings: &[SupplierListing]) -> PricedItem {
    let original = item.unit_price_snapshot;
    let quantity = item.quantity;

    if quantity == 0 {
        return PricedItem {
            cart_item_id: item.id,
            product_id: item.product_id,
            product_name: item.product_name.clone(),
            quantity,
            original_unit_price: original,
            calculated_unit_price: original,
            line_total: 0,
            price_difference: 0,
            supplier_breakdown: Vec::new(),
            shortfall: 0,
            message: format!("Quantity for '{}' must be at least 1", item.product_name),
        };
    }

    let (breakdown, shortfall) = allocate(item.product_id, quantity, listings);
    let calculated = breakdown
        .iter()
        .map(|a| a.unit_price)
        .max()
        .unwrap_or(original);

    let message = if shortfall == 0 {
        String::new()
    } else {
        format!(
            "Insufficient supplier stock for '{}': requested {}, can source {}",
            item.product_name,
            quantity,
            quantity - shortfall
        )
    };

    PricedItem {
        cart_item_id: item.id,
        product_id: item.product_id,
        product_name: item.product_name.clone(),
        quantity,
        original_unit_price: original,
        calculated_unit_price: calculated,
        line_total: calculated.saturating_mul(u64::from(quantity)),
        price_difference: signed_difference(calculated, original),
        supplier_breakdown: breakdown,
        shortfall,
        message,
    }
}

/// Unit price `quantity` units of a product would be charged at right now,
/// or `None` when current listings cannot supply that many.
pub fn quote<L>(
    product_id: ProductId,
    quantity: u32,
    lookup: &L,
) -> Result<Option<u64>, LookupError>
where
    L: SupplierLookup + ?Sized,
{
    if quantity == 0 {
        return Ok(None);
    }
    let listings = lookup.listings(product_id)?;
    let (breakdown, shortfall) = allocate(product_id, quantity, &listings);
    Ok(if shortfall == 0 {
        breakdown.iter().map(|a| a.unit_price).max()
    } else {
        None
    })
}

/// Choose listings for `quantity` units. Returns the allocations and the
/// number of units left unsourced.
pub(crate) fn allocate(
    product_id: ProductId,
    quantity: u32,
    listings: &[SupplierListing],
) -> (Vec<SupplierAllocation>, u32) {
    let mut candidates: Vec<&SupplierListing> = listings
        .iter()
        .filter(|l| l.product_id == product_id && l.is_sellable())
        .collect();
    candidates.sort_by_key(|l| (l.unit_price, l.supplier_id, l.listing_id));

    if let Some(single) = candidates
        .iter()
        .find(|l| l.available_quantity >= quantity && l.min_order_qty <= quantity)
    {
        return (vec![take(single, quantity)], 0);
    }

    // reachable[i]: totals that candidates[i..] can ship together.
    let mut reachable = vec![Reachable::nothing(); candidates.len() + 1];
    for (idx, listing) in candidates.iter().enumerate().rev() {
        reachable[idx] = reachable[idx + 1].with_listing(listing, quantity);
    }

    let target = if reachable[0].contains(quantity) {
        quantity
    } else {
        reachable[0].max()
    };

    let mut remaining = target;
    let mut breakdown = Vec::new();
    for (idx, listing) in candidates.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        let qty = reachable[idx + 1].largest_take(listing, remaining);
        if qty > 0 {
            breakdown.push(take(listing, qty));
            remaining -= qty;
        }
    }
    (breakdown, quantity - (target - remaining))
}

/// Order totals a set of listings can ship, as sorted disjoint inclusive
/// ranges capped at the requested quantity. Each listing ships nothing or
/// between its minimum order and its stock.
#[derive(Debug, Clone)]
struct Reachable(Vec<(u32, u32)>);

impl Reachable {
    fn nothing() -> Self {
        Self(vec![(0, 0)])
    }

    fn with_listing(&self, listing: &SupplierListing, cap: u32) -> Self {
        let min = listing.min_order_qty.max(1);
        let max = listing.available_quantity;
        if min > max {
            return self.clone();
        }

        let mut ranges = self.0.clone();
        for &(lo, hi) in &self.0 {
            let start = lo.saturating_add(min);
            if start <= cap {
                ranges.push((start, hi.saturating_add(max).min(cap)));
            }
        }
        ranges.sort_unstable();

        let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }
        Self(merged)
    }

    fn contains(&self, total: u32) -> bool {
        self.0.iter().any(|&(lo, hi)| lo <= total && total <= hi)
    }

    fn max(&self) -> u32 {
        self.0.last().map_or(0, |&(_, hi)| hi)
    }

    /// Most units `listing` can ship out of `remaining` while the listings
    /// after it (`self`) can still cover the rest exactly.
    fn largest_take(&self, listing: &SupplierListing, remaining: u32) -> u32 {
        let min = listing.min_order_qty.max(1);
        let cap = listing.available_quantity.min(remaining);
        self.0
            .iter()
            .filter(|&&(lo, _)| lo <= remaining)
            .filter_map(|&(lo, hi)| {
                let upper = cap.min(remaining - lo);
                let lower = min.max(remaining - hi.min(remaining));
                (lower <= upper).then_some(upper)
            })
            .max()
            .unwrap_or(0)
    }
}

fn take(listing: &SupplierListing, quantity: u32) -> SupplierAllocation {
    SupplierAllocation {
        listing_id: listing.listing_id,
        supplier_id: listing.supplier_id,
        quantity,
        unit_price: listing.unit_price,
    }
}

fn signed_difference(calculated: u64, original: u64) -> i64 {
    let diff = i128::from(calculated) - i128::from(original);
    i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
}
