//! Checkout assembly: validated + priced cart → order draft.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::{BasisPoints, CartItemId, ProductId};

use crate::pricing::{PriceCalculationResult, SupplierAllocation};
use crate::validation::ValidationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Validation found the requested quantity unavailable.
    ItemUnavailable,
    /// Pricing could not source the line from supplier stock.
    PricingShortfall,
    /// Validation and pricing results describe different carts.
    Mismatch,
    EmptyCart,
}

/// One reason a cart cannot be checked out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartIssue {
    pub kind: IssueKind,
    pub product_id: Option<ProductId>,
    pub message: String,
}

/// The cart failed a checkout precondition. Carries every issue found, never
/// a partial draft.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid cart: {}", join_messages(.issues))]
pub struct InvalidCartError {
    pub issues: Vec<CartIssue>,
}

impl InvalidCartError {
    pub fn messages(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.message.as_str()).collect()
    }
}

fn non_empty_or(message: &str, fallback: &str) -> String {
    if message.is_empty() {
        fallback.to_string()
    } else {
        message.to_string()
    }
}

fn join_messages(issues: &[CartIssue]) -> String {
    issues
        .iter()
        .map(|i| i.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Issues that keep a validation result from reaching checkout.
///
/// Empty iff `validation.is_valid`. A flag set without per-item detail still
/// yields one issue.
pub fn validation_issues(validation: &ValidationResult) -> Vec<CartIssue> {
    let mut issues: Vec<CartIssue> = validation
        .failing_items()
        .map(|i| CartIssue {
            kind: IssueKind::ItemUnavailable,
            product_id: Some(i.product_id),
            message: i.message.clone(),
        })
        .collect();
    if !validation.is_valid && issues.is_empty() {
        issues.push(CartIssue {
            kind: IssueKind::ItemUnavailable,
            product_id: None,
            message: non_empty_or(&validation.message, "cart validation failed"),
        });
    }
    issues
}

/// Issues that keep a pricing result from reaching checkout.
pub fn pricing_issues(pricing: &PriceCalculationResult) -> Vec<CartIssue> {
    let mut issues: Vec<CartIssue> = pricing
        .failing_items()
        .map(|i| CartIssue {
            kind: IssueKind::PricingShortfall,
            product_id: Some(i.product_id),
            message: i.message.clone(),
        })
        .collect();
    if !pricing.is_valid && issues.is_empty() {
        issues.push(CartIssue {
            kind: IssueKind::PricingShortfall,
            product_id: None,
            message: non_empty_or(&pricing.message, "cart pricing failed"),
        });
    }
    issues
}

/// Shipping fee rule, evaluated against the discounted subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShippingPolicy {
    Free,
    Flat { fee: u64 },
    /// `fee` below `threshold`, free at or above it.
    FreeOver { fee: u64, threshold: u64 },
}

impl ShippingPolicy {
    pub fn fee(self, discounted_subtotal: u64) -> u64 {
        match self {
            ShippingPolicy::Free => 0,
            ShippingPolicy::Flat { fee } => fee,
            ShippingPolicy::FreeOver { threshold, .. } if discounted_subtotal >= threshold => 0,
            ShippingPolicy::FreeOver { fee, .. } => fee,
        }
    }
}

/// Order-level discount. Promo codes are resolved to one of these by the
/// caller before assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DiscountPolicy {
    #[default]
    None,
    Amount(u64),
    Percentage(BasisPoints),
}

impl DiscountPolicy {
    /// Discount on `subtotal`, never more than the subtotal itself.
    pub fn amount(self, subtotal: u64) -> u64 {
        let raw = match self {
            DiscountPolicy::None => 0,
            DiscountPolicy::Amount(amount) => amount,
            DiscountPolicy::Percentage(rate) => rate.apply_to(subtotal),
        };
        raw.min(subtotal)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TaxPolicy {
    #[default]
    None,
    /// Rate applied to the discounted subtotal.
    Percentage(BasisPoints),
}

impl TaxPolicy {
    pub fn amount(self, discounted_subtotal: u64) -> u64 {
        match self {
            TaxPolicy::None => 0,
            TaxPolicy::Percentage(rate) => rate.apply_to(discounted_subtotal),
        }
    }
}

/// An order line frozen at the price calculated during assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub cart_item_id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: u64,
    pub line_total: u64,
    pub supplier_breakdown: Vec<SupplierAllocation>,
}

/// Totals and lines ready for the order-persistence collaborator, which
/// assigns the durable id and order number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub subtotal: u64,
    pub discount_amount: u64,
    pub service_fee: u64,
    pub tax_amount: u64,
    pub shipping_fee: u64,
    /// `subtotal − discount + service_fee + tax + shipping`.
    pub total_amount: u64,
    pub lines: Vec<OrderLine>,
}

/// Merge a validated and priced cart into an order draft.
///
/// Both results must be valid and must describe the same items (same cart
/// item ids, products and quantities in the same order).
pub fn assemble(
    validation: &ValidationResult,
    pricing: &PriceCalculationResult,
    shipping: &ShippingPolicy,
    discount: &DiscountPolicy,
    tax: &TaxPolicy,
) -> Result<OrderDraft, InvalidCartError> {
    let mut issues = validation_issues(validation);
    issues.extend(pricing_issues(pricing));

    let same_items = validation.items.len() == pricing.items.len()
        && validation.items.iter().zip(&pricing.items).all(|(v, p)| {
            v.cart_item_id == p.cart_item_id
                && v.product_id == p.product_id
                && v.requested_quantity == p.quantity
        });
    if !same_items {
        issues.push(CartIssue {
            kind: IssueKind::Mismatch,
            product_id: None,
            message: "validation and pricing results describe different carts".to_string(),
        });
    }

    if issues.is_empty() && pricing.items.is_empty() {
        issues.push(CartIssue {
            kind: IssueKind::EmptyCart,
            product_id: None,
            message: "cart is empty".to_string(),
        });
    }

    if !issues.is_empty() {
        return Err(InvalidCartError { issues });
    }

    let lines: Vec<OrderLine> = pricing
        .items
        .iter()
        .zip(1u32..)
        .map(|(p, line_no)| OrderLine {
            line_no,
            cart_item_id: p.cart_item_id,
            product_id: p.product_id,
            product_name: p.product_name.clone(),
            quantity: p.quantity,
            unit_price: p.calculated_unit_price,
            line_total: p.line_total,
            supplier_breakdown: p.supplier_breakdown.clone(),
        })
        .collect();

    let subtotal = pricing.subtotal;
    let discount_amount = discount.amount(subtotal);
    let discounted = subtotal - discount_amount;
    let tax_amount = tax.amount(discounted);
    let shipping_fee = shipping.fee(discounted);
    let service_fee = pricing.service_fee;

    Ok(OrderDraft {
        subtotal,
        discount_amount,
        service_fee,
        tax_amount,
        shipping_fee,
        total_amount: discounted
            .saturating_add(service_fee)
            .saturating_add(tax_amount)
            .saturating_add(shipping_fee),
        lines,
    })
}
