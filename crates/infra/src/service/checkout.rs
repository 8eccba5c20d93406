use std::sync::Arc;

use chrono::Utc;

use storefront_auth::permissions::{CART_MANAGE, CHECKOUT_CREATE, ORDERS_VIEW, ORDERS_VIEW_ALL};
use storefront_auth::{AuthorizationGuard, Principal, Requirement};
use storefront_cart::{
    Cart, CartItem, DiscountPolicy, InvalidCartError, PriceCalculationResult, ValidationResult,
    assemble, calculate, pricing_issues, validate, validation_issues,
};
use storefront_core::{AggregateRoot, DomainError, ExpectedVersion, OrderId, ProductId};

use super::{ServiceError, ServiceResult, authorize};
use crate::config::StorefrontConfig;
use crate::store::{
    CartRepository, OrderRepository, PlacedOrder, PromotionSource, SupplierSource,
    fetch_snapshot, within,
};

/// Validation, pricing and checkout of the caller's active cart.
///
/// Checkout runs validate → price → assemble → persist → deduct stock →
/// close the cart. Anything failing before assembly leaves no trace; a
/// failure after the order is persisted restores stock and cancels it.
#[derive(Clone)]
pub struct CheckoutService {
    guard: AuthorizationGuard,
    config: StorefrontConfig,
    suppliers: Arc<dyn SupplierSource>,
    promotions: Arc<dyn PromotionSource>,
    carts: Arc<dyn CartRepository>,
    orders: Arc<dyn OrderRepository>,
}

impl CheckoutService {
    pub fn new(
        guard: AuthorizationGuard,
        config: StorefrontConfig,
        suppliers: Arc<dyn SupplierSource>,
        promotions: Arc<dyn PromotionSource>,
        carts: Arc<dyn CartRepository>,
        orders: Arc<dyn OrderRepository>,
    ) -> Self {
        Self {
            guard,
            config,
            suppliers,
            promotions,
            carts,
            orders,
        }
    }

    pub fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    /// Check the active cart's quantities against live stock.
    #[tracing::instrument(skip_all, fields(user_id = ?principal.map(Principal::user_id)))]
    pub async fn validate_cart(
        &self,
        principal: Option<&Principal>,
    ) -> ServiceResult<ValidationResult> {
        let principal = authorize(
            &self.guard,
            principal,
            &[Requirement::permission(CART_MANAGE)],
        )?;
        let items = self.active_items(principal)?;
        let snapshot =
            fetch_snapshot(&*self.suppliers, &product_ids(&items), self.config.supplier_timeout)
                .await?;

        let result = validate(&items, &snapshot)?;
        tracing::debug!(is_valid = result.is_valid, items = items.len(), "cart validated");
        Ok(result)
    }

    /// Reprice the active cart from live listings (a checkout preview).
    #[tracing::instrument(skip_all, fields(user_id = ?principal.map(Principal::user_id)))]
    pub async fn price_cart(
        &self,
        principal: Option<&Principal>,
    ) -> ServiceResult<PriceCalculationResult> {
        let principal = authorize(
            &self.guard,
            principal,
            &[Requirement::permission(CART_MANAGE)],
        )?;
        let items = self.active_items(principal)?;
        let snapshot =
            fetch_snapshot(&*self.suppliers, &product_ids(&items), self.config.supplier_timeout)
                .await?;

        let result = calculate(&items, &snapshot, &self.config.pricing)?;
        tracing::debug!(
            is_valid = result.is_valid,
            total = result.total_amount,
            changed = result.changed_items().count(),
            "cart priced"
        );
        Ok(result)
    }

    /// Convert the active cart into an order.
    #[tracing::instrument(
        skip_all,
        fields(user_id = ?principal.map(Principal::user_id), promo = promo_code.is_some())
    )]
    pub async fn checkout(
        &self,
        principal: Option<&Principal>,
        promo_code: Option<&str>,
    ) -> ServiceResult<PlacedOrder> {
        let principal = authorize(
            &self.guard,
            principal,
            &[Requirement::permission(CHECKOUT_CREATE)],
        )?;
        let user_id = principal.user_id();

        let mut cart = self.carts.active_for(user_id)?;
        let items: Vec<CartItem> = cart.as_ref().map(|c| c.items().to_vec()).unwrap_or_default();
        let snapshot =
            fetch_snapshot(&*self.suppliers, &product_ids(&items), self.config.supplier_timeout)
                .await?;

        let validation = validate(&items, &snapshot)?;
        if !validation.is_valid {
            return Err(InvalidCartError {
                issues: validation_issues(&validation),
            }
            .into());
        }
        let pricing = calculate(&items, &snapshot, &self.config.pricing)?;
        if !pricing.is_valid {
            return Err(InvalidCartError {
                issues: pricing_issues(&pricing),
            }
            .into());
        }

        let discount = self.resolve_promo(promo_code).await?;
        let draft = assemble(
            &validation,
            &pricing,
            &self.config.shipping,
            &discount,
            &self.config.tax,
        )?;

        // `assemble` rejects empty carts, so a cart exists from here on.
        let Some(cart) = cart.as_mut() else {
            return Err(DomainError::not_found("active cart").into());
        };
        let loaded = cart.version();
        let order = self.orders.place(user_id, cart.id_typed(), draft, Utc::now())?;

        if let Err(err) = self.commit(&order, cart, loaded).await {
            self.roll_back(&order).await;
            return Err(err);
        }

        tracing::info!(
            order_id = %order.order_id,
            order_number = %order.order_number,
            total = order.draft.total_amount,
            "order placed"
        );
        Ok(order)
    }

    /// One placed order. Owners may read their own; others need
    /// `orders.view.all`.
    #[tracing::instrument(skip_all, fields(user_id = ?principal.map(Principal::user_id), %order_id))]
    pub fn order(
        &self,
        principal: Option<&Principal>,
        order_id: OrderId,
    ) -> ServiceResult<PlacedOrder> {
        let principal = authorize(
            &self.guard,
            principal,
            &[Requirement::permission(ORDERS_VIEW)],
        )?;
        let order = self
            .orders
            .get(order_id)?
            .ok_or_else(|| DomainError::not_found(format!("order {order_id}")))?;

        if order.user_id != principal.user_id() {
            // Other users' orders are hidden unless the caller may see them all.
            self.guard
                .authorize(Some(principal), &Requirement::permission(ORDERS_VIEW_ALL))
                .map_err(|_| DomainError::not_found(format!("order {order_id}")))?;
        }
        Ok(order)
    }

    /// The caller's orders, oldest first.
    #[tracing::instrument(skip_all, fields(user_id = ?principal.map(Principal::user_id)))]
    pub fn my_orders(&self, principal: Option<&Principal>) -> ServiceResult<Vec<PlacedOrder>> {
        let principal = authorize(
            &self.guard,
            principal,
            &[Requirement::permission(ORDERS_VIEW)],
        )?;
        Ok(self.orders.list_for_user(principal.user_id())?)
    }

    fn active_items(&self, principal: &Principal) -> ServiceResult<Vec<CartItem>> {
        Ok(self
            .carts
            .active_for(principal.user_id())?
            .map(|cart| cart.items().to_vec())
            .unwrap_or_default())
    }

    async fn resolve_promo(&self, code: Option<&str>) -> ServiceResult<DiscountPolicy> {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(DiscountPolicy::None);
        };
        within(self.config.supplier_timeout, self.promotions.resolve(code))
            .await?
            .ok_or_else(|| ServiceError::UnknownPromoCode(code.to_string()))
    }

    /// Deduct stock for every allocation, then freeze the cart.
    async fn commit(&self, order: &PlacedOrder, cart: &mut Cart, loaded: u64) -> ServiceResult<()> {
        for allocation in order.draft.lines.iter().flat_map(|l| &l.supplier_breakdown) {
            self.suppliers.deduct(order.order_id, allocation).await?;
        }
        cart.mark_checked_out(order.order_id, Utc::now())?;
        self.carts.save(cart, ExpectedVersion::Exact(loaded))?;
        Ok(())
    }

    /// Compensate a partially committed order. Restores are no-ops for
    /// allocations that were never deducted.
    async fn roll_back(&self, order: &PlacedOrder) {
        tracing::warn!(order_id = %order.order_id, "rolling back order");
        for allocation in order.draft.lines.iter().flat_map(|l| &l.supplier_breakdown) {
            if let Err(err) = self.suppliers.restore(order.order_id, allocation).await {
                tracing::error!(
                    order_id = %order.order_id,
                    listing_id = %allocation.listing_id,
                    "failed to restore stock: {err}"
                );
            }
        }
        if let Err(err) = self.orders.cancel(order.order_id) {
            tracing::error!(order_id = %order.order_id, "failed to cancel order: {err}");
        }
    }
}

fn product_ids(items: &[CartItem]) -> Vec<ProductId> {
    let mut ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
