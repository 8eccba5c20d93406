use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use storefront_auth::permissions::CART_MANAGE;
use storefront_auth::{AuthorizationGuard, Principal, Requirement};
use storefront_cart::{
    Cart, CartItemPatch, InvalidCartError, SupplierSnapshot, quote, validate, validation_issues,
};
use storefront_core::{
    AggregateRoot, CartId, CartItemId, DomainError, ExpectedVersion, ProductId, UserId,
};

use super::{ServiceResult, authorize};
use crate::store::{CartRepository, StoreError, SupplierSource, fetch_snapshot, within};

/// Cart mutations for the signed-in user.
///
/// Every write checks the resulting line against live stock before it is
/// saved, so a cart never holds a quantity that could not be bought when it
/// was added.
#[derive(Clone)]
pub struct CartService {
    guard: AuthorizationGuard,
    suppliers: Arc<dyn SupplierSource>,
    carts: Arc<dyn CartRepository>,
    lookup_timeout: Duration,
}

impl CartService {
    pub fn new(
        guard: AuthorizationGuard,
        suppliers: Arc<dyn SupplierSource>,
        carts: Arc<dyn CartRepository>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            guard,
            suppliers,
            carts,
            lookup_timeout,
        }
    }

    fn requirements() -> [Requirement; 1] {
        [Requirement::permission(CART_MANAGE)]
    }

    /// The caller's active cart, if one exists.
    #[tracing::instrument(skip_all, fields(user_id = ?principal.map(Principal::user_id)))]
    pub fn view_cart(&self, principal: Option<&Principal>) -> ServiceResult<Option<Cart>> {
        let principal = authorize(&self.guard, principal, &Self::requirements())?;
        Ok(self.carts.active_for(principal.user_id())?)
    }

    /// Add a product at the price its merged line would be charged now,
    /// creating the cart on first use.
    ///
    /// The merged line is checked against stock on a scratch copy first, so a
    /// rejected add neither changes an existing cart nor creates a new one.
    #[tracing::instrument(
        skip_all,
        fields(user_id = ?principal.map(Principal::user_id), %product_id, quantity = quantity)
    )]
    pub async fn add_item(
        &self,
        principal: Option<&Principal>,
        product_id: ProductId,
        quantity: u32,
    ) -> ServiceResult<Cart> {
        let principal = authorize(&self.guard, principal, &Self::requirements())?;
        let user_id = principal.user_id();

        let name = within(self.lookup_timeout, self.suppliers.product_name(product_id))
            .await?
            .ok_or_else(|| DomainError::not_found(format!("product {product_id}")))?;
        let snapshot = fetch_snapshot(&*self.suppliers, &[product_id], self.lookup_timeout).await?;

        let now = Utc::now();
        let current = self.carts.active_for(user_id)?;
        let mut scratch = current
            .clone()
            .unwrap_or_else(|| Cart::new(CartId::new(0), user_id, now));
        let scratch_item = scratch.add_item(product_id, name.clone(), quantity, 0, now)?;
        ensure_in_stock(&scratch, scratch_item, &snapshot)?;
        let wanted = scratch.item(scratch_item).map_or(quantity, |i| i.quantity);
        let price = quote(product_id, wanted, &snapshot)?.unwrap_or_default();

        let mut cart = match current {
            Some(cart) => cart,
            None => self.create_cart(user_id)?,
        };
        let loaded = cart.version();
        let item_id = cart.add_item(product_id, name, quantity, price, now)?;
        // A concurrent first add may have put the same product in the cart.
        ensure_in_stock(&cart, item_id, &snapshot)?;

        self.carts.save(&cart, ExpectedVersion::Exact(loaded))?;
        tracing::debug!(%item_id, "cart item added");
        Ok(cart)
    }

    /// Change a line's quantity, refreshing its price snapshot.
    #[tracing::instrument(
        skip_all,
        fields(user_id = ?principal.map(Principal::user_id), %item_id, quantity = quantity)
    )]
    pub async fn update_item(
        &self,
        principal: Option<&Principal>,
        item_id: CartItemId,
        quantity: u32,
    ) -> ServiceResult<Cart> {
        let principal = authorize(&self.guard, principal, &Self::requirements())?;
        let mut cart = self.active_cart(principal.user_id())?;
        let loaded = cart.version();
        let product_id = cart
            .item(item_id)
            .map(|i| i.product_id)
            .ok_or_else(|| DomainError::not_found(format!("cart item {item_id}")))?;

        let snapshot = fetch_snapshot(&*self.suppliers, &[product_id], self.lookup_timeout).await?;
        let patch = CartItemPatch {
            quantity: Some(quantity),
            // Keep the old snapshot when the quantity cannot be sourced; validation reports it.
            unit_price_snapshot: quote(product_id, quantity, &snapshot)?,
            ..CartItemPatch::default()
        };

        if cart.patch_item(item_id, &patch, Utc::now())? {
            ensure_in_stock(&cart, item_id, &snapshot)?;
            self.carts.save(&cart, ExpectedVersion::Exact(loaded))?;
        }
        Ok(cart)
    }

    #[tracing::instrument(skip_all, fields(user_id = ?principal.map(Principal::user_id), %item_id))]
    pub fn remove_item(
        &self,
        principal: Option<&Principal>,
        item_id: CartItemId,
    ) -> ServiceResult<Cart> {
        let principal = authorize(&self.guard, principal, &Self::requirements())?;
        let mut cart = self.active_cart(principal.user_id())?;
        let loaded = cart.version();
        cart.remove_item(item_id, Utc::now())?;
        self.carts.save(&cart, ExpectedVersion::Exact(loaded))?;
        Ok(cart)
    }

    fn active_cart(&self, user_id: UserId) -> ServiceResult<Cart> {
        self.carts
            .active_for(user_id)?
            .ok_or_else(|| DomainError::not_found("active cart").into())
    }

    fn create_cart(&self, user_id: UserId) -> ServiceResult<Cart> {
        match self.carts.create(user_id, Utc::now()) {
            Ok(cart) => Ok(cart),
            // Lost a race with a concurrent first add; use the winner's cart.
            Err(StoreError::Conflict(_)) => self.active_cart(user_id),
            Err(err) => Err(err.into()),
        }
    }
}

fn ensure_in_stock(
    cart: &Cart,
    item_id: CartItemId,
    snapshot: &SupplierSnapshot,
) -> ServiceResult<()> {
    let Some(item) = cart.item(item_id) else {
        return Ok(());
    };
    let result = validate(std::slice::from_ref(item), snapshot)?;
    if result.is_valid {
        Ok(())
    } else {
        Err(InvalidCartError {
            issues: validation_issues(&result),
        }
        .into())
    }
}
