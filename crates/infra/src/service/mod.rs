//! Application services: authorize, load, run the cart engines, persist.
//!
//! Handlers call these with the request principal (if any). Services never
//! map errors to transport codes; that happens at the HTTP boundary.

mod cart;
mod checkout;
#[cfg(test)]
mod fixtures;

use thiserror::Error;

use storefront_auth::{AuthorizationGuard, AuthzError, Principal, Requirement};
use storefront_cart::{InvalidCartError, LookupError};
use storefront_core::DomainError;

use crate::store::{StockError, StoreError};

pub use cart::CartService;
pub use checkout::CheckoutService;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Authorization(#[from] AuthzError),

    #[error(transparent)]
    InvalidCart(#[from] InvalidCartError),

    /// The supplier or promotion store failed or timed out.
    #[error("upstream lookup failure: {0}")]
    Upstream(#[from] LookupError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Stock moved between pricing and commit.
    #[error(transparent)]
    Stock(#[from] StockError),

    #[error("unknown promo code '{0}'")]
    UnknownPromoCode(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Run the guard and hand back the authenticated principal.
pub(crate) fn authorize<'p>(
    guard: &AuthorizationGuard,
    principal: Option<&'p Principal>,
    requirements: &[Requirement],
) -> ServiceResult<&'p Principal> {
    if let Err(err) = guard.authorize_all(principal, requirements) {
        tracing::warn!(
            user_id = ?principal.map(Principal::user_id),
            error = %err,
            "authorization denied"
        );
        return Err(err.into());
    }
    principal.ok_or(ServiceError::Authorization(AuthzError::Unauthenticated))
}
