use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use storefront_core::CartItemId;

use crate::app::dto::{
    AddItemRequest, CartView, CheckoutRequest, Envelope, OrderView, UpdateItemRequest,
};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::{CurrentPrincipal, JsonBody, OptionalJsonBody};

pub async fn view_cart(
    Extension(services): Extension<Arc<AppServices>>,
    principal: CurrentPrincipal,
) -> axum::response::Response {
    match services.cart.view_cart(principal.get()) {
        Ok(Some(cart)) => Json(Envelope::success(CartView::from(&cart))).into_response(),
        Ok(None) => Json(Envelope::success(CartView::empty())).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    principal: CurrentPrincipal,
    JsonBody(body): JsonBody<AddItemRequest>,
) -> axum::response::Response {
    match services
        .cart
        .add_item(principal.get(), body.product_id, body.quantity)
        .await
    {
        Ok(cart) => (
            StatusCode::CREATED,
            Json(Envelope::success_with("item added", CartView::from(&cart))),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    principal: CurrentPrincipal,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<UpdateItemRequest>,
) -> axum::response::Response {
    let item_id: CartItemId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id(e),
    };

    match services
        .cart
        .update_item(principal.get(), item_id, body.quantity)
        .await
    {
        Ok(cart) => Json(Envelope::success(CartView::from(&cart))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    principal: CurrentPrincipal,
    Path(id): Path<String>,
) -> axum::response::Response {
    let item_id: CartItemId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id(e),
    };

    match services.cart.remove_item(principal.get(), item_id) {
        Ok(cart) => Json(Envelope::success(CartView::from(&cart))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Always 200 when the check ran; `data.is_valid` carries the verdict.
pub async fn validate_cart(
    Extension(services): Extension<Arc<AppServices>>,
    principal: CurrentPrincipal,
) -> axum::response::Response {
    match services.checkout.validate_cart(principal.get()).await {
        Ok(result) => {
            let message = result.message.clone();
            Json(Envelope::success_with(message, result)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn price_cart(
    Extension(services): Extension<Arc<AppServices>>,
    principal: CurrentPrincipal,
) -> axum::response::Response {
    match services.checkout.price_cart(principal.get()).await {
        Ok(result) => {
            let message = result.message.clone();
            Json(Envelope::success_with(message, result)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    principal: CurrentPrincipal,
    OptionalJsonBody(body): OptionalJsonBody<CheckoutRequest>,
) -> axum::response::Response {
    // Without a body there is no promo code.
    let promo_code = body.and_then(|b| b.promo_code);

    match services
        .checkout
        .checkout(principal.get(), promo_code.as_deref())
        .await
    {
        Ok(order) => (
            StatusCode::CREATED,
            Json(Envelope::success_with(
                format!("order {} placed", order.order_number),
                OrderView::from(&order),
            )),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
