use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};

use storefront_core::OrderId;

use crate::app::dto::{Envelope, OrderView};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::CurrentPrincipal;

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    principal: CurrentPrincipal,
) -> axum::response::Response {
    match services.checkout.my_orders(principal.get()) {
        Ok(orders) => {
            let views: Vec<OrderView> = orders.iter().map(OrderView::from).collect();
            Json(Envelope::success(views)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    principal: CurrentPrincipal,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::invalid_id(e),
    };

    match services.checkout.order(principal.get(), order_id) {
        Ok(order) => Json(Envelope::success(OrderView::from(&order))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
