use axum::{
    routing::{get, patch, post},
    Router,
};

pub mod cart;
pub mod orders;
pub mod system;

/// Router for every endpoint behind the auth middleware.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/whoami/can/:permission", get(system::explain_permission))
        .route("/cart", get(cart::view_cart))
        .route("/cart/items", post(cart::add_item))
        .route(
            "/cart/items/:id",
            patch(cart::update_item).delete(cart::remove_item),
        )
        .route("/cart/validate", post(cart::validate_cart))
        .route("/cart/price", post(cart::price_cart))
        .route("/cart/checkout", post(cart::checkout))
        .route("/orders", get(orders::list_orders))
        .route("/orders/:id", get(orders::get_order))
}
