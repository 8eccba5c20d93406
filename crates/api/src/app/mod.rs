//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: collaborator wiring (stores, guard, application services)
//! - `routes/`: HTTP handlers, one file per area
//! - `dto.rs`: the response envelope, request/response DTOs and mappings
//! - `errors.rs`: service errors to status codes

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::jwt::Hs256ClaimsVerifier;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(jwt_secret: &str, services: AppServices) -> Router {
    let verifier = Arc::new(Hs256ClaimsVerifier::new(jwt_secret.as_bytes()));
    let auth_state = middleware::AuthState { verifier };

    let protected = routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
