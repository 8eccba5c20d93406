use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use storefront_auth::{Permission, Requirement};
use storefront_core::UserId;

use crate::app::dto::Envelope;
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::CurrentPrincipal;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize)]
pub struct WhoAmI {
    pub user_id: UserId,
    pub role: Option<String>,
    pub permissions: Vec<String>,
}

pub async fn whoami(
    Extension(services): Extension<Arc<AppServices>>,
    principal: CurrentPrincipal,
) -> axum::response::Response {
    let Some(principal) = principal.get().filter(|p| p.is_authenticated()) else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", vec![]);
    };

    Json(Envelope::success(WhoAmI {
        user_id: principal.user_id(),
        role: principal.role().map(str::to_string),
        permissions: services
            .guard
            .effective_permissions(principal)
            .into_iter()
            .collect(),
    }))
    .into_response()
}

/// Why the caller would be allowed or denied a permission.
pub async fn explain_permission(
    Extension(services): Extension<Arc<AppServices>>,
    principal: CurrentPrincipal,
    Path(permission): Path<String>,
) -> axum::response::Response {
    let requirement = Requirement::permission(Permission::new(permission));
    let explanation = services.guard.explain(principal.get(), &requirement);
    Json(Envelope::success(explanation)).into_response()
}
