use axum::http::StatusCode;
use axum::response::IntoResponse;

use storefront_auth::AuthzError;
use storefront_core::DomainError;
use storefront_infra::{ServiceError, StoreError};

use crate::app::dto::Envelope;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let status = status_for(&err);
    let errors = match &err {
        ServiceError::InvalidCart(invalid) => invalid
            .messages()
            .into_iter()
            .map(str::to_string)
            .collect(),
        _ => vec![],
    };

    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), "request failed: {err}");
    } else {
        tracing::debug!(status = status.as_u16(), "request rejected: {err}");
    }

    let message = match &err {
        // Internal detail stays in the logs.
        _ if status == StatusCode::INTERNAL_SERVER_ERROR => "internal error".to_string(),
        ServiceError::InvalidCart(_) => "cart cannot be checked out".to_string(),
        other => other.to_string(),
    };
    json_error(status, message, errors)
}

fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Authorization(AuthzError::Unauthenticated) => StatusCode::UNAUTHORIZED,
        ServiceError::Authorization(AuthzError::Forbidden(_)) => StatusCode::FORBIDDEN,
        ServiceError::InvalidCart(_) | ServiceError::UnknownPromoCode(_) => {
            StatusCode::BAD_REQUEST
        }
        ServiceError::Domain(DomainError::Validation(_) | DomainError::InvalidId(_)) => {
            StatusCode::BAD_REQUEST
        }
        ServiceError::Domain(DomainError::NotFound(_))
        | ServiceError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
        ServiceError::Domain(DomainError::Conflict(_) | DomainError::InvariantViolation(_))
        | ServiceError::Store(StoreError::Conflict(_))
        | ServiceError::Stock(_) => StatusCode::CONFLICT,
        ServiceError::Upstream(_) => StatusCode::BAD_GATEWAY,
        ServiceError::Store(StoreError::Unavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn json_error(
    status: StatusCode,
    message: impl Into<String>,
    errors: Vec<String>,
) -> axum::response::Response {
    (status, axum::Json(Envelope::<()>::failure(message, errors))).into_response()
}

pub fn invalid_id(err: DomainError) -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "invalid identifier",
        vec![err.detail().to_string()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_cart::{CartIssue, InvalidCartError, IssueKind, LookupError};
    use storefront_infra::StockError;
    use storefront_core::ListingId;
    use std::time::Duration;

    #[test]
    fn every_error_family_has_a_status() {
        let cases: Vec<(ServiceError, StatusCode)> = vec![
            (AuthzError::Unauthenticated.into(), StatusCode::UNAUTHORIZED),
            (AuthzError::Forbidden("x".into()).into(), StatusCode::FORBIDDEN),
            (
                InvalidCartError {
                    issues: vec![CartIssue {
                        kind: IssueKind::EmptyCart,
                        product_id: None,
                        message: "cart is empty".into(),
                    }],
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (DomainError::not_found("cart").into(), StatusCode::NOT_FOUND),
            (DomainError::conflict("stale").into(), StatusCode::CONFLICT),
            (
                StockError::UnknownListing(ListingId::new(1)).into(),
                StatusCode::CONFLICT,
            ),
            (
                LookupError::Timeout(Duration::from_secs(2)).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                StoreError::Unavailable("down".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(status_for(&err), expected, "{err}");
        }
    }
}
