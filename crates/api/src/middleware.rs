use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use storefront_auth::ClaimsVerifier;

use crate::app::errors;

#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<dyn ClaimsVerifier>,
}

/// Attach the verified [`Principal`](storefront_auth::Principal) to the request.
///
/// Requests without an `Authorization` header pass through anonymously; a
/// header that is present but malformed or fails verification is a 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(Some(token)) => token,
        Ok(None) => return next.run(req).await,
        Err(message) => return errors::json_error(StatusCode::UNAUTHORIZED, message, vec![]),
    };

    match state.verifier.verify(token, Utc::now()) {
        Ok(claims) => {
            req.extensions_mut().insert(claims.into_principal());
            next.run(req).await
        }
        Err(err) => {
            tracing::debug!("rejected bearer token: {err}");
            errors::json_error(StatusCode::UNAUTHORIZED, "invalid bearer token", vec![])
        }
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, &'static str> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header
        .to_str()
        .map_err(|_| "authorization header is not valid text")?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or("authorization header must use the Bearer scheme")?
        .trim();
    if token.is_empty() {
        return Err("bearer token is empty");
    }

    Ok(Some(token))
}
