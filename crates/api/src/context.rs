use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::Response;
use axum::Json;
use serde::de::DeserializeOwned;

use storefront_auth::Principal;

use crate::app::errors;

/// The request's principal, if the caller presented a valid token.
///
/// Never rejects: anonymous requests reach the handler with `None` and the
/// authorization guard decides what they may do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentPrincipal(pub Option<Principal>);

impl CurrentPrincipal {
    pub fn get(&self) -> Option<&Principal> {
        self.0.as_ref()
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Principal>().cloned()))
    }
}

/// JSON request body whose rejections (wrong content type, malformed or
/// mistyped JSON) are reported as a 400 envelope.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(|rejection| invalid_body(rejection.body_text()))
    }
}

/// Like [`JsonBody`], but an absent or blank body yields `None`. Any body
/// that is present must still parse.
#[derive(Debug, Clone)]
pub struct OptionalJsonBody<T>(pub Option<T>);

#[axum::async_trait]
impl<S, T> FromRequest<S> for OptionalJsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let bytes = Bytes::from_request(Request::from_parts(parts.clone(), body), state)
            .await
            .map_err(|rejection| invalid_body(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(None));
        }

        let req = Request::from_parts(parts, Body::from(bytes));
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        Ok(Self(Some(value)))
    }
}

fn invalid_body(detail: String) -> Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid request body", vec![detail])
}
