//! Bearer token extraction.
//!
//! The token is optional at the HTTP layer; an absent header means the
//! unrestricted local owner. Scoping decisions happen in the gateway, never
//! here, and the raw token value is never logged.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

/// Optional `Authorization: Bearer <token>` header value.
pub struct Bearer(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for Bearer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);
        Ok(Self(token))
    }
}
