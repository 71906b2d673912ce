//! Requester identity.
//!
//! Authentication happens in front of this service, which forwards the signed-in
//! user's id in the `x-user-id` header.

use crate::errors::Error;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user making the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .map(Self)
            .ok_or(Error::Unauthenticated)
    }
}
