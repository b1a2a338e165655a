//! Authentication extractors.
//!
//! Session and token mechanics live in the fronting auth layer, which
//! injects the verified caller into each request as headers:
//!
//! - `x-auth-user-id` - the authenticated user's id
//! - `x-auth-role` - `admin` for privileged callers
//!
//! These extractors turn that into an explicit [`Identity`] value so
//! handlers and the order workflow never read ambient request state.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use cartwright_core::UserId;

use crate::services::orders::Identity;

const USER_ID_HEADER: &str = "x-auth-user-id";
const ROLE_HEADER: &str = "x-auth-role";

/// Extractor that requires an authenticated caller.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireAuth(identity): RequireAuth) -> impl IntoResponse {
///     format!("user {}", identity.user_id)
/// }
/// ```
pub struct RequireAuth(pub Identity);

/// Extractor that requires an authenticated admin caller.
pub struct RequireAdmin(pub Identity);

/// Error returned when a request lacks the required identity.
pub enum AuthRejection {
    /// No verified identity on the request.
    Unauthenticated,
    /// Identity present but not an admin.
    NotAdmin,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "code": "authentication_required",
                    "message": "authentication required",
                })),
            )
                .into_response(),
            Self::NotAdmin => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "code": "permission_denied",
                    "message": "admin access required",
                })),
            )
                .into_response(),
        }
    }
}

fn identity_from_parts(parts: &Parts) -> Option<Identity> {
    let user_id = parts
        .headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .parse::<i32>()
        .ok()?;

    let is_admin = parts
        .headers
        .get(ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|role| role.eq_ignore_ascii_case("admin"));

    Some(Identity {
        user_id: UserId::new(user_id),
        is_admin,
    })
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        identity_from_parts(parts)
            .map(Self)
            .ok_or(AuthRejection::Unauthenticated)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = identity_from_parts(parts).ok_or(AuthRejection::Unauthenticated)?;
        if !identity.is_admin {
            return Err(AuthRejection::NotAdmin);
        }
        Ok(Self(identity))
    }
}
