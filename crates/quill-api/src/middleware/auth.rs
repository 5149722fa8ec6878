use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use quill_persist::{User, UserStore};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, resolved from `Authorization: Bearer <jwt>`.
///
/// Rejects with 401 when the header is missing or malformed, the token does not verify,
/// or its subject no longer names a user.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(ApiError::invalid_token)?;

        let claims = state.tokens.verify(token)?;

        let user = state
            .persist
            .get_user_by_email(&claims.sub)
            .await?
            .ok_or_else(ApiError::invalid_token)?;

        Ok(AuthUser(user))
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
