use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::sync::Arc;

use parley_persist::User;

use crate::error::ApiError;
use crate::state::AppState;

/// Caller identity, resolved from the `Authorization: Bearer` token.
/// Provisioning and token issuance live elsewhere; this only reads.
pub struct AuthedUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        let user = state
            .users
            .user_by_token(token)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(AuthedUser(user))
    }
}
