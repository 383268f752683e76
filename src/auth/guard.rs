use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::{ApiError, AppState};

use super::{token, Identity};

/// Bearer-token guard for the REST surface. Everything but `/login` sits
/// behind it.
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing authentication token".to_owned()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Unauthorized("missing authentication token".to_owned()))?;
        let user = token::verify(&state.keys, token)
            .ok_or_else(|| ApiError::Unauthorized("invalid or expired token".to_owned()))?;
        Ok(AuthUser(user))
    }
}
