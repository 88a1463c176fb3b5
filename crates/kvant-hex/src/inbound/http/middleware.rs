use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use kvant_types::domain::user::UserId;
use std::sync::Arc;

use crate::application::token::JwtService;
use crate::errors::AppError;

/// The authenticated principal, inserted into request extensions by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: UserId,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rejects the request with 401 unless it carries a valid bearer token.
pub async fn require_auth(
    State(jwt): State<Arc<JwtService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or_else(|| {
        tracing::debug!("missing or malformed Authorization header");
        AppError::Unauthorized("missing or invalid Authorization header".into())
    })?;

    let claims = jwt.verify(token).map_err(|e| {
        tracing::debug!(error = %e, "token rejected");
        AppError::Unauthorized("invalid or expired token".into())
    })?;

    request.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
    });
    Ok(next.run(request).await)
}
