//! Bearer-token extractor.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use fieldtrack_auth::{AuthError, NotificationChannel, Session};
use fieldtrack_core::store::TrackerStore;

use crate::{AppState, error::ApiError};

/// A resolved session: present in a handler means the request carried a valid
/// token for an active user (and, for job tokens, an active job).
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

/// Pull the token out of `Authorization: Bearer <token>`. Any other scheme
/// counts as no token.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
}

impl<S, N> FromRequestParts<AppState<S, N>> for AuthSession
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, N>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers).ok_or(AuthError::Unauthenticated)?;
    let session = state.auth.authenticate(Some(token)).await?;
    Ok(AuthSession(session))
  }
}
