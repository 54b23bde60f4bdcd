//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"message": "..."}`. Internal failures are logged
//! and answered with a generic message.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use fieldtrack_auth::AuthError;
use fieldtrack_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn bad_request(msg: impl Into<String>) -> Self { ApiError::BadRequest(msg.into()) }

  /// Mapping used by the phone/OTP endpoints, where an unknown identity is a
  /// 404 rather than a 400.
  pub fn otp_flow(err: AuthError, not_found: &str) -> Self {
    match err {
      AuthError::NotFound => ApiError::NotFound(not_found.to_owned()),
      other => other.into(),
    }
  }

  /// Translate a backend error raised while reading or writing locations.
  pub fn from_store<E: StoreError>(err: E) -> Self {
    match err.domain() {
      Some(domain) => domain.clone().into(),
      None => ApiError::Internal(Box::new(err)),
    }
  }
}

impl From<fieldtrack_core::Error> for ApiError {
  fn from(err: fieldtrack_core::Error) -> Self {
    use fieldtrack_core::Error as Core;
    match err {
      Core::InvalidCoordinates => {
        ApiError::bad_request("Latitude and longitude are required.")
      }
      Core::InvalidDate(_) => ApiError::bad_request("Invalid date format. Use YYYY-MM-DD."),
      Core::JobNotFound(_) | Core::JobInactive(_) => {
        ApiError::bad_request("Job not found or inactive")
      }
      other => ApiError::BadRequest(other.to_string()),
    }
  }
}

impl From<AuthError> for ApiError {
  fn from(err: AuthError) -> Self {
    match err {
      AuthError::InvalidIdentity(msg) | AuthError::InvalidRequest(msg) => {
        ApiError::BadRequest(msg)
      }
      AuthError::AlreadyVerified => {
        ApiError::bad_request("Email already registered and verified")
      }
      AuthError::NotFound => ApiError::bad_request("User or job not found"),
      AuthError::Expired | AuthError::Mismatch => {
        ApiError::Unauthorized("Invalid OTP or OTP expired.".into())
      }
      AuthError::Unverified => ApiError::Unauthorized(
        "Email not verified. Please check your email and click the verification link.".into(),
      ),
      AuthError::Unauthenticated => {
        ApiError::Unauthorized("No token, authorization denied".into())
      }
      AuthError::InvalidToken => ApiError::Unauthorized("Token is not valid".into()),
      AuthError::JobInactive => ApiError::Unauthorized("Job not found or inactive".into()),
      AuthError::Token(_) | AuthError::Store(_) => ApiError::Internal(Box::new(err)),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::Internal(e) => {
        tracing::error!(error = %e, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_owned())
      }
    };
    (status, Json(json!({ "message": message }))).into_response()
  }
}
