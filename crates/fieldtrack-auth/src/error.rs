//! Authentication error types.

use fieldtrack_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
  #[error("{0}")]
  InvalidIdentity(String),

  #[error("{0}")]
  InvalidRequest(String),

  #[error("email is already verified")]
  AlreadyVerified,

  #[error("user or job not found")]
  NotFound,

  #[error("one-time credential has expired")]
  Expired,

  #[error("one-time credential does not match")]
  Mismatch,

  #[error("email is not verified")]
  Unverified,

  #[error("no bearer token supplied")]
  Unauthenticated,

  #[error("token is invalid or expired")]
  InvalidToken,

  #[error("job not found or inactive")]
  JobInactive,

  /// Signing a session token failed.
  #[error("token error: {0}")]
  Token(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl AuthError {
  /// Translate a backend error, keeping rejected preconditions distinct from
  /// storage faults.
  pub fn from_store<E: StoreError>(err: E) -> Self {
    match err.domain() {
      Some(domain) => domain.clone().into(),
      None => AuthError::Store(Box::new(err)),
    }
  }
}

impl From<fieldtrack_core::Error> for AuthError {
  fn from(err: fieldtrack_core::Error) -> Self {
    use fieldtrack_core::Error as Core;
    match err {
      Core::InvalidEmail(_) | Core::InvalidPhone(_) => {
        AuthError::InvalidIdentity(err.to_string())
      }
      Core::InvalidCoordinates | Core::InvalidDate(_) => {
        AuthError::InvalidRequest(err.to_string())
      }
      Core::UserNotFound(_) | Core::JobNotFound(_) => AuthError::NotFound,
      Core::JobInactive(_) => AuthError::JobInactive,
      Core::CredentialMismatch(_) => AuthError::Mismatch,
      Core::CredentialExpired(_) => AuthError::Expired,
    }
  }
}

pub type Result<T, E = AuthError> = std::result::Result<T, E>;
