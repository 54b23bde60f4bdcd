//! Error types for `fieldtrack-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
  #[error("invalid email address: {0:?}")]
  InvalidEmail(String),

  #[error("invalid phone number: {0:?}")]
  InvalidPhone(String),

  #[error("latitude and longitude are required and must be in range")]
  InvalidCoordinates,

  #[error("invalid date {0:?}; use YYYY-MM-DD")]
  InvalidDate(String),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("job not found: {0}")]
  JobNotFound(Uuid),

  #[error("job {0} is not active")]
  JobInactive(Uuid),

  #[error("no pending credential of user {0} matches")]
  CredentialMismatch(Uuid),

  #[error("pending credential of user {0} has expired")]
  CredentialExpired(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
