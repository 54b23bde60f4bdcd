//! Users: the credential record behind every session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::Identity;

/// A one-time credential awaiting verification.
///
/// Only the SHA-256 digest of the issued value is kept; the plaintext leaves
/// the process exactly once, through the notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCredential {
  pub digest:     String,
  pub expires_at: DateTime<Utc>,
}

impl PendingCredential {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }
}

/// A persisted user. Created on first registration or OTP request for an
/// unseen identity and never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:        Uuid,
  pub identity:       Identity,
  pub verified:       bool,
  /// Deactivated users keep their history but can no longer hold sessions.
  pub is_active:      bool,
  /// `None` once consumed; single-use.
  pub pending:        Option<PendingCredential>,
  pub last_login_at:  Option<DateTime<Utc>>,
  pub created_at:     DateTime<Utc>,
  pub current_job_id: Option<Uuid>,
}
