//! Out-of-band delivery of one-time credentials.
//!
//! The service never talks to a mail or SMS provider directly; it hands a
//! [`Notification`] to whatever [`NotificationChannel`] it was built with.
//! HTTP transports live in the server binary. This module provides the
//! logging fallback and, behind the `test-util` feature, an in-memory
//! channel for tests.

use std::future::Future;

use thiserror::Error;

/// A message carrying a one-time credential to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
  /// Email with a clickable verification link.
  VerificationLink { email: String, link: String },
  /// SMS with a numeric code.
  OneTimeCode { phone: String, code: String },
}

impl Notification {
  /// Recipient address or number.
  pub fn recipient(&self) -> &str {
    match self {
      Notification::VerificationLink { email, .. } => email,
      Notification::OneTimeCode { phone, .. } => phone,
    }
  }

  pub fn subject(&self) -> &'static str {
    match self {
      Notification::VerificationLink { .. } => "Verify your email",
      Notification::OneTimeCode { .. } => "Your verification code",
    }
  }

  /// Plain-text message body.
  pub fn body(&self) -> String {
    match self {
      Notification::VerificationLink { link, .. } => {
        format!("Please verify your email by opening this link: {link}")
      }
      Notification::OneTimeCode { code, .. } => {
        format!("Your verification code is {code}")
      }
    }
  }
}

#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// A transport able to deliver [`Notification`]s.
pub trait NotificationChannel: Send + Sync {
  fn deliver(
    &self,
    notification: Notification,
  ) -> impl Future<Output = Result<(), DeliveryError>> + Send + '_;
}

// ─── Log channel ─────────────────────────────────────────────────────────────

/// Writes notifications to the log instead of sending them. Used when no
/// provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogChannel;

impl NotificationChannel for LogChannel {
  async fn deliver(&self, notification: Notification) -> Result<(), DeliveryError> {
    tracing::info!(
      recipient = notification.recipient(),
      subject = notification.subject(),
      body = %notification.body(),
      "notification not sent (no transport configured)"
    );
    Ok(())
  }
}

// ─── Memory channel ──────────────────────────────────────────────────────────

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryChannel;

#[cfg(any(test, feature = "test-util"))]
mod memory {
  use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

  use super::{DeliveryError, Notification, NotificationChannel};

  /// Records every notification in memory. Optionally reports each delivery
  /// as failed after recording it.
  #[derive(Debug, Clone, Default)]
  pub struct MemoryChannel {
    sent:    Arc<Mutex<Vec<Notification>>>,
    failing: bool,
  }

  impl MemoryChannel {
    pub fn new() -> Self { Self::default() }

    /// A channel whose deliveries all fail.
    pub fn failing() -> Self { Self { failing: true, ..Self::default() } }

    // A panicking test thread must not hide what was sent before it.
    fn log(&self) -> MutexGuard<'_, Vec<Notification>> {
      self.sent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sent(&self) -> Vec<Notification> { self.log().clone() }

    /// Most recent code sent to `phone`.
    pub fn last_code_for(&self, phone: &str) -> Option<String> {
      self.sent().into_iter().rev().find_map(|n| match n {
        Notification::OneTimeCode { phone: p, code } if p == phone => Some(code),
        _ => None,
      })
    }

    /// Token from the most recent verification link sent to `email`.
    pub fn last_token_for(&self, email: &str) -> Option<String> {
      self.sent().into_iter().rev().find_map(|n| match n {
        Notification::VerificationLink { email: e, link } if e == email => link
          .split_once("token=")
          .map(|(_, token)| token.to_owned()),
        _ => None,
      })
    }
  }

  impl NotificationChannel for MemoryChannel {
    async fn deliver(&self, notification: Notification) -> Result<(), DeliveryError> {
      self.log().push(notification);
      if self.failing {
        return Err(DeliveryError("memory channel set to fail".into()));
      }
      Ok(())
    }
  }
}
