//! Identity verification and session issuance for fieldtrack.
//!
//! [`AuthService`] drives both sign-in flows (email link and phone OTP), the
//! job lifecycle around login and logout, and bearer-token resolution. It is
//! generic over the [`TrackerStore`](fieldtrack_core::store::TrackerStore)
//! backend and the [`NotificationChannel`] that carries one-time credentials
//! to the user.

#![allow(async_fn_in_trait)]

pub mod config;
pub mod credential;
pub mod error;
pub mod notify;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::{AuthError, Result};
pub use notify::{DeliveryError, LogChannel, Notification, NotificationChannel};
#[cfg(any(test, feature = "test-util"))]
pub use notify::MemoryChannel;
pub use service::{AuthService, IssueOutcome, LoginInput, LoginOutput, OtpLogin, Session};
