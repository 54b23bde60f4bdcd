//! Identities: the unique key a user authenticates with.
//!
//! Two kinds exist: an email address (verified by a clickable link) and an
//! E.164 phone number (verified by an SMS one-time code). Both are normalised
//! on parse so that equal identities always compare and store identically.

use std::{fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

static EMAIL_REGEX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// E.164: a `+`, a non-zero country-code digit, 7 to 15 digits in total.
static E164_REGEX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\+[1-9]\d{6,14}$").unwrap());

/// Which delivery channel an identity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
  Email,
  Phone,
}

/// A validated, normalised user identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Identity {
  Email(String),
  Phone(String),
}

impl Identity {
  /// Parse an email address. Surrounding whitespace is trimmed and the
  /// address is lower-cased.
  pub fn email(raw: &str) -> Result<Self> {
    let normalised = raw.trim().to_lowercase();
    if EMAIL_REGEX.is_match(&normalised) {
      Ok(Self::Email(normalised))
    } else {
      Err(Error::InvalidEmail(raw.to_owned()))
    }
  }

  /// Parse a phone number into E.164 form.
  ///
  /// Spaces, dashes, dots and parentheses are dropped and a leading
  /// international `00` prefix is rewritten to `+`.
  pub fn phone(raw: &str) -> Result<Self> {
    let compact: String = raw
      .trim()
      .chars()
      .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
      .collect();

    let normalised = match compact.strip_prefix("00") {
      Some(rest) => format!("+{rest}"),
      None => compact,
    };

    if E164_REGEX.is_match(&normalised) {
      Ok(Self::Phone(normalised))
    } else {
      Err(Error::InvalidPhone(raw.to_owned()))
    }
  }

  /// Rebuild an identity from its stored parts without re-validating.
  pub fn from_parts(kind: IdentityKind, value: String) -> Self {
    match kind {
      IdentityKind::Email => Self::Email(value),
      IdentityKind::Phone => Self::Phone(value),
    }
  }

  pub fn kind(&self) -> IdentityKind {
    match self {
      Self::Email(_) => IdentityKind::Email,
      Self::Phone(_) => IdentityKind::Phone,
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Email(v) | Self::Phone(v) => v,
    }
  }

  pub fn as_email(&self) -> Option<&str> {
    match self {
      Self::Email(v) => Some(v),
      Self::Phone(_) => None,
    }
  }

  pub fn as_phone(&self) -> Option<&str> {
    match self {
      Self::Phone(v) => Some(v),
      Self::Email(_) => None,
    }
  }
}

impl fmt::Display for Identity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}
