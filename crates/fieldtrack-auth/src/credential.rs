//! One-time credential generation and hashing.
//!
//! Plaintext values are handed to the notification channel once; only
//! [`digest`] output is ever persisted.

use rand_core::{OsRng, RngCore as _};
use sha2::{Digest, Sha256};

const OTP_SPACE: u32 = 1_000_000;

/// A 32-byte random email verification token, hex-encoded (64 chars).
pub fn generate_email_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// A uniformly drawn 6-digit code, zero-padded.
pub fn generate_otp() -> String {
  // Rejection sampling keeps every code equally likely.
  let zone = u32::MAX - u32::MAX % OTP_SPACE;
  loop {
    let v = OsRng.next_u32();
    if v < zone {
      return format!("{:06}", v % OTP_SPACE);
    }
  }
}

/// SHA-256 of a raw credential, hex-encoded.
pub fn digest(raw: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(raw.as_bytes());
  hex::encode(hasher.finalize())
}
