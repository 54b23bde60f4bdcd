//! Core types and trait definitions for the fieldtrack location service.
//!
//! Identities, users, jobs, location points and the read models derived from
//! them, plus the [`store::TrackerStore`] trait every backend implements. No
//! HTTP or database code lives here.

#![allow(async_fn_in_trait)]

pub mod error;
pub mod identity;
pub mod job;
pub mod location;
pub mod store;
pub mod summary;
pub mod time;
pub mod user;

pub use error::{Error, Result};
