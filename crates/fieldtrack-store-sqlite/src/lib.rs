//! [`TrackerStore`](fieldtrack_core::store::TrackerStore) on a single SQLite
//! file.
//!
//! Every query runs on the `tokio_rusqlite` connection thread, and the
//! multi-row lifecycle writes (opening and closing jobs, recording a point
//! against a job, consuming a credential) each run in one transaction there.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
