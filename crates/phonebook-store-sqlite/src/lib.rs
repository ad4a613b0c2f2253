//! SQLite backend for the phone directory.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every multi-statement operation
//! (reconciling a source, editing a manual contact, deleting a source) runs
//! inside one SQLite transaction on that thread.

mod encode;
mod resolve;
mod schema;
mod store;
mod sync;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
