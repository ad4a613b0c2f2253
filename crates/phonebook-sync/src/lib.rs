//! Directory synchronisation drivers.
//!
//! [`fetch`] defines where raw entries come from, [`reconciler`] runs one
//! sync cycle per source against a [`phonebook_core::store::DirectoryStore`],
//! and [`scheduler`] repeats sync-all on an interval until cancelled.

pub mod error;
pub mod fetch;
pub mod reconciler;
pub mod scheduler;

pub use error::{FetchError, SyncError};
pub use fetch::{DirectoryFetcher, SnapshotFetcher};
pub use reconciler::{
  BatchReport, MalformedPolicy, Reconciler, SourceSyncResult, SyncOptions, SyncReport,
  SyncStatus,
};
pub use scheduler::{Scheduler, SchedulerConfig};
