//! Error types for `phonebook-sync`.

use std::{path::PathBuf, time::Duration};

use phonebook_core::{
  reconcile::{ReconcileError, SyncPhase},
  source::SourceId,
};
use thiserror::Error;

/// Why a fetcher could not produce entries for a source.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("fetch timed out after {0:?}")]
  Timeout(Duration),

  #[error("directory unreachable: {0}")]
  Unreachable(String),

  #[error("directory protocol error: {0}")]
  Protocol(String),

  #[error("no snapshot at {}", .0.display())]
  MissingSnapshot(PathBuf),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("snapshot is not valid JSON: {0}")]
  Json(#[from] serde_json::Error),
}

/// A failed sync cycle for one source. `E` is the store's error type.
#[derive(Debug, Error)]
pub enum SyncError<E: std::error::Error + 'static> {
  #[error("source not found: {0}")]
  SourceNotFound(SourceId),

  #[error("fetch failed: {0}")]
  Fetch(#[source] FetchError),

  #[error("{count} malformed entries in fetch")]
  Malformed { count: usize },

  #[error("store error: {0}")]
  Store(#[source] E),

  #[error(transparent)]
  Reconcile(ReconcileError<E>),
}

impl<E: std::error::Error + 'static> SyncError<E> {
  /// The phase the cycle was in when it failed.
  pub fn phase(&self) -> SyncPhase {
    match self {
      Self::Reconcile(e) => e.phase,
      _ => SyncPhase::Fetching,
    }
  }

  /// A message safe to show to clients; the full error goes to the log.
  pub fn summary(&self) -> &'static str {
    match self {
      Self::SourceNotFound(_) => "source not found",
      Self::Fetch(FetchError::Timeout(_)) => "directory fetch timed out",
      Self::Fetch(_) => "directory fetch failed",
      Self::Malformed { .. } => "directory returned malformed entries",
      Self::Store(_) | Self::Reconcile(_) => "persisting the sync failed",
    }
  }
}
