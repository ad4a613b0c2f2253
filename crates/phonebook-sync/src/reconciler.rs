//! One sync cycle per source, and the sync-all driver.
//!
//! A cycle is `Fetching → ResolvingDimensions → Diffing → Applying →
//! Completed`. Fetching and screening happen here; the remaining phases run
//! inside the store's transaction. At most one cycle per source is in flight:
//! a second trigger for the same source waits for the first to finish.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
  time::Duration,
};

use chrono::{DateTime, Utc};
use phonebook_core::{
  entry::screen,
  reconcile::{SyncOutcome, SyncPhase},
  source::{DirectorySource, SourceId},
  store::DirectoryStore,
};
use serde::{Deserialize, Serialize};
use tracing::{Instrument as _, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::{DirectoryFetcher, FetchError, SyncError};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// What to do with entries that have no distinguished name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
  /// Drop them, count them, carry on.
  #[default]
  Skip,
  /// Fail the cycle; nothing is written.
  Abort,
}

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
  pub fetch_timeout: Duration,
  pub on_malformed:  MalformedPolicy,
}

impl Default for SyncOptions {
  fn default() -> Self {
    Self {
      fetch_timeout: DEFAULT_FETCH_TIMEOUT,
      on_malformed:  MalformedPolicy::Skip,
    }
  }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

/// Counts for one completed cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
  pub run_id:             Uuid,
  pub source_id:          SourceId,
  pub fetched:            usize,
  pub malformed:          usize,
  pub duplicates:         usize,
  pub inserted:           usize,
  pub updated:            usize,
  pub unchanged:          usize,
  pub deleted:            usize,
  pub dimensions_created: usize,
  pub dimensions_removed: usize,
  pub synced_at:          DateTime<Utc>,
}

impl SyncReport {
  fn new(
    run_id: Uuid,
    source_id: SourceId,
    fetched: usize,
    malformed: usize,
    duplicates: usize,
    outcome: SyncOutcome,
  ) -> Self {
    Self {
      run_id,
      source_id,
      fetched,
      malformed,
      duplicates,
      inserted: outcome.inserted,
      updated: outcome.updated,
      unchanged: outcome.unchanged,
      deleted: outcome.deleted,
      dimensions_created: outcome.dimensions_created,
      dimensions_removed: outcome.dimensions_removed,
      synced_at: outcome.synced_at,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncStatus {
  Completed { report: SyncReport },
  Failed { phase: SyncPhase, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSyncResult {
  pub source_id:   SourceId,
  pub source_name: String,
  #[serde(flatten)]
  pub status:      SyncStatus,
}

/// The outcome of a sync-all pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
  pub run_id:  Uuid,
  pub results: Vec<SourceSyncResult>,
}

impl BatchReport {
  pub fn succeeded(&self) -> usize {
    self
      .results
      .iter()
      .filter(|r| matches!(r.status, SyncStatus::Completed { .. }))
      .count()
  }

  pub fn failed(&self) -> usize { self.results.len() - self.succeeded() }
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

/// Drives sync cycles for a store and a fetcher.
pub struct Reconciler<S, F> {
  store:   Arc<S>,
  fetcher: Arc<F>,
  options: SyncOptions,
  locks:   Mutex<HashMap<SourceId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<S, F> Reconciler<S, F>
where
  S: DirectoryStore,
  F: DirectoryFetcher,
{
  pub fn new(store: Arc<S>, fetcher: Arc<F>, options: SyncOptions) -> Self {
    Self { store, fetcher, options, locks: Mutex::new(HashMap::new()) }
  }

  fn lock_for(&self, source_id: SourceId) -> Arc<tokio::sync::Mutex<()>> {
    let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
    // Only the map holds an idle lock; nobody is syncing or waiting on it.
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    locks.entry(source_id).or_default().clone()
  }

  /// Sync one source by id, active or not.
  #[instrument(skip(self))]
  pub async fn sync_source(&self, source_id: SourceId) -> Result<SyncReport, SyncError<S::Error>> {
    let lock = self.lock_for(source_id);
    let _guard = lock.lock().await;

    // Read after acquiring the lock so a concurrent edit is picked up.
    let source = self
      .store
      .get_source(source_id)
      .await
      .map_err(SyncError::Store)?
      .ok_or(SyncError::SourceNotFound(source_id))?;

    self.run_cycle(&source).await
  }

  /// Sync every active source in turn. A failing source is recorded and the
  /// pass continues with the next one.
  #[instrument(skip(self))]
  pub async fn sync_all(&self) -> Result<BatchReport, SyncError<S::Error>> {
    let run_id = Uuid::new_v4();
    let sources = self.store.list_sources(true).await.map_err(SyncError::Store)?;
    info!(%run_id, sources = sources.len(), "starting sync of all active sources");

    let mut results = Vec::with_capacity(sources.len());
    for source in sources {
      let status = match self.sync_source(source.id).await {
        Ok(report) => SyncStatus::Completed { report },
        Err(e) => SyncStatus::Failed {
          phase:  e.phase(),
          reason: e.summary().to_owned(),
        },
      };
      results.push(SourceSyncResult {
        source_id: source.id,
        source_name: source.name,
        status,
      });
    }

    let batch = BatchReport { run_id, results };
    info!(
      %run_id,
      succeeded = batch.succeeded(),
      failed = batch.failed(),
      "sync of all active sources finished"
    );
    Ok(batch)
  }

  async fn run_cycle(&self, source: &DirectorySource) -> Result<SyncReport, SyncError<S::Error>> {
    let run_id = Uuid::new_v4();
    let span = info_span!("sync_cycle", %run_id, source_id = source.id, source = %source.name);

    let result = self.run_phases(run_id, source).instrument(span.clone()).await;
    let _entered = span.enter();
    match &result {
      Ok(report) => info!(
        fetched = report.fetched,
        inserted = report.inserted,
        updated = report.updated,
        unchanged = report.unchanged,
        deleted = report.deleted,
        dimensions_created = report.dimensions_created,
        dimensions_removed = report.dimensions_removed,
        "directory sync completed"
      ),
      Err(e) => error!(phase = %e.phase(), error = %e, "directory sync failed"),
    }
    result
  }

  async fn run_phases(
    &self,
    run_id: Uuid,
    source: &DirectorySource,
  ) -> Result<SyncReport, SyncError<S::Error>> {
    // ── Fetching ──────────────────────────────────────────────────────────
    let timeout = self.options.fetch_timeout;
    let raw = tokio::time::timeout(timeout, self.fetcher.fetch(source))
      .await
      .map_err(|_| SyncError::Fetch(FetchError::Timeout(timeout)))?
      .map_err(SyncError::Fetch)?;
    let fetched = raw.len();

    let screened = screen(raw);
    if screened.malformed > 0 {
      match self.options.on_malformed {
        MalformedPolicy::Abort => {
          return Err(SyncError::Malformed { count: screened.malformed });
        }
        MalformedPolicy::Skip => {
          warn!(count = screened.malformed, "skipping entries without a distinguished name");
        }
      }
    }
    if screened.duplicates > 0 {
      warn!(count = screened.duplicates, "dropping repeated distinguished names");
    }

    // ── ResolvingDimensions → Completed, in one store transaction ─────────
    let outcome = self
      .store
      .reconcile_source(source.id, screened.entries, Utc::now())
      .await
      .map_err(SyncError::Reconcile)?;

    Ok(SyncReport::new(
      run_id,
      source.id,
      fetched,
      screened.malformed,
      screened.duplicates,
      outcome,
    ))
  }
}
