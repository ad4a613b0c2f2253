//! Periodic sync-all.
//!
//! Runs one pass at startup, then one per interval. If a pass cannot even
//! list the sources, the next attempt comes after the shorter retry delay.
//! Cancellation is observed only between passes; a pass in progress runs to
//! completion.

use std::{sync::Arc, time::Duration};

use phonebook_core::store::DirectoryStore;
use tokio::sync::watch;
use tracing::{error, info};

use crate::{DirectoryFetcher, Reconciler};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
  pub interval:    Duration,
  pub retry_delay: Duration,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      interval:    Duration::from_secs(60 * 60),
      retry_delay: Duration::from_secs(5 * 60),
    }
  }
}

pub struct Scheduler<S, F> {
  reconciler: Arc<Reconciler<S, F>>,
  config:     SchedulerConfig,
}

impl<S, F> Scheduler<S, F>
where
  S: DirectoryStore,
  F: DirectoryFetcher,
{
  pub fn new(reconciler: Arc<Reconciler<S, F>>, config: SchedulerConfig) -> Self {
    Self { reconciler, config }
  }

  /// Run until `cancel` turns `true` or its sender is dropped. Spawn this as
  /// a background task.
  pub async fn run(self, mut cancel: watch::Receiver<bool>) {
    info!(
      interval_secs = self.config.interval.as_secs(),
      retry_secs = self.config.retry_delay.as_secs(),
      "directory sync scheduler started"
    );

    loop {
      if *cancel.borrow() {
        break;
      }

      let delay = match self.reconciler.sync_all().await {
        Ok(_) => self.config.interval,
        Err(e) => {
          error!(error = %e, "sync pass failed; retrying later");
          self.config.retry_delay
        }
      };

      if cancelled_while_waiting(delay, &mut cancel).await {
        break;
      }
    }

    info!("directory sync scheduler stopped");
  }
}

/// Sleep for `delay`; `true` if cancellation arrived first.
async fn cancelled_while_waiting(delay: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
  let sleep = tokio::time::sleep(delay);
  tokio::pin!(sleep);

  loop {
    tokio::select! {
      _ = &mut sleep => return false,
      changed = cancel.changed() => {
        if changed.is_err() || *cancel.borrow() {
          return true;
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use phonebook_core::{entry::RawEntry, source::{DirectorySource, NewSource}};
  use phonebook_store_sqlite::SqliteStore;

  use super::*;
  use crate::{FetchError, SyncOptions};

  struct OneEntry;

  impl DirectoryFetcher for OneEntry {
    async fn fetch<'a>(&'a self, _source: &'a DirectorySource) -> Result<Vec<RawEntry>, FetchError> {
      Ok(vec![RawEntry {
        distinguished_name: Some("cn=a".into()),
        display_name: Some("A".into()),
        ..RawEntry::default()
      }])
    }
  }

  #[tokio::test]
  async fn syncs_at_start_and_stops_on_cancel() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let id = store.add_source(NewSource::new("HQ", "ldap")).await.unwrap().id;
    let reconciler = Arc::new(Reconciler::new(store.clone(), Arc::new(OneEntry), SyncOptions::default()));

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(Scheduler::new(reconciler, SchedulerConfig::default()).run(rx));

    let mut synced = false;
    for _ in 0..100 {
      if store.get_source(id).await.unwrap().unwrap().last_sync_at.is_some() {
        synced = true;
        break;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(synced, "initial pass never ran");

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
      .await
      .expect("scheduler did not stop")
      .unwrap();
  }

  #[tokio::test]
  async fn dropped_sender_stops_the_wait() {
    let (tx, mut rx) = watch::channel(false);
    drop(tx);
    assert!(cancelled_while_waiting(Duration::from_secs(3600), &mut rx).await);
  }

  #[tokio::test]
  async fn elapsed_delay_is_not_a_cancellation() {
    let (_tx, mut rx) = watch::channel(false);
    assert!(!cancelled_while_waiting(Duration::from_millis(5), &mut rx).await);
  }
}
