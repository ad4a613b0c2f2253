//! Where raw directory entries come from.
//!
//! The protocol client (bind, TLS, paged search) lives outside this
//! workspace. What ships here is [`SnapshotFetcher`], which reads the JSON
//! export such a client produces: one file per source, named
//! `<source id>.json`, holding an array of [`RawEntry`] objects.

use std::{
  future::Future,
  io::ErrorKind,
  path::PathBuf,
};

use phonebook_core::{entry::RawEntry, source::DirectorySource};
use tracing::debug;

use crate::FetchError;

/// Fetch every entry a source currently exposes.
///
/// Entries are returned in directory order. Implementations must not filter
/// or deduplicate; screening happens in the reconciler.
pub trait DirectoryFetcher: Send + Sync {
  fn fetch<'a>(
    &'a self,
    source: &'a DirectorySource,
  ) -> impl Future<Output = Result<Vec<RawEntry>, FetchError>> + Send + 'a;
}

/// Reads `<dir>/<source id>.json` snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotFetcher {
  dir: PathBuf,
}

impl SnapshotFetcher {
  pub fn new(dir: impl Into<PathBuf>) -> Self { Self { dir: dir.into() } }

  pub fn snapshot_path(&self, source: &DirectorySource) -> PathBuf {
    self.dir.join(format!("{}.json", source.id))
  }
}

impl DirectoryFetcher for SnapshotFetcher {
  async fn fetch<'a>(&'a self, source: &'a DirectorySource) -> Result<Vec<RawEntry>, FetchError> {
    let path = self.snapshot_path(source);
    let bytes = match tokio::fs::read(&path).await {
      Ok(b) => b,
      Err(e) if e.kind() == ErrorKind::NotFound => return Err(FetchError::MissingSnapshot(path)),
      Err(e) => return Err(e.into()),
    };
    let entries: Vec<RawEntry> = serde_json::from_slice(&bytes)?;
    debug!(source_id = source.id, path = %path.display(), count = entries.len(), "read snapshot");
    Ok(entries)
  }
}

#[cfg(test)]
mod tests {
  use phonebook_core::source::DEFAULT_SEARCH_FILTER;

  use super::*;

  fn source(id: i64) -> DirectorySource {
    DirectorySource {
      id,
      name: format!("source {id}"),
      server: "ldap".into(),
      port: 389,
      base_dn: String::new(),
      bind_dn: String::new(),
      bind_password: String::new(),
      search_filter: DEFAULT_SEARCH_FILTER.into(),
      use_ssl: false,
      is_active: true,
      last_sync_at: None,
    }
  }

  #[tokio::test]
  async fn reads_snapshot_by_source_id() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join("3.json"),
      r#"[{"dn":"cn=a","displayName":"A"},{"distinguishedName":"cn=b","givenName":"B"}]"#,
    )
    .unwrap();

    let fetcher = SnapshotFetcher::new(dir.path());
    let entries = fetcher.fetch(&source(3)).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].distinguished_name.as_deref(), Some("cn=b"));
  }

  #[tokio::test]
  async fn missing_snapshot_is_a_fetch_failure() {
    let dir = tempfile::tempdir().unwrap();
    let err = SnapshotFetcher::new(dir.path())
      .fetch(&source(9))
      .await
      .unwrap_err();
    assert!(matches!(err, FetchError::MissingSnapshot(_)));
  }

  #[tokio::test]
  async fn invalid_json_is_a_fetch_failure() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("1.json"), "{ not json").unwrap();
    let err = SnapshotFetcher::new(dir.path())
      .fetch(&source(1))
      .await
      .unwrap_err();
    assert!(matches!(err, FetchError::Json(_)));
  }
}
