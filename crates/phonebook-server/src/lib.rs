//! Phone directory server: configuration and router assembly.
//!
//! The binary in `main.rs` loads a [`ServerConfig`], opens the SQLite store,
//! spawns the sync scheduler and serves [`router`].

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use axum::Router;
use config::{ConfigError, Environment, File};
use phonebook_api::{ApiState, PagingConfig, api_router};
use phonebook_core::store::DirectoryStore;
use phonebook_sync::{DirectoryFetcher, MalformedPolicy, SchedulerConfig, SyncOptions};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub const ENV_PREFIX: &str = "PHONEBOOK";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Top-level server configuration (deserialised from `config.toml` and
/// `PHONEBOOK_*` environment variables).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  pub store_path:         PathBuf,
  /// Directory holding one `<source id>.json` snapshot per source.
  #[serde(default = "default_snapshot_dir")]
  pub snapshot_dir:       PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
  #[serde(default)]
  pub sync:               SyncConfig,
  #[serde(default)]
  pub paging:             PagingConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_snapshot_dir() -> PathBuf { PathBuf::from("snapshots") }

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Run the periodic scheduler. On-demand syncs work either way.
  pub enabled:            bool,
  pub interval_minutes:   u64,
  pub retry_minutes:      u64,
  pub fetch_timeout_secs: u64,
  pub on_malformed:       MalformedPolicy,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      enabled:            true,
      interval_minutes:   60,
      retry_minutes:      5,
      fetch_timeout_secs: 30,
      on_malformed:       MalformedPolicy::Skip,
    }
  }
}

impl SyncConfig {
  pub fn options(&self) -> SyncOptions {
    SyncOptions {
      fetch_timeout: Duration::from_secs(self.fetch_timeout_secs.max(1)),
      on_malformed:  self.on_malformed,
    }
  }

  pub fn scheduler(&self) -> SchedulerConfig {
    SchedulerConfig {
      interval:    Duration::from_secs(self.interval_minutes.max(1) * 60),
      retry_delay: Duration::from_secs(self.retry_minutes.max(1) * 60),
    }
  }
}

impl ServerConfig {
  /// Load from `path` (optional) overlaid with the environment.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    Self::build(File::from(path).required(false))
  }

  /// `file` overlaid with `PHONEBOOK_*` variables; nested keys use `__`,
  /// e.g. `PHONEBOOK_SYNC__ENABLED=false`.
  pub fn build<T>(file: T) -> Result<Self, ConfigError>
  where
    T: config::Source + Send + Sync + 'static,
  {
    config::Config::builder()
      .add_source(file)
      .add_source(
        Environment::with_prefix(ENV_PREFIX)
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API router with request tracing.
pub fn router<S, F>(state: ApiState<S, F>) -> Router
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  api_router(state).layer(TraceLayer::new_for_http())
}
