//! Error type for `phonebook-store-sqlite`.

use phonebook_core::source::SourceId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] phonebook_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A row violates an invariant the schema is meant to enforce.
  #[error("invalid row: {0}")]
  InvalidRow(String),

  #[error("source not found: {0}")]
  SourceNotFound(SourceId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
