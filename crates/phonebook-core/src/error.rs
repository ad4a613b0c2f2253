//! Error types for `phonebook-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown dimension kind: {0:?}")]
  UnknownDimensionKind(String),

  #[error("display name must not be empty")]
  EmptyDisplayName,

  #[error("invalid source: {0}")]
  InvalidSource(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
