//! Directory sources, the external LDAP / Active Directory services that
//! contacts are mirrored from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub type SourceId = i64;

pub const DEFAULT_PORT: u16 = 389;
pub const DEFAULT_SEARCH_FILTER: &str = "(&(objectClass=person)(|(sn=*)(cn=*)))";

/// A persisted directory source descriptor.
///
/// The bind password never leaves the process through serialisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySource {
  pub id:            SourceId,
  pub name:          String,
  pub server:        String,
  pub port:          u16,
  pub base_dn:       String,
  pub bind_dn:       String,
  #[serde(skip_serializing, default)]
  pub bind_password: String,
  pub search_filter: String,
  pub use_ssl:       bool,
  pub is_active:     bool,
  /// `None` until the first successful sync.
  pub last_sync_at:  Option<DateTime<Utc>>,
}

/// Input for creating or replacing a source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSource {
  pub name:          String,
  pub server:        String,
  #[serde(default = "default_port")]
  pub port:          u16,
  #[serde(default)]
  pub base_dn:       String,
  #[serde(default)]
  pub bind_dn:       String,
  /// On update, an empty password keeps the stored one.
  #[serde(default)]
  pub bind_password: String,
  #[serde(default = "default_search_filter")]
  pub search_filter: String,
  #[serde(default)]
  pub use_ssl:       bool,
  #[serde(default = "default_active")]
  pub is_active:     bool,
}

fn default_port() -> u16 { DEFAULT_PORT }

fn default_search_filter() -> String { DEFAULT_SEARCH_FILTER.to_owned() }

fn default_active() -> bool { true }

impl NewSource {
  pub fn new(name: impl Into<String>, server: impl Into<String>) -> Self {
    Self {
      name:          name.into(),
      server:        server.into(),
      port:          DEFAULT_PORT,
      base_dn:       String::new(),
      bind_dn:       String::new(),
      bind_password: String::new(),
      search_filter: DEFAULT_SEARCH_FILTER.to_owned(),
      use_ssl:       false,
      is_active:     true,
    }
  }

  /// Reject descriptors that could never be fetched from.
  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::InvalidSource("name must not be empty".into()));
    }
    if self.server.trim().is_empty() {
      return Err(Error::InvalidSource("server must not be empty".into()));
    }
    if self.port == 0 {
      return Err(Error::InvalidSource("port must be non-zero".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_source_defaults() {
    let s = NewSource::new("HQ", "ldap.example.com");
    assert_eq!(s.port, 389);
    assert_eq!(s.search_filter, DEFAULT_SEARCH_FILTER);
    assert!(s.is_active);
    assert!(s.validate().is_ok());
  }

  #[test]
  fn validate_rejects_blank_server() {
    let s = NewSource::new("HQ", "  ");
    assert!(matches!(s.validate(), Err(Error::InvalidSource(_))));
  }

  #[test]
  fn deserialize_fills_defaults() {
    let s: NewSource =
      serde_json::from_str(r#"{"name":"HQ","server":"ldap"}"#).unwrap();
    assert_eq!(s.port, DEFAULT_PORT);
    assert!(s.is_active);
    assert!(!s.use_ssl);
  }

  #[test]
  fn password_is_not_serialized() {
    let src = DirectorySource {
      id:            1,
      name:          "HQ".into(),
      server:        "ldap".into(),
      port:          389,
      base_dn:       String::new(),
      bind_dn:       "cn=admin".into(),
      bind_password: "hunter2".into(),
      search_filter: DEFAULT_SEARCH_FILTER.into(),
      use_ssl:       false,
      is_active:     true,
      last_sync_at:  None,
    };
    let json = serde_json::to_string(&src).unwrap();
    assert!(!json.contains("hunter2"), "{json}");
  }
}
