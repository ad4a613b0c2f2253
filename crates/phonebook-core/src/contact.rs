//! Contacts, the rows shown in the directory.
//!
//! A contact is either entered by hand or mirrored from a directory source.
//! The only behavioural difference is reconciliation eligibility, so the
//! origin is a tag on the contact rather than a separate type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  dimension::{DimensionKind, DimensionRef, clean_name},
  source::SourceId,
};

pub type ContactId = i64;

/// Where a contact came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContactOrigin {
  /// Created and edited by an administrator. Never touched by a sync.
  Manual,
  /// Owned by one source; the DN is unique within that source only.
  Directory {
    source_id:          SourceId,
    distinguished_name: String,
  },
}

impl ContactOrigin {
  pub fn is_manual(&self) -> bool { matches!(self, Self::Manual) }
}

/// The read model for one contact, with its dimension rows joined in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactView {
  pub id:           ContactId,
  pub display_name: String,
  pub email:        String,
  pub phone:        String,
  pub division:     Option<DimensionRef>,
  pub department:   Option<DimensionRef>,
  pub title:        Option<DimensionRef>,
  pub company:      Option<DimensionRef>,
  pub origin:       ContactOrigin,
  pub last_updated: DateTime<Utc>,
}

impl ContactView {
  pub fn dimension(&self, kind: DimensionKind) -> Option<&DimensionRef> {
    match kind {
      DimensionKind::Division => self.division.as_ref(),
      DimensionKind::Department => self.department.as_ref(),
      DimensionKind::Title => self.title.as_ref(),
      DimensionKind::Company => self.company.as_ref(),
    }
  }

  /// The dimension name if the contact references a row with a non-blank
  /// name.
  pub fn dimension_name(&self, kind: DimensionKind) -> Option<&str> {
    clean_name(self.dimension(kind).map(|d| d.name.as_str()))
  }
}

/// Input for creating or editing a manual contact. Dimension values are free
/// text and are resolved to lookup rows by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewManualContact {
  pub display_name: String,
  #[serde(default)]
  pub email:        String,
  #[serde(default)]
  pub phone:        String,
  #[serde(default)]
  pub division:     Option<String>,
  #[serde(default)]
  pub department:   Option<String>,
  #[serde(default)]
  pub title:        Option<String>,
  #[serde(default)]
  pub company:      Option<String>,
}

impl NewManualContact {
  pub fn new(display_name: impl Into<String>) -> Self {
    Self { display_name: display_name.into(), ..Self::default() }
  }

  pub fn validate(&self) -> Result<()> {
    if self.display_name.trim().is_empty() {
      return Err(Error::EmptyDisplayName);
    }
    Ok(())
  }

  pub fn dimension_name(&self, kind: DimensionKind) -> Option<&str> {
    let raw = match kind {
      DimensionKind::Division => self.division.as_deref(),
      DimensionKind::Department => self.department.as_deref(),
      DimensionKind::Title => self.title.as_deref(),
      DimensionKind::Company => self.company.as_deref(),
    };
    clean_name(raw)
  }
}
