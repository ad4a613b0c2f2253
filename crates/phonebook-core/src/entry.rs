//! Raw directory entries and their screening before reconciliation.
//!
//! A fetcher hands back whatever the directory returned. Screening turns that
//! into a list of [`DirectoryEntry`] values keyed by a non-blank, unique
//! distinguished name, counting what had to be dropped along the way.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::dimension::{DimensionKind, clean_name};

/// One entry as returned by a directory fetcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry {
  #[serde(default, alias = "dn")]
  pub distinguished_name: Option<String>,
  #[serde(default)]
  pub display_name:       Option<String>,
  #[serde(default)]
  pub given_name:         Option<String>,
  #[serde(default, alias = "sn")]
  pub surname:            Option<String>,
  #[serde(default, alias = "mail")]
  pub email:              Option<String>,
  #[serde(default, alias = "telephoneNumber")]
  pub phone:              Option<String>,
  #[serde(default)]
  pub division_name:      Option<String>,
  #[serde(default)]
  pub department_name:    Option<String>,
  #[serde(default)]
  pub title_name:         Option<String>,
  #[serde(default)]
  pub company_name:       Option<String>,
}

/// A screened entry: the DN is present, trimmed and unique within its batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
  pub distinguished_name: String,
  pub display_name:       String,
  pub email:              String,
  pub phone:              String,
  pub division:           Option<String>,
  pub department:         Option<String>,
  pub title:              Option<String>,
  pub company:            Option<String>,
}

impl DirectoryEntry {
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

/// The result of [`screen`].
#[derive(Debug, Clone, Default)]
pub struct ScreenedEntries {
  /// Valid entries in fetch order.
  pub entries:    Vec<DirectoryEntry>,
  /// Entries dropped for lacking a distinguished name.
  pub malformed:  usize,
  /// Entries dropped because an earlier entry had the same DN.
  pub duplicates: usize,
}

/// Drop entries without a DN and repeated DNs (first occurrence wins).
pub fn screen(raw: Vec<RawEntry>) -> ScreenedEntries {
  let mut out = ScreenedEntries::default();
  let mut seen: HashSet<String> = HashSet::new();

  for entry in raw {
    let Some(dn) = clean_name(entry.distinguished_name.as_deref()) else {
      out.malformed += 1;
      continue;
    };
    if !seen.insert(dn.to_owned()) {
      out.duplicates += 1;
      continue;
    }
    out.entries.push(DirectoryEntry::from_raw(dn.to_owned(), entry));
  }

  out
}

impl DirectoryEntry {
  fn from_raw(distinguished_name: String, raw: RawEntry) -> Self {
    let display_name = match clean_name(raw.display_name.as_deref()) {
      Some(name) => name.to_owned(),
      // Fall back to "given surname" when the directory has no displayName.
      None => [raw.given_name.as_deref(), raw.surname.as_deref()]
        .into_iter()
        .filter_map(clean_name)
        .collect::<Vec<_>>()
        .join(" "),
    };

    let text = |v: Option<String>| v.map(|s| s.trim().to_owned()).unwrap_or_default();
    let dim = |v: Option<String>| clean_name(v.as_deref()).map(str::to_owned);

    Self {
      distinguished_name,
      display_name,
      email: text(raw.email),
      phone: text(raw.phone),
      division: dim(raw.division_name),
      department: dim(raw.department_name),
      title: dim(raw.title_name),
      company: dim(raw.company_name),
    }
  }
}
