//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Rows are read into plain
//! `Raw*` structs on the database thread and decoded afterwards, so decode
//! failures surface as [`Error`] rather than as `rusqlite` errors.

use chrono::{DateTime, Utc};
use phonebook_core::{
  contact::{ContactOrigin, ContactView},
  dimension::{Dimension, DimensionKind, DimensionRef},
  reconcile::DimensionIds,
  source::DirectorySource,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── DimensionKind ───────────────────────────────────────────────────────────

/// The lookup table backing one dimension kind.
pub fn dimension_table(kind: DimensionKind) -> &'static str {
  match kind {
    DimensionKind::Division => "divisions",
    DimensionKind::Department => "departments",
    DimensionKind::Title => "titles",
    DimensionKind::Company => "companies",
  }
}

/// The `contacts` column referencing one dimension kind.
pub fn dimension_column(kind: DimensionKind) -> &'static str {
  match kind {
    DimensionKind::Division => "division_id",
    DimensionKind::Department => "department_id",
    DimensionKind::Title => "title_id",
    DimensionKind::Company => "company_id",
  }
}

/// Read the four dimension id columns starting at `first`, in
/// division / department / title / company order.
pub fn dimension_ids(row: &rusqlite::Row<'_>, first: usize) -> rusqlite::Result<DimensionIds> {
  Ok(DimensionIds {
    division:   row.get(first)?,
    department: row.get(first + 1)?,
    title:      row.get(first + 2)?,
    company:    row.get(first + 3)?,
  })
}

// ─── Sources ─────────────────────────────────────────────────────────────────

pub const SOURCE_SELECT: &str = "
  SELECT id, name, server, port, base_dn, bind_dn, bind_password,
         search_filter, use_ssl, is_active, last_sync_at
  FROM sources";

/// Raw values read directly from a `sources` row.
pub struct RawSource {
  pub id:            i64,
  pub name:          String,
  pub server:        String,
  pub port:          i64,
  pub base_dn:       String,
  pub bind_dn:       String,
  pub bind_password: String,
  pub search_filter: String,
  pub use_ssl:       bool,
  pub is_active:     bool,
  pub last_sync_at:  Option<String>,
}

impl RawSource {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      name:          row.get(1)?,
      server:        row.get(2)?,
      port:          row.get(3)?,
      base_dn:       row.get(4)?,
      bind_dn:       row.get(5)?,
      bind_password: row.get(6)?,
      search_filter: row.get(7)?,
      use_ssl:       row.get(8)?,
      is_active:     row.get(9)?,
      last_sync_at:  row.get(10)?,
    })
  }

  pub fn into_source(self) -> Result<DirectorySource> {
    let port = u16::try_from(self.port)
      .map_err(|_| Error::InvalidRow(format!("source {}: port {} out of range", self.id, self.port)))?;

    Ok(DirectorySource {
      id: self.id,
      name: self.name,
      server: self.server,
      port,
      base_dn: self.base_dn,
      bind_dn: self.bind_dn,
      bind_password: self.bind_password,
      search_filter: self.search_filter,
      use_ssl: self.use_ssl,
      is_active: self.is_active,
      last_sync_at: self.last_sync_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

// ─── Contacts ────────────────────────────────────────────────────────────────

/// A contact row with its four dimension rows joined in. Callers append a
/// `WHERE` / `ORDER BY` tail.
pub const CONTACT_SELECT: &str = "
  SELECT c.id, c.display_name, c.email, c.phone,
         dv.id, dv.name, dv.weight,
         dp.id, dp.name, dp.weight,
         ti.id, ti.name, ti.weight,
         co.id, co.name, co.weight,
         c.source_id, c.distinguished_name, c.last_updated
  FROM contacts c
  LEFT JOIN divisions   dv ON dv.id = c.division_id
  LEFT JOIN departments dp ON dp.id = c.department_id
  LEFT JOIN titles      ti ON ti.id = c.title_id
  LEFT JOIN companies   co ON co.id = c.company_id
  LEFT JOIN sources     s  ON s.id  = c.source_id";

/// Contacts shown in listings: manual ones, and those of active sources.
pub const VISIBLE: &str = "(c.source_id IS NULL OR s.is_active = 1)";

/// Merge order: manual contacts first, then storage order.
pub const MERGE_ORDER: &str = "ORDER BY (c.source_id IS NOT NULL), c.id";

type RawDimension = (Option<i64>, Option<String>, Option<i32>);

/// Raw values read directly from a [`CONTACT_SELECT`] row.
pub struct RawContact {
  pub id:                 i64,
  pub display_name:       String,
  pub email:              String,
  pub phone:              String,
  pub division:           RawDimension,
  pub department:         RawDimension,
  pub title:              RawDimension,
  pub company:            RawDimension,
  pub source_id:          Option<i64>,
  pub distinguished_name: Option<String>,
  pub last_updated:       String,
}

fn raw_dimension(row: &rusqlite::Row<'_>, first: usize) -> rusqlite::Result<RawDimension> {
  Ok((row.get(first)?, row.get(first + 1)?, row.get(first + 2)?))
}

fn into_ref((id, name, weight): RawDimension) -> Option<DimensionRef> {
  Some(DimensionRef { id: id?, name: name?, weight: weight.unwrap_or(0) })
}

impl RawContact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      display_name:       row.get(1)?,
      email:              row.get(2)?,
      phone:              row.get(3)?,
      division:           raw_dimension(row, 4)?,
      department:         raw_dimension(row, 7)?,
      title:              raw_dimension(row, 10)?,
      company:            raw_dimension(row, 13)?,
      source_id:          row.get(16)?,
      distinguished_name: row.get(17)?,
      last_updated:       row.get(18)?,
    })
  }

  pub fn into_view(self) -> Result<ContactView> {
    let origin = match (self.source_id, self.distinguished_name) {
      (None, None) => ContactOrigin::Manual,
      (Some(source_id), Some(distinguished_name)) => {
        ContactOrigin::Directory { source_id, distinguished_name }
      }
      _ => {
        return Err(Error::InvalidRow(format!(
          "contact {}: source and distinguished name must be set together",
          self.id
        )));
      }
    };

    Ok(ContactView {
      id: self.id,
      display_name: self.display_name,
      email: self.email,
      phone: self.phone,
      division: into_ref(self.division),
      department: into_ref(self.department),
      title: into_ref(self.title),
      company: into_ref(self.company),
      origin,
      last_updated: decode_dt(&self.last_updated)?,
    })
  }
}

// ─── Dimensions ──────────────────────────────────────────────────────────────

pub fn dimension_from_row(kind: DimensionKind, row: &rusqlite::Row<'_>) -> rusqlite::Result<Dimension> {
  Ok(Dimension {
    id: row.get(0)?,
    kind,
    name: row.get(1)?,
    weight: row.get(2)?,
  })
}
