//! Dimension resolution and lookup garbage collection.
//!
//! These run synchronously on the database thread against a connection that
//! is already inside a transaction.

use std::collections::BTreeSet;

use phonebook_core::{
  dimension::{DimensionId, DimensionKind},
  reconcile::{DimensionIds, DimensionNames, ResolvedDimensions},
};
use rusqlite::{Connection, params, params_from_iter};

use crate::encode::{dimension_column, dimension_table};

/// Stays well under SQLite's default host-parameter limit.
const LOOKUP_CHUNK: usize = 500;

/// Map every name in `names` to a lookup row, inserting rows for keys not
/// yet persisted.
pub fn resolve_names(
  conn: &Connection,
  names: &DimensionNames,
) -> rusqlite::Result<ResolvedDimensions> {
  let mut resolved = ResolvedDimensions::default();

  for kind in DimensionKind::all() {
    let table = dimension_table(kind);
    let pending: Vec<(&str, &str)> = names.of_kind(kind).collect();
    if pending.is_empty() {
      continue;
    }

    for chunk in pending.chunks(LOOKUP_CHUNK) {
      let placeholders = vec!["?"; chunk.len()].join(", ");
      let sql =
        format!("SELECT id, name_key FROM {table} WHERE name_key IN ({placeholders})");
      let mut stmt = conn.prepare(&sql)?;
      let rows = stmt.query_map(params_from_iter(chunk.iter().map(|(key, _)| *key)), |row| {
        Ok((row.get::<_, DimensionId>(0)?, row.get::<_, String>(1)?))
      })?;
      for row in rows {
        let (id, key) = row?;
        resolved.found(kind, key, id);
      }
    }

    let mut insert =
      conn.prepare_cached(&format!("INSERT INTO {table} (name, name_key) VALUES (?1, ?2)"))?;
    for (key, name) in pending {
      if resolved.contains(kind, key) {
        continue;
      }
      insert.execute(params![name, key])?;
      resolved.created(kind, key.to_owned(), conn.last_insert_rowid());
    }
  }

  Ok(resolved)
}

/// Delete each released lookup row that no contact references any more.
/// Returns how many rows were removed.
pub fn collect_garbage(
  conn: &Connection,
  released: &BTreeSet<(DimensionKind, DimensionId)>,
) -> rusqlite::Result<usize> {
  let mut removed = 0;
  for &(kind, id) in released {
    let table = dimension_table(kind);
    let column = dimension_column(kind);
    removed += conn.execute(
      &format!(
        "DELETE FROM {table}
         WHERE id = ?1
           AND NOT EXISTS (SELECT 1 FROM contacts WHERE {column} = ?1)"
      ),
      params![id],
    )?;
  }
  Ok(removed)
}

/// Every `(kind, id)` a set of contact rows references.
pub fn released_by(ids: impl IntoIterator<Item = DimensionIds>) -> BTreeSet<(DimensionKind, DimensionId)> {
  ids.into_iter().flat_map(|d| d.iter().collect::<Vec<_>>()).collect()
}
