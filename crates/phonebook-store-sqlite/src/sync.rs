//! The transactional half of directory reconciliation.

use chrono::{DateTime, Utc};
use phonebook_core::{
  entry::DirectoryEntry,
  reconcile::{
    ContactFields, DimensionNames, PersistedDirectoryContact, SyncOutcome, SyncPhase,
    plan_sync,
  },
  source::SourceId,
};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::{
  Error,
  encode::{dimension_ids, encode_dt},
  resolve::{collect_garbage, resolve_names},
};

type PhaseResult<T> = std::result::Result<T, (SyncPhase, Error)>;

fn at(phase: SyncPhase) -> impl Fn(rusqlite::Error) -> (SyncPhase, Error) {
  move |e| (phase, Error::Sqlite(e))
}

/// Resolve, diff and apply one source's entries in a single transaction.
///
/// The transaction is rolled back on drop if any step fails.
pub fn reconcile_source(
  conn: &mut Connection,
  source_id: SourceId,
  entries: &[DirectoryEntry],
  synced_at: DateTime<Utc>,
) -> PhaseResult<SyncOutcome> {
  let tx = conn
    .transaction()
    .map_err(at(SyncPhase::ResolvingDimensions))?;

  let exists = tx
    .query_row("SELECT 1 FROM sources WHERE id = ?1", params![source_id], |_| Ok(()))
    .optional()
    .map_err(at(SyncPhase::ResolvingDimensions))?
    .is_some();
  if !exists {
    return Err((SyncPhase::ResolvingDimensions, Error::SourceNotFound(source_id)));
  }

  // ── ResolvingDimensions ─────────────────────────────────────────────────
  let names = DimensionNames::from_entries(entries);
  let dims = resolve_names(&tx, &names).map_err(at(SyncPhase::ResolvingDimensions))?;

  // ── Diffing ─────────────────────────────────────────────────────────────
  let persisted = load_persisted(&tx, source_id).map_err(at(SyncPhase::Diffing))?;
  let plan = plan_sync(entries, &dims, persisted);

  // ── Applying ────────────────────────────────────────────────────────────
  let stamp = encode_dt(synced_at);
  let applying = at(SyncPhase::Applying);

  {
    let mut delete = tx
      .prepare_cached("DELETE FROM contacts WHERE id = ?1")
      .map_err(&applying)?;
    for id in &plan.deletes {
      delete.execute(params![id]).map_err(&applying)?;
    }

    let mut insert = tx
      .prepare_cached(
        "INSERT INTO contacts (
           display_name, email, phone,
           division_id, department_id, title_id, company_id,
           last_updated, source_id, distinguished_name
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      )
      .map_err(&applying)?;
    for (dn, f) in &plan.inserts {
      insert
        .execute(params![
          f.display_name,
          f.email,
          f.phone,
          f.dimensions.division,
          f.dimensions.department,
          f.dimensions.title,
          f.dimensions.company,
          stamp,
          source_id,
          dn,
        ])
        .map_err(&applying)?;
    }

    let mut update = tx
      .prepare_cached(
        "UPDATE contacts
         SET display_name = ?2, email = ?3, phone = ?4,
             division_id = ?5, department_id = ?6, title_id = ?7, company_id = ?8,
             last_updated = ?9
         WHERE id = ?1",
      )
      .map_err(&applying)?;
    for (id, f) in &plan.updates {
      update
        .execute(params![
          id,
          f.display_name,
          f.email,
          f.phone,
          f.dimensions.division,
          f.dimensions.department,
          f.dimensions.title,
          f.dimensions.company,
          stamp,
        ])
        .map_err(&applying)?;
    }
  }

  let dimensions_removed = collect_garbage(&tx, &plan.released).map_err(&applying)?;

  // ── Completed ───────────────────────────────────────────────────────────
  tx.execute(
    "UPDATE sources SET last_sync_at = ?2 WHERE id = ?1",
    params![source_id, stamp],
  )
  .map_err(at(SyncPhase::Completed))?;
  tx.commit().map_err(at(SyncPhase::Completed))?;

  Ok(SyncOutcome {
    inserted: plan.inserts.len(),
    updated: plan.updates.len(),
    unchanged: plan.unchanged.len(),
    deleted: plan.deletes.len(),
    dimensions_created: dims.created_count(),
    dimensions_removed,
    synced_at,
  })
}

fn load_persisted(
  conn: &Connection,
  source_id: SourceId,
) -> rusqlite::Result<Vec<PersistedDirectoryContact>> {
  let mut stmt = conn.prepare(
    "SELECT id, distinguished_name, display_name, email, phone,
            division_id, department_id, title_id, company_id
     FROM contacts
     WHERE source_id = ?1
     ORDER BY id",
  )?;
  let rows = stmt
    .query_map(params![source_id], |row| {
      Ok(PersistedDirectoryContact {
        id:                 row.get(0)?,
        distinguished_name: row.get(1)?,
        fields:             ContactFields {
          display_name: row.get(2)?,
          email:        row.get(3)?,
          phone:        row.get(4)?,
          dimensions:   dimension_ids(row, 5)?,
        },
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}
