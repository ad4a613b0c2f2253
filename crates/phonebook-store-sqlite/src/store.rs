//! [`SqliteStore`]: the SQLite implementation of [`DirectoryStore`].

use std::{collections::BTreeSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, params};

use phonebook_core::{
  contact::{ContactId, ContactView, NewManualContact},
  dimension::{self, Dimension, DimensionId, DimensionKind},
  entry::DirectoryEntry,
  reconcile::{DimensionNames, ReconcileError, ResolvedDimensions, SyncOutcome, SyncPhase},
  source::{DirectorySource, NewSource, SourceId},
  store::DirectoryStore,
};

use crate::{
  Error, Result,
  encode::{
    CONTACT_SELECT, MERGE_ORDER, RawContact, RawSource, SOURCE_SELECT, VISIBLE,
    dimension_from_row, dimension_ids, dimension_table, encode_dt,
  },
  resolve::{collect_garbage, released_by, resolve_names},
  schema::SCHEMA,
  sync,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A phone directory store backed by a single SQLite file.
///
/// Cloning shares the inner reference-counted connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn source_by_id(&self, id: SourceId) -> Result<Option<DirectorySource>> {
    let sql = format!("{SOURCE_SELECT} WHERE id = ?1");
    let raw: Option<RawSource> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, params![id], RawSource::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSource::into_source).transpose()
  }

  /// Load one contact, optionally hiding contacts of inactive sources.
  async fn contact_by_id(
    &self,
    id: ContactId,
    visible_only: bool,
  ) -> Result<Option<ContactView>> {
    let sql = if visible_only {
      format!("{CONTACT_SELECT} WHERE c.id = ?1 AND {VISIBLE}")
    } else {
      format!("{CONTACT_SELECT} WHERE c.id = ?1")
    };

    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, params![id], RawContact::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContact::into_view).transpose()
  }

  async fn contacts_where(&self, tail: String, source_id: Option<SourceId>) -> Result<Vec<ContactView>> {
    let sql = format!("{CONTACT_SELECT} {tail}");
    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match source_id {
          Some(id) => stmt.query_map(params![id], RawContact::from_row)?,
          None => stmt.query_map([], RawContact::from_row)?,
        }
        .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_view).collect()
  }
}

// ─── DirectoryStore impl ─────────────────────────────────────────────────────

impl DirectoryStore for SqliteStore {
  type Error = Error;

  // ── Sources ───────────────────────────────────────────────────────────────

  async fn add_source(&self, input: NewSource) -> Result<DirectorySource> {
    input.validate()?;

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sources (
             name, server, port, base_dn, bind_dn, bind_password,
             search_filter, use_ssl, is_active
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          params![
            input.name.trim(),
            input.server.trim(),
            input.port,
            input.base_dn,
            input.bind_dn,
            input.bind_password,
            input.search_filter,
            input.use_ssl,
            input.is_active,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    self
      .source_by_id(id)
      .await?
      .ok_or(Error::SourceNotFound(id))
  }

  async fn get_source(&self, id: SourceId) -> Result<Option<DirectorySource>> {
    self.source_by_id(id).await
  }

  async fn list_sources(&self, active_only: bool) -> Result<Vec<DirectorySource>> {
    let sql = format!("{SOURCE_SELECT} WHERE (?1 = 0 OR is_active = 1) ORDER BY id");

    let raws: Vec<RawSource> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params![active_only], RawSource::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSource::into_source).collect()
  }

  async fn update_source(
    &self,
    id: SourceId,
    input: NewSource,
  ) -> Result<Option<DirectorySource>> {
    input.validate()?;

    let changed = self
      .conn
      .call(move |conn| {
        // An empty password keeps the stored one.
        let n = conn.execute(
          "UPDATE sources
           SET name = ?2, server = ?3, port = ?4, base_dn = ?5, bind_dn = ?6,
               bind_password = CASE WHEN ?7 = '' THEN bind_password ELSE ?7 END,
               search_filter = ?8, use_ssl = ?9, is_active = ?10
           WHERE id = ?1",
          params![
            id,
            input.name.trim(),
            input.server.trim(),
            input.port,
            input.base_dn,
            input.bind_dn,
            input.bind_password,
            input.search_filter,
            input.use_ssl,
            input.is_active,
          ],
        )?;
        Ok(n)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.source_by_id(id).await
  }

  async fn delete_source(&self, id: SourceId) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let referenced = {
          let mut stmt = tx.prepare(
            "SELECT division_id, department_id, title_id, company_id
             FROM contacts WHERE source_id = ?1",
          )?;
          let rows = stmt
            .query_map(params![id], |row| dimension_ids(row, 0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows
        };

        // Contacts go with the source through ON DELETE CASCADE.
        let n = tx.execute("DELETE FROM sources WHERE id = ?1", params![id])?;
        if n > 0 {
          collect_garbage(&tx, &released_by(referenced))?;
        }
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;

    Ok(deleted)
  }

  // ── Manual contacts ───────────────────────────────────────────────────────

  async fn add_manual_contact(&self, input: NewManualContact) -> Result<ContactView> {
    input.validate()?;
    let now = encode_dt(Utc::now());

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let dims = resolve_names(&tx, &DimensionNames::from_manual(&input))?;
        let ids = dims.ids_for_manual(&input);

        tx.execute(
          "INSERT INTO contacts (
             display_name, email, phone,
             division_id, department_id, title_id, company_id, last_updated
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          params![
            input.display_name.trim(),
            input.email.trim(),
            input.phone.trim(),
            ids.division,
            ids.department,
            ids.title,
            ids.company,
            now,
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
      })
      .await?;

    self
      .contact_by_id(id, false)
      .await?
      .ok_or_else(|| Error::InvalidRow(format!("contact {id} vanished after insert")))
  }

  async fn update_manual_contact(
    &self,
    id: ContactId,
    input: NewManualContact,
  ) -> Result<Option<ContactView>> {
    input.validate()?;
    let now = encode_dt(Utc::now());

    let found = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let old = tx
          .query_row(
            "SELECT division_id, department_id, title_id, company_id
             FROM contacts WHERE id = ?1 AND source_id IS NULL",
            params![id],
            |row| dimension_ids(row, 0),
          )
          .optional()?;
        let Some(old) = old else { return Ok(false) };

        let dims = resolve_names(&tx, &DimensionNames::from_manual(&input))?;
        let ids = dims.ids_for_manual(&input);

        tx.execute(
          "UPDATE contacts
           SET display_name = ?2, email = ?3, phone = ?4,
               division_id = ?5, department_id = ?6, title_id = ?7, company_id = ?8,
               last_updated = ?9
           WHERE id = ?1",
          params![
            id,
            input.display_name.trim(),
            input.email.trim(),
            input.phone.trim(),
            ids.division,
            ids.department,
            ids.title,
            ids.company,
            now,
          ],
        )?;

        let released: BTreeSet<_> = old
          .iter()
          .filter(|&(kind, old_id)| ids.get(kind) != Some(old_id))
          .collect();
        collect_garbage(&tx, &released)?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !found {
      return Ok(None);
    }
    self.contact_by_id(id, false).await
  }

  async fn delete_manual_contact(&self, id: ContactId) -> Result<bool> {
    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let old = tx
          .query_row(
            "SELECT division_id, department_id, title_id, company_id
             FROM contacts WHERE id = ?1 AND source_id IS NULL",
            params![id],
            |row| dimension_ids(row, 0),
          )
          .optional()?;
        let Some(old) = old else { return Ok(false) };

        tx.execute("DELETE FROM contacts WHERE id = ?1", params![id])?;
        collect_garbage(&tx, &released_by([old]))?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(deleted)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_contact(&self, id: ContactId) -> Result<Option<ContactView>> {
    self.contact_by_id(id, true).await
  }

  async fn list_visible_contacts(&self) -> Result<Vec<ContactView>> {
    self
      .contacts_where(format!("WHERE {VISIBLE} {MERGE_ORDER}"), None)
      .await
  }

  async fn list_directory_contacts(&self, source_id: SourceId) -> Result<Vec<ContactView>> {
    self
      .contacts_where("WHERE c.source_id = ?1 ORDER BY c.id".to_owned(), Some(source_id))
      .await
  }

  // ── Dimensions ────────────────────────────────────────────────────────────

  async fn resolve_dimensions(&self, names: DimensionNames) -> Result<ResolvedDimensions> {
    let resolved = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let resolved = resolve_names(&tx, &names)?;
        tx.commit()?;
        Ok(resolved)
      })
      .await?;
    Ok(resolved)
  }

  async fn list_dimensions(&self, kind: DimensionKind) -> Result<Vec<Dimension>> {
    let sql = format!(
      "SELECT id, name, weight FROM {} ORDER BY weight DESC, name_key, id",
      dimension_table(kind)
    );

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| dimension_from_row(kind, row))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn adjust_weight(
    &self,
    kind: DimensionKind,
    id: DimensionId,
    delta: i32,
  ) -> Result<Option<Dimension>> {
    let table = dimension_table(kind);

    let row = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let current: Option<i32> = tx
          .query_row(
            &format!("SELECT weight FROM {table} WHERE id = ?1"),
            params![id],
            |row| row.get(0),
          )
          .optional()?;
        let Some(current) = current else { return Ok(None) };

        tx.execute(
          &format!("UPDATE {table} SET weight = ?2 WHERE id = ?1"),
          params![id, dimension::adjust_weight(current, delta)],
        )?;
        let row = tx.query_row(
          &format!("SELECT id, name, weight FROM {table} WHERE id = ?1"),
          params![id],
          |row| dimension_from_row(kind, row),
        )?;
        tx.commit()?;
        Ok(Some(row))
      })
      .await?;
    Ok(row)
  }

  // ── Reconciliation ────────────────────────────────────────────────────────

  async fn reconcile_source(
    &self,
    source_id: SourceId,
    entries: Vec<DirectoryEntry>,
    synced_at: DateTime<Utc>,
  ) -> Result<SyncOutcome, ReconcileError<Error>> {
    let result = self
      .conn
      .call(move |conn| Ok(sync::reconcile_source(conn, source_id, &entries, synced_at)))
      .await;

    match result {
      Ok(Ok(outcome)) => Ok(outcome),
      Ok(Err((phase, e))) => Err(ReconcileError::new(phase, e)),
      // The connection itself is gone; nothing ran.
      Err(e) => Err(ReconcileError::new(SyncPhase::ResolvingDimensions, Error::Database(e))),
    }
  }
}
