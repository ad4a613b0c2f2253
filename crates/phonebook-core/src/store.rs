//! The `DirectoryStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `phonebook-store-sqlite`). The reconciler, the query façade and the HTTP
//! layer depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  contact::{ContactId, ContactView, NewManualContact},
  dimension::{Dimension, DimensionId, DimensionKind},
  entry::DirectoryEntry,
  reconcile::{DimensionNames, ReconcileError, ResolvedDimensions, SyncOutcome},
  source::{DirectorySource, NewSource, SourceId},
};

/// Abstraction over a phone-directory store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait DirectoryStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Sources ───────────────────────────────────────────────────────────

  fn add_source(
    &self,
    input: NewSource,
  ) -> impl Future<Output = Result<DirectorySource, Self::Error>> + Send + '_;

  /// Returns `None` if no source has this id.
  fn get_source(
    &self,
    id: SourceId,
  ) -> impl Future<Output = Result<Option<DirectorySource>, Self::Error>> + Send + '_;

  /// List sources ordered by id, optionally only the active ones.
  fn list_sources(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<DirectorySource>, Self::Error>> + Send + '_;

  /// Replace a source's descriptor. An empty `bind_password` keeps the stored
  /// one. Returns `None` if the source does not exist.
  fn update_source(
    &self,
    id: SourceId,
    input: NewSource,
  ) -> impl Future<Output = Result<Option<DirectorySource>, Self::Error>> + Send + '_;

  /// Delete a source together with its directory contacts. Returns `false`
  /// if the source did not exist.
  fn delete_source(
    &self,
    id: SourceId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Manual contacts ───────────────────────────────────────────────────

  /// Persist a manual contact, resolving its free-text dimension names.
  fn add_manual_contact(
    &self,
    input: NewManualContact,
  ) -> impl Future<Output = Result<ContactView, Self::Error>> + Send + '_;

  /// Returns `None` if `id` is unknown or is not a manual contact.
  fn update_manual_contact(
    &self,
    id: ContactId,
    input: NewManualContact,
  ) -> impl Future<Output = Result<Option<ContactView>, Self::Error>> + Send + '_;

  /// Delete a manual contact and garbage-collect lookup rows it was the last
  /// reference to. Returns `false` if `id` is unknown or not manual.
  fn delete_manual_contact(
    &self,
    id: ContactId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// A visible contact by id. Contacts of inactive sources are hidden and
  /// yield `None`, like unknown ids.
  fn get_contact(
    &self,
    id: ContactId,
  ) -> impl Future<Output = Result<Option<ContactView>, Self::Error>> + Send + '_;

  /// Every contact eligible for listing (manual contacts plus directory
  /// contacts of active sources) in merge order: manual first, then
  /// storage order.
  fn list_visible_contacts(
    &self,
  ) -> impl Future<Output = Result<Vec<ContactView>, Self::Error>> + Send + '_;

  /// Every directory contact owned by `source_id`, visible or not.
  fn list_directory_contacts(
    &self,
    source_id: SourceId,
  ) -> impl Future<Output = Result<Vec<ContactView>, Self::Error>> + Send + '_;

  // ── Dimensions ────────────────────────────────────────────────────────

  /// Resolve a batch of names to lookup ids, creating rows for unknown
  /// names. Duplicate names within the batch resolve to one row.
  fn resolve_dimensions(
    &self,
    names: DimensionNames,
  ) -> impl Future<Output = Result<ResolvedDimensions, Self::Error>> + Send + '_;

  /// All rows of one kind, heaviest first, then by name.
  fn list_dimensions(
    &self,
    kind: DimensionKind,
  ) -> impl Future<Output = Result<Vec<Dimension>, Self::Error>> + Send + '_;

  /// Nudge a row's weight by `delta`, clamped to the allowed range.
  /// Returns `None` if the row does not exist.
  fn adjust_weight(
    &self,
    kind: DimensionKind,
    id: DimensionId,
    delta: i32,
  ) -> impl Future<Output = Result<Option<Dimension>, Self::Error>> + Send + '_;

  // ── Reconciliation ────────────────────────────────────────────────────

  /// Bring the directory contacts of `source_id` in line with `entries` and
  /// stamp the source's last-sync time, all in one transaction.
  ///
  /// `entries` must already be screened: DNs present and unique. Manual
  /// contacts and other sources' contacts are never touched. On error
  /// nothing is persisted and the failing phase is reported.
  fn reconcile_source(
    &self,
    source_id: SourceId,
    entries: Vec<DirectoryEntry>,
    synced_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<SyncOutcome, ReconcileError<Self::Error>>> + Send + '_;
}
