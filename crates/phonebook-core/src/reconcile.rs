//! The pure half of directory reconciliation.
//!
//! A store applies a sync in one transaction, but everything that decides
//! *what* to apply lives here so it can be reasoned about without a
//! database:
//!
//! 1. [`DimensionNames`] gathers the union of dimension names across a batch,
//!    deduplicated by case-insensitive key, so each name is resolved once.
//! 2. [`ResolvedDimensions`] maps those keys to persisted lookup ids.
//! 3. [`plan_sync`] diffs the screened entries against the persisted
//!    directory contacts of one source, keyed by distinguished name only.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  contact::{ContactId, NewManualContact},
  dimension::{DimensionId, DimensionKind, name_key},
  entry::DirectoryEntry,
};

// ─── Dimension names ─────────────────────────────────────────────────────────

/// Candidate dimension names for one batch, keyed by kind then by
/// case-insensitive name key. The first spelling seen is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionNames {
  by_kind: BTreeMap<DimensionKind, BTreeMap<String, String>>,
}

impl DimensionNames {
  pub fn insert(&mut self, kind: DimensionKind, name: &str) {
    let Some(key) = name_key(name) else { return };
    self
      .by_kind
      .entry(kind)
      .or_default()
      .entry(key)
      .or_insert_with(|| name.trim().to_owned());
  }

  /// Union of names across every entry of a fetch.
  pub fn from_entries(entries: &[DirectoryEntry]) -> Self {
    let mut names = Self::default();
    for entry in entries {
      for kind in DimensionKind::all() {
        if let Some(name) = entry.dimension_name(kind) {
          names.insert(kind, name);
        }
      }
    }
    names
  }

  pub fn from_manual(contact: &NewManualContact) -> Self {
    let mut names = Self::default();
    for kind in DimensionKind::all() {
      if let Some(name) = contact.dimension_name(kind) {
        names.insert(kind, name);
      }
    }
    names
  }

  /// `key → spelling` for one kind; empty when the batch has none.
  pub fn of_kind(&self, kind: DimensionKind) -> impl Iterator<Item = (&str, &str)> {
    self
      .by_kind
      .get(&kind)
      .into_iter()
      .flatten()
      .map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize { self.by_kind.values().map(BTreeMap::len).sum() }
}

/// Name keys resolved to persisted lookup ids for one batch.
#[derive(Debug, Clone, Default)]
pub struct ResolvedDimensions {
  ids:     HashMap<(DimensionKind, String), DimensionId>,
  created: usize,
}

impl ResolvedDimensions {
  /// Record a row that already existed.
  pub fn found(&mut self, kind: DimensionKind, key: String, id: DimensionId) {
    self.ids.insert((kind, key), id);
  }

  /// Record a row created by this batch.
  pub fn created(&mut self, kind: DimensionKind, key: String, id: DimensionId) {
    if self.ids.insert((kind, key), id).is_none() {
      self.created += 1;
    }
  }

  pub fn contains(&self, kind: DimensionKind, key: &str) -> bool {
    self.ids.contains_key(&(kind, key.to_owned()))
  }

  /// Look up the id for a free-text name; blank or unknown names yield `None`.
  pub fn id_for(&self, kind: DimensionKind, name: Option<&str>) -> Option<DimensionId> {
    let key = name_key(name?)?;
    self.ids.get(&(kind, key)).copied()
  }

  /// Number of lookup rows this batch had to create.
  pub fn created_count(&self) -> usize { self.created }

  pub fn ids_for_entry(&self, entry: &DirectoryEntry) -> DimensionIds {
    DimensionIds::from_fn(|kind| self.id_for(kind, entry.dimension_name(kind)))
  }

  pub fn ids_for_manual(&self, contact: &NewManualContact) -> DimensionIds {
    DimensionIds::from_fn(|kind| self.id_for(kind, contact.dimension_name(kind)))
  }
}

// ─── Contact fields ──────────────────────────────────────────────────────────

/// The four optional dimension references of a contact row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DimensionIds {
  pub division:   Option<DimensionId>,
  pub department: Option<DimensionId>,
  pub title:      Option<DimensionId>,
  pub company:    Option<DimensionId>,
}

impl DimensionIds {
  pub fn from_fn(mut f: impl FnMut(DimensionKind) -> Option<DimensionId>) -> Self {
    Self {
      division:   f(DimensionKind::Division),
      department: f(DimensionKind::Department),
      title:      f(DimensionKind::Title),
      company:    f(DimensionKind::Company),
    }
  }

  pub fn get(&self, kind: DimensionKind) -> Option<DimensionId> {
    match kind {
      DimensionKind::Division => self.division,
      DimensionKind::Department => self.department,
      DimensionKind::Title => self.title,
      DimensionKind::Company => self.company,
    }
  }

  /// Every `(kind, id)` pair that is set.
  pub fn iter(&self) -> impl Iterator<Item = (DimensionKind, DimensionId)> + '_ {
    DimensionKind::all().filter_map(|kind| self.get(kind).map(|id| (kind, id)))
  }
}

/// The writable columns of a contact row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFields {
  pub display_name: String,
  pub email:        String,
  pub phone:        String,
  pub dimensions:   DimensionIds,
}

/// A directory contact as currently persisted for one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedDirectoryContact {
  pub id:                 ContactId,
  pub distinguished_name: String,
  pub fields:             ContactFields,
}

// ─── Planning ────────────────────────────────────────────────────────────────

/// Everything a store must do to bring one source in line with a fetch.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
  /// New DNs, in fetch order.
  pub inserts:   Vec<(String, ContactFields)>,
  /// Matched DNs whose stored content differs from the fetch.
  pub updates:   Vec<(ContactId, ContactFields)>,
  /// Matched DNs whose stored content already equals the fetch.
  pub unchanged: Vec<ContactId>,
  /// Persisted DNs absent from the fetch.
  pub deletes:   Vec<ContactId>,
  /// Lookup rows that lost a reference through a delete or an update; they
  /// are garbage-collected if nothing references them after the apply.
  pub released:  BTreeSet<(DimensionKind, DimensionId)>,
}

impl SyncPlan {
  pub fn is_noop(&self) -> bool {
    self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
  }
}

/// Diff screened `entries` against the `persisted` directory contacts of the
/// same source.
///
/// Matching is by DN identity only; attribute changes never affect which row
/// an entry lands on. Every entry ends up in exactly one of `inserts`,
/// `updates` or `unchanged`.
pub fn plan_sync(
  entries: &[DirectoryEntry],
  dims: &ResolvedDimensions,
  persisted: Vec<PersistedDirectoryContact>,
) -> SyncPlan {
  let mut by_dn: HashMap<String, PersistedDirectoryContact> = persisted
    .into_iter()
    .map(|p| (p.distinguished_name.clone(), p))
    .collect();

  let mut plan = SyncPlan::default();

  for entry in entries {
    let fields = ContactFields {
      display_name: entry.display_name.clone(),
      email:        entry.email.clone(),
      phone:        entry.phone.clone(),
      dimensions:   dims.ids_for_entry(entry),
    };

    match by_dn.remove(&entry.distinguished_name) {
      Some(existing) if existing.fields == fields => plan.unchanged.push(existing.id),
      Some(existing) => {
        for (kind, old) in existing.fields.dimensions.iter() {
          if fields.dimensions.get(kind) != Some(old) {
            plan.released.insert((kind, old));
          }
        }
        plan.updates.push((existing.id, fields));
      }
      None => plan.inserts.push((entry.distinguished_name.clone(), fields)),
    }
  }

  // Whatever is left was not in the fetch.
  let mut gone: Vec<PersistedDirectoryContact> = by_dn.into_values().collect();
  gone.sort_by_key(|p| p.id);
  for p in gone {
    plan.released.extend(p.fields.dimensions.iter());
    plan.deletes.push(p.id);
  }

  plan
}

// ─── Outcome and failure ─────────────────────────────────────────────────────

/// The stages of one source's sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncPhase {
  Fetching,
  ResolvingDimensions,
  Diffing,
  Applying,
  Completed,
}

/// What a store applied for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
  pub inserted:           usize,
  pub updated:            usize,
  pub unchanged:          usize,
  pub deleted:            usize,
  pub dimensions_created: usize,
  pub dimensions_removed: usize,
  pub synced_at:          DateTime<Utc>,
}

/// A store failure tagged with the phase it happened in. The store has rolled
/// back by the time this is returned.
#[derive(Debug, Error)]
#[error("{phase} failed: {source}")]
pub struct ReconcileError<E: std::error::Error + 'static> {
  pub phase:  SyncPhase,
  #[source]
  pub source: E,
}

impl<E: std::error::Error + 'static> ReconcileError<E> {
  pub fn new(phase: SyncPhase, source: E) -> Self { Self { phase, source } }
}
