//! Grouping and total order for directory listings.
//!
//! Every read path (full listing, per-dimension filter, free-text search)
//! sorts its candidate set with [`sort_contacts`]; only the candidates
//! differ. The order is:
//!
//! | tier | key | direction |
//! |------|-----|-----------|
//! | 1 | [`Group`] | ascending |
//! | 2 | division weight | descending |
//! | 3 | division name | ascending, case-insensitive |
//! | 4 | department weight | descending |
//! | 5 | department name | ascending, case-insensitive |
//! | 6 | title weight | descending |
//! | 7 | title name | ascending, case-insensitive |
//! | 8 | display name | ascending, case-insensitive |
//!
//! The sort is stable, so contacts equal on all eight tiers keep their input
//! order (manual contacts first, then storage order).

use std::cmp::{Ordering, Reverse};

use serde::{Deserialize, Serialize};

use crate::{contact::ContactView, dimension::DimensionKind};

/// Section a contact is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Group {
  /// Has a non-empty division.
  Division = 0,
  /// No division, but a non-empty department.
  Department = 1,
  /// Neither.
  Ungrouped = 2,
}

pub fn group_of(contact: &ContactView) -> Group {
  if contact.dimension_name(DimensionKind::Division).is_some() {
    Group::Division
  } else if contact.dimension_name(DimensionKind::Department).is_some() {
    Group::Department
  } else {
    Group::Ungrouped
  }
}

type SortKey = (
  Group,
  Reverse<i32>,
  String,
  Reverse<i32>,
  String,
  Reverse<i32>,
  String,
  String,
);

fn tier(contact: &ContactView, kind: DimensionKind) -> (Reverse<i32>, String) {
  match contact.dimension(kind) {
    Some(d) if contact.dimension_name(kind).is_some() => {
      (Reverse(d.weight), d.name.to_lowercase())
    }
    _ => (Reverse(0), String::new()),
  }
}

fn sort_key(contact: &ContactView) -> SortKey {
  let (div_w, div_n) = tier(contact, DimensionKind::Division);
  let (dep_w, dep_n) = tier(contact, DimensionKind::Department);
  let (tit_w, tit_n) = tier(contact, DimensionKind::Title);
  (
    group_of(contact),
    div_w,
    div_n,
    dep_w,
    dep_n,
    tit_w,
    tit_n,
    contact.display_name.to_lowercase(),
  )
}

/// Compare two contacts on all eight tiers. `Equal` means the sort falls
/// back to input order.
pub fn compare(a: &ContactView, b: &ContactView) -> Ordering {
  sort_key(a).cmp(&sort_key(b))
}

/// Sort contacts into display order, in place.
pub fn sort_contacts(contacts: &mut [ContactView]) {
  // Stable; keys are lowercased once per element.
  contacts.sort_by_cached_key(sort_key);
}
