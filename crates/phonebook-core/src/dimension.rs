//! Lookup dimensions: Division, Department, Title and Company.
//!
//! Each dimension row is a `{id, name, weight}` triple. Names are unique per
//! kind under case-insensitive comparison; the weight is an administrator
//! tunable priority that only affects display order.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{Error, Result};

pub type DimensionId = i64;

/// Lowest weight a dimension row may carry.
pub const MIN_WEIGHT: i32 = 0;
/// Highest weight a dimension row may carry.
pub const MAX_WEIGHT: i32 = 100;

/// The four lookup tables a contact can reference.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DimensionKind {
  Division,
  Department,
  Title,
  Company,
}

impl DimensionKind {
  /// Parse a kind from a URL segment or config value (`"division"`, …).
  pub fn parse(s: &str) -> Result<Self> {
    s.trim()
      .parse()
      .map_err(|_| Error::UnknownDimensionKind(s.to_owned()))
  }

  /// All kinds in resolution order.
  pub fn all() -> impl Iterator<Item = Self> { Self::iter() }
}

/// A persisted lookup row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
  pub id:     DimensionId,
  pub kind:   DimensionKind,
  pub name:   String,
  pub weight: i32,
}

/// The slice of a dimension row carried on a contact read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRef {
  pub id:     DimensionId,
  pub name:   String,
  pub weight: i32,
}

/// Apply an administrator nudge to a weight, clamped to
/// [`MIN_WEIGHT`]..=[`MAX_WEIGHT`].
pub fn adjust_weight(current: i32, delta: i32) -> i32 {
  current.saturating_add(delta).clamp(MIN_WEIGHT, MAX_WEIGHT)
}

/// Trim a free-text dimension name; blank names mean "no reference".
pub fn clean_name(name: Option<&str>) -> Option<&str> {
  name.map(str::trim).filter(|n| !n.is_empty())
}

/// The case-insensitive identity of a dimension name.
///
/// Two names with the same key resolve to the same lookup row.
pub fn name_key(name: &str) -> Option<String> {
  clean_name(Some(name)).map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn adjust_weight_clamps_both_ends() {
    assert_eq!(adjust_weight(50, 10), 60);
    assert_eq!(adjust_weight(95, 10), 100);
    assert_eq!(adjust_weight(5, -10), 0);
    assert_eq!(adjust_weight(0, i32::MAX), 100);
    assert_eq!(adjust_weight(100, i32::MIN), 0);
  }

  #[test]
  fn blank_names_have_no_key() {
    assert_eq!(name_key("   "), None);
    assert_eq!(name_key(""), None);
    assert_eq!(clean_name(None), None);
  }

  #[test]
  fn name_key_is_trimmed_and_case_folded() {
    assert_eq!(name_key("  Engineering ").as_deref(), Some("engineering"));
    assert_eq!(name_key("ОТДЕЛ").as_deref(), Some("отдел"));
  }

  #[test]
  fn kind_parses_case_insensitively() {
    assert_eq!(DimensionKind::parse("Division").unwrap(), DimensionKind::Division);
    assert_eq!(DimensionKind::parse("title").unwrap(), DimensionKind::Title);
    assert!(matches!(
      DimensionKind::parse("floor"),
      Err(Error::UnknownDimensionKind(_))
    ));
  }

  #[test]
  fn kind_displays_lowercase() {
    assert_eq!(DimensionKind::Company.to_string(), "company");
    assert_eq!(DimensionKind::all().count(), 4);
  }
}
