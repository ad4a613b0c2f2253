//! Contact query façade: filtering, ordering and pagination.
//!
//! Every read goes through [`ContactQuery`]: load the visible contacts, keep
//! the ones matching a [`ContactFilter`], sort with
//! [`crate::ordering::sort_contacts`], then cut one page. Pagination always
//! happens after the full order is computed. Listed items carry their
//! [`Group`] so a client can draw section breaks across page boundaries.

use serde::{Deserialize, Serialize};

use crate::{
  contact::{ContactId, ContactView},
  dimension::DimensionKind,
  ordering::{Group, group_of, sort_contacts},
  store::DirectoryStore,
};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

// ─── Paging ──────────────────────────────────────────────────────────────────

/// A normalised page request: `page >= 1`, `page_size >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
  pub page:      usize,
  pub page_size: usize,
}

impl PageRequest {
  pub fn new(page: usize, page_size: usize) -> Self {
    Self::bounded(Some(page), Some(page_size), DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
  }

  /// Build a request from optional user input. Missing values fall back to
  /// page 1 and `default_size`; out-of-range values are clamped.
  pub fn bounded(
    page: Option<usize>,
    page_size: Option<usize>,
    default_size: usize,
    max_size: usize,
  ) -> Self {
    let max_size = max_size.max(1);
    Self {
      page:      page.unwrap_or(1).max(1),
      page_size: page_size.unwrap_or(default_size).clamp(1, max_size),
    }
  }

  pub fn skip(&self) -> usize { (self.page - 1).saturating_mul(self.page_size) }
}

impl Default for PageRequest {
  fn default() -> Self { Self::new(1, DEFAULT_PAGE_SIZE) }
}

/// One page of an ordered result set plus the totals needed to render page
/// navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult<T> {
  pub items:       Vec<T>,
  pub page:        usize,
  pub page_size:   usize,
  pub total_count: usize,
  pub total_pages: usize,
}

impl<T> PageResult<T> {
  /// Cut `request`'s page out of an already ordered list.
  pub fn from_ordered(all: Vec<T>, request: PageRequest) -> Self {
    let total_count = all.len();
    let items = all
      .into_iter()
      .skip(request.skip())
      .take(request.page_size)
      .collect();
    Self {
      items,
      page: request.page,
      page_size: request.page_size,
      total_count,
      total_pages: total_pages(total_count, request.page_size),
    }
  }
}

pub fn total_pages(total_count: usize, page_size: usize) -> usize {
  total_count.div_ceil(page_size.max(1))
}

/// A contact as it appears in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedContact {
  #[serde(flatten)]
  pub contact: ContactView,
  pub group:   Group,
}

impl From<ContactView> for ListedContact {
  fn from(contact: ContactView) -> Self {
    Self { group: group_of(&contact), contact }
  }
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// Which contacts a listing is drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactFilter {
  All,
  /// Case-insensitive substring match over the text fields.
  Search(String),
  /// Case-insensitive equality on one dimension's name.
  Dimension(DimensionKind, String),
}

impl ContactFilter {
  /// A blank query means "no filter", not "no results".
  pub fn search(query: &str) -> Self {
    let q = query.trim();
    if q.is_empty() { Self::All } else { Self::Search(q.to_lowercase()) }
  }

  pub fn dimension(kind: DimensionKind, name: &str) -> Self {
    Self::Dimension(kind, name.trim().to_lowercase())
  }

  pub fn matches(&self, contact: &ContactView) -> bool {
    match self {
      Self::All => true,
      Self::Search(needle) => {
        let hit = |s: &str| s.to_lowercase().contains(needle.as_str());
        hit(&contact.display_name)
          || hit(&contact.email)
          || hit(&contact.phone)
          || DimensionKind::all()
            .filter_map(|k| contact.dimension_name(k))
            .any(hit)
      }
      Self::Dimension(kind, name) => contact
        .dimension_name(*kind)
        .is_some_and(|n| n.to_lowercase() == *name),
    }
  }
}

/// Filter then order; the shared core of every listing.
pub fn select(contacts: Vec<ContactView>, filter: &ContactFilter) -> Vec<ContactView> {
  let mut selected: Vec<ContactView> =
    contacts.into_iter().filter(|c| filter.matches(c)).collect();
  sort_contacts(&mut selected);
  selected
}

// ─── Façade ──────────────────────────────────────────────────────────────────

/// Read operations over a [`DirectoryStore`].
pub struct ContactQuery<'s, S> {
  store: &'s S,
}

impl<'s, S: DirectoryStore> ContactQuery<'s, S> {
  pub fn new(store: &'s S) -> Self { Self { store } }

  /// Ordered page of contacts matching `filter`.
  pub async fn page(
    &self,
    filter: &ContactFilter,
    request: PageRequest,
  ) -> Result<PageResult<ListedContact>, S::Error> {
    let all = self.store.list_visible_contacts().await?;
    let listed = select(all, filter).into_iter().map(ListedContact::from).collect();
    Ok(PageResult::from_ordered(listed, request))
  }

  /// Number of contacts matching `filter`.
  pub async fn count(&self, filter: &ContactFilter) -> Result<usize, S::Error> {
    let all = self.store.list_visible_contacts().await?;
    Ok(all.iter().filter(|c| filter.matches(c)).count())
  }

  pub async fn all(&self, request: PageRequest) -> Result<PageResult<ListedContact>, S::Error> {
    self.page(&ContactFilter::All, request).await
  }

  pub async fn count_all(&self) -> Result<usize, S::Error> {
    self.count(&ContactFilter::All).await
  }

  pub async fn by_id(&self, id: ContactId) -> Result<Option<ContactView>, S::Error> {
    self.store.get_contact(id).await
  }

  pub async fn search(
    &self,
    query: &str,
    request: PageRequest,
  ) -> Result<PageResult<ListedContact>, S::Error> {
    self.page(&ContactFilter::search(query), request).await
  }

  pub async fn count_search(&self, query: &str) -> Result<usize, S::Error> {
    self.count(&ContactFilter::search(query)).await
  }

  pub async fn by_dimension(
    &self,
    kind: DimensionKind,
    name: &str,
    request: PageRequest,
  ) -> Result<PageResult<ListedContact>, S::Error> {
    self.page(&ContactFilter::dimension(kind, name), request).await
  }

  pub async fn count_by_dimension(
    &self,
    kind: DimensionKind,
    name: &str,
  ) -> Result<usize, S::Error> {
    self.count(&ContactFilter::dimension(kind, name)).await
  }

  pub async fn by_division(
    &self,
    name: &str,
    request: PageRequest,
  ) -> Result<PageResult<ListedContact>, S::Error> {
    self.by_dimension(DimensionKind::Division, name, request).await
  }

  pub async fn by_department(
    &self,
    name: &str,
    request: PageRequest,
  ) -> Result<PageResult<ListedContact>, S::Error> {
    self.by_dimension(DimensionKind::Department, name, request).await
  }

  pub async fn by_title(
    &self,
    name: &str,
    request: PageRequest,
  ) -> Result<PageResult<ListedContact>, S::Error> {
    self.by_dimension(DimensionKind::Title, name, request).await
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::{contact::ContactOrigin, dimension::DimensionRef};

  fn contact(id: i64, display: &str, division: Option<&str>) -> ContactView {
    ContactView {
      id,
      display_name: display.into(),
      email: format!("user{id}@example.com"),
      phone: format!("+7 999 000-00-{id:02}"),
      division: division.map(|n| DimensionRef { id: 1, name: n.into(), weight: 0 }),
      department: None,
      title: None,
      company: Some(DimensionRef { id: 1, name: "Example Corp".into(), weight: 0 }),
      origin: ContactOrigin::Manual,
      last_updated: Utc::now(),
    }
  }

  #[test]
  fn page_request_is_normalised() {
    assert_eq!(PageRequest::new(0, 0), PageRequest { page: 1, page_size: 1 });
    assert_eq!(PageRequest::new(3, 10_000).page_size, MAX_PAGE_SIZE);
    assert_eq!(PageRequest::bounded(None, None, 25, 100).page_size, 25);
    assert_eq!(PageRequest::new(3, 20).skip(), 40);
  }

  #[test]
  fn total_pages_rounds_up() {
    assert_eq!(total_pages(0, 50), 0);
    assert_eq!(total_pages(50, 50), 1);
    assert_eq!(total_pages(51, 50), 2);
  }

  #[test]
  fn page_past_the_end_is_empty_but_keeps_totals() {
    let r = PageResult::from_ordered(vec![1, 2, 3], PageRequest::new(5, 2));
    assert!(r.items.is_empty());
    assert_eq!(r.total_count, 3);
    assert_eq!(r.total_pages, 2);
  }

  #[test]
  fn concatenated_pages_reproduce_the_full_order() {
    let contacts: Vec<ContactView> = (0..103)
      .map(|i| contact(i, &format!("Person {}", (i * 37) % 101), [None, Some("Eng"), Some("Ops")][i as usize % 3]))
      .collect();
    let full: Vec<i64> = select(contacts.clone(), &ContactFilter::All)
      .iter()
      .map(|c| c.id)
      .collect();

    for size in [1, 7, 50] {
      let mut stitched = Vec::new();
      let mut page = 1;
      loop {
        let r = PageResult::from_ordered(
          select(contacts.clone(), &ContactFilter::All),
          PageRequest::new(page, size),
        );
        if r.items.is_empty() {
          break;
        }
        stitched.extend(r.items.iter().map(|c| c.id));
        page += 1;
      }
      assert_eq!(stitched, full, "page size {size}");
    }
  }

  #[test]
  fn blank_search_is_no_filter() {
    assert_eq!(ContactFilter::search("   "), ContactFilter::All);
  }

  #[test]
  fn search_covers_every_text_field() {
    let c = contact(7, "Ivan Ivanov", Some("Разработка"));
    assert!(ContactFilter::search("ivan").matches(&c));
    assert!(ContactFilter::search("USER7@").matches(&c));
    assert!(ContactFilter::search("000-00-07").matches(&c));
    assert!(ContactFilter::search("разраб").matches(&c));
    assert!(ContactFilter::search("example corp").matches(&c));
    assert!(!ContactFilter::search("petrov").matches(&c));
  }

  #[test]
  fn dimension_filter_is_case_insensitive_equality() {
    let c = contact(1, "A", Some("Engineering"));
    assert!(ContactFilter::dimension(DimensionKind::Division, "engineering").matches(&c));
    assert!(!ContactFilter::dimension(DimensionKind::Division, "Eng").matches(&c));
    assert!(!ContactFilter::dimension(DimensionKind::Department, "engineering").matches(&c));
  }

  #[test]
  fn listed_contacts_carry_their_group() {
    let mut with_dept = contact(2, "Dee", None);
    with_dept.department = Some(DimensionRef { id: 4, name: "Finance".into(), weight: 0 });
    let listed: Vec<ListedContact> = select(
      vec![contact(1, "Ann", None), with_dept, contact(3, "Bob", Some("Eng"))],
      &ContactFilter::All,
    )
    .into_iter()
    .map(ListedContact::from)
    .collect();

    let groups: Vec<Group> = listed.iter().map(|l| l.group).collect();
    assert_eq!(groups, [Group::Division, Group::Department, Group::Ungrouped]);

    let v = serde_json::to_value(&listed[1]).unwrap();
    assert_eq!(v["group"], "department");
    assert_eq!(v["display_name"], "Dee");
  }

  #[test]
  fn filtered_listing_keeps_group_order() {
    let v = select(
      vec![
        contact(1, "Ann", None),
        contact(2, "Bob", Some("Eng")),
        contact(3, "Ann Eng", Some("Eng")),
      ],
      &ContactFilter::search("ann"),
    );
    assert_eq!(v.iter().map(|c| c.id).collect::<Vec<_>>(), vec![3, 1]);
  }
}
