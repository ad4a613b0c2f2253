use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use phonebook_core::{
  entry::RawEntry,
  source::{DirectorySource, SourceId},
};
use phonebook_store_sqlite::SqliteStore;
use phonebook_sync::{FetchError, Reconciler, SyncOptions};
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// Serves whatever entries the test put in for a source id.
#[derive(Default)]
struct MapFetcher {
  entries: Mutex<HashMap<SourceId, Vec<RawEntry>>>,
}

impl MapFetcher {
  fn set(&self, source_id: SourceId, entries: Vec<RawEntry>) {
    self.entries.lock().unwrap().insert(source_id, entries);
  }
}

impl DirectoryFetcher for MapFetcher {
  async fn fetch<'a>(&'a self, source: &'a DirectorySource) -> Result<Vec<RawEntry>, FetchError> {
    self
      .entries
      .lock()
      .unwrap()
      .get(&source.id)
      .cloned()
      .ok_or_else(|| FetchError::Unreachable(format!("{} refused the bind", source.server)))
  }
}

struct Harness {
  state:   ApiState<SqliteStore, MapFetcher>,
  fetcher: Arc<MapFetcher>,
}

async fn harness(paging: PagingConfig) -> Harness {
  let store   = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let fetcher = Arc::new(MapFetcher::default());
  let salt    = SaltString::generate(&mut OsRng);
  let hash    = Argon2::default()
    .hash_password(b"secret", &salt)
    .unwrap()
    .to_string();

  let reconciler = Reconciler::new(store.clone(), fetcher.clone(), SyncOptions::default());
  Harness {
    state: ApiState {
      store,
      reconciler: Arc::new(reconciler),
      auth: Arc::new(AuthConfig { username: "admin".into(), password_hash: hash }),
      paging,
    },
    fetcher,
  }
}

fn auth_header() -> String { format!("Basic {}", B64.encode("admin:secret")) }

async fn call(
  state: &ApiState<SqliteStore, MapFetcher>,
  method: &str,
  uri: &str,
  admin: bool,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if admin {
    builder = builder.header(header::AUTHORIZATION, auth_header());
  }
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp   = api_router(state.clone()).oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes  = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value  = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

fn names(page: &Value) -> Vec<String> {
  page["items"]
    .as_array()
    .unwrap()
    .iter()
    .map(|c| c["display_name"].as_str().unwrap().to_owned())
    .collect()
}

fn entry(dn: &str, name: &str, division: Option<&str>, department: Option<&str>) -> RawEntry {
  RawEntry {
    distinguished_name: Some(dn.into()),
    display_name:       Some(name.into()),
    email:              Some(format!("{}@example.com", name.to_lowercase())),
    division_name:      division.map(str::to_owned),
    department_name:    department.map(str::to_owned),
    ..RawEntry::default()
  }
}

async fn create_source(h: &Harness, name: &str) -> SourceId {
  let (status, body) = call(
    &h.state,
    "POST",
    "/admin/sources",
    true,
    Some(json!({ "name": name, "server": "ldap.example.com", "bind_password": "hunter2" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["id"].as_i64().unwrap()
}

// ── Auth ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_routes_require_auth() {
  let h = harness(PagingConfig::default()).await;
  let req = Request::builder()
    .method("GET")
    .uri("/admin/sources")
    .body(Body::empty())
    .unwrap();
  let resp = api_router(h.state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

  let (status, _) = call(&h.state, "POST", "/admin/sources/sync-all", false, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_ok_with_timestamp() {
  let h = harness(PagingConfig::default()).await;
  let (status, body) = call(&h.state, "GET", "/health", false, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
  let ts = body["timestamp"].as_str().unwrap();
  assert!(ts.parse::<chrono::DateTime<chrono::Utc>>().is_ok(), "{ts}");
}

#[tokio::test]
async fn public_reads_need_no_auth() {
  let h = harness(PagingConfig::default()).await;
  let (status, body) = call(&h.state, "GET", "/contacts", false, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["total_count"], 0);
  assert_eq!(body["total_pages"], 0);
}

// ── Sources ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn source_crud_hides_password() {
  let h  = harness(PagingConfig::default()).await;
  let id = create_source(&h, "HQ").await;

  let (status, body) = call(&h.state, "GET", &format!("/admin/sources/{id}"), true, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "HQ");
  assert_eq!(body["port"], 389);
  assert!(body.get("bind_password").is_none(), "password leaked: {body}");

  let (status, body) = call(
    &h.state,
    "PUT",
    &format!("/admin/sources/{id}"),
    true,
    Some(json!({ "name": "Headquarters", "server": "ldap2.example.com", "is_active": false })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "Headquarters");
  assert_eq!(body["is_active"], false);

  let (_, list) = call(&h.state, "GET", "/admin/sources?active_only=true", true, None).await;
  assert_eq!(list.as_array().unwrap().len(), 0);

  let (status, _) = call(&h.state, "DELETE", &format!("/admin/sources/{id}"), true, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&h.state, "GET", &format!("/admin/sources/{id}"), true, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_source_is_rejected() {
  let h = harness(PagingConfig::default()).await;
  let (status, body) = call(
    &h.state,
    "POST",
    "/admin/sources",
    true,
    Some(json!({ "name": "  ", "server": "ldap.example.com" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("name"));
}

// ── Sync ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sync_one_then_list_in_group_order() {
  let h  = harness(PagingConfig::default()).await;
  let id = create_source(&h, "HQ").await;
  h.fetcher.set(
    id,
    vec![
      entry("cn=loner", "Loner", None, None),
      entry("cn=dept", "Dept Only", None, Some("Finance")),
      entry("cn=div", "Div Member", Some("Engineering"), None),
    ],
  );

  let (status, report) = call(&h.state, "POST", &format!("/admin/sources/{id}/sync"), true, None).await;
  assert_eq!(status, StatusCode::OK, "{report}");
  assert_eq!(report["inserted"], 3);
  assert_eq!(report["fetched"], 3);

  let (_, page) = call(&h.state, "GET", "/contacts", false, None).await;
  assert_eq!(names(&page), ["Div Member", "Dept Only", "Loner"]);
  assert_eq!(page["items"][0]["origin"]["kind"], "directory");

  let groups: Vec<&str> = page["items"]
    .as_array()
    .unwrap()
    .iter()
    .map(|c| c["group"].as_str().unwrap())
    .collect();
  assert_eq!(groups, ["division", "department", "ungrouped"]);

  // A page boundary inside the listing still tells the client its section.
  let (_, second) = call(&h.state, "GET", "/contacts?page=2&page_size=1", false, None).await;
  assert_eq!(second["items"][0]["group"], "department");
}

#[tokio::test]
async fn sync_failure_reports_phase_without_details() {
  let h  = harness(PagingConfig::default()).await;
  let id = create_source(&h, "HQ").await;

  let (status, body) = call(&h.state, "POST", &format!("/admin/sources/{id}/sync"), true, None).await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
  assert_eq!(body["phase"], "fetching");
  assert!(!body["error"].as_str().unwrap().contains("refused"), "{body}");
}

#[tokio::test]
async fn sync_unknown_source_is_404() {
  let h = harness(PagingConfig::default()).await;
  let (status, _) = call(&h.state, "POST", "/admin/sources/99/sync", true, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sync_all_reports_each_source() {
  let h    = harness(PagingConfig::default()).await;
  let good = create_source(&h, "Good").await;
  let bad  = create_source(&h, "Bad").await;
  h.fetcher.set(good, vec![entry("cn=a", "Alice", None, None)]);

  let (status, batch) = call(&h.state, "POST", "/admin/sources/sync-all", true, None).await;
  assert_eq!(status, StatusCode::OK);
  let results = batch["results"].as_array().unwrap();
  assert_eq!(results.len(), 2);

  let by_id = |id: SourceId| results.iter().find(|r| r["source_id"] == id).unwrap();
  assert_eq!(by_id(good)["status"], "completed");
  assert_eq!(by_id(good)["report"]["inserted"], 1);
  assert_eq!(by_id(bad)["status"], "failed");
  assert_eq!(by_id(bad)["phase"], "fetching");
}

// ── Contacts ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn paging_metadata_and_bounds() {
  let h = harness(PagingConfig { default_page_size: 2, max_page_size: 3 }).await;
  for name in ["Ann", "Bob", "Cid", "Dee", "Eve"] {
    let (status, _) = call(
      &h.state,
      "POST",
      "/admin/contacts",
      true,
      Some(json!({ "display_name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  let (_, first) = call(&h.state, "GET", "/contacts", false, None).await;
  assert_eq!(first["page_size"], 2);
  assert_eq!(first["total_count"], 5);
  assert_eq!(first["total_pages"], 3);
  assert_eq!(names(&first), ["Ann", "Bob"]);

  let (_, capped) = call(&h.state, "GET", "/contacts?page=2&page_size=100", false, None).await;
  assert_eq!(capped["page_size"], 3);
  assert_eq!(names(&capped), ["Dee", "Eve"]);

  let (_, past_end) = call(&h.state, "GET", "/contacts?page=9", false, None).await;
  assert!(names(&past_end).is_empty());
  assert_eq!(past_end["total_count"], 5);
}

#[tokio::test]
async fn search_and_dimension_listings() {
  let h = harness(PagingConfig::default()).await;
  for (name, division) in [("Alice Smith", "Engineering"), ("Bob Jones", "Sales")] {
    call(
      &h.state,
      "POST",
      "/admin/contacts",
      true,
      Some(json!({ "display_name": name, "division": division, "title": "Engineer" })),
    )
    .await;
  }

  let (_, found) = call(&h.state, "GET", "/contacts/search?q=smith", false, None).await;
  assert_eq!(names(&found), ["Alice Smith"]);

  let (_, blank) = call(&h.state, "GET", "/contacts/search?q=%20", false, None).await;
  assert_eq!(blank["total_count"], 2);

  let (_, sales) = call(&h.state, "GET", "/contacts/division/sales", false, None).await;
  assert_eq!(names(&sales), ["Bob Jones"]);

  let (_, titled) = call(&h.state, "GET", "/contacts/title/Engineer", false, None).await;
  assert_eq!(titled["total_count"], 2);

  let (_, none) = call(&h.state, "GET", "/contacts/department/Nowhere", false, None).await;
  assert_eq!(none["total_count"], 0);
}

#[tokio::test]
async fn manual_contact_lifecycle() {
  let h = harness(PagingConfig::default()).await;
  let (status, created) = call(
    &h.state,
    "POST",
    "/admin/contacts",
    true,
    Some(json!({ "display_name": "Reception", "phone": "100" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let id = created["id"].as_i64().unwrap();
  assert_eq!(created["origin"]["kind"], "manual");

  let (status, updated) = call(
    &h.state,
    "PUT",
    &format!("/admin/contacts/{id}"),
    true,
    Some(json!({ "display_name": "Front Desk", "phone": "101" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["display_name"], "Front Desk");

  let (status, fetched) = call(&h.state, "GET", &format!("/contacts/{id}"), false, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched["phone"], "101");

  let (status, _) = call(&h.state, "DELETE", &format!("/admin/contacts/{id}"), true, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&h.state, "GET", &format!("/contacts/{id}"), false, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_display_name_is_rejected() {
  let h = harness(PagingConfig::default()).await;
  let (status, _) = call(
    &h.state,
    "POST",
    "/admin/contacts",
    true,
    Some(json!({ "display_name": "   " })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn directory_contacts_cannot_be_edited_by_hand() {
  let h  = harness(PagingConfig::default()).await;
  let id = create_source(&h, "HQ").await;
  h.fetcher.set(id, vec![entry("cn=a", "Alice", None, None)]);
  call(&h.state, "POST", &format!("/admin/sources/{id}/sync"), true, None).await;

  let (_, page) = call(&h.state, "GET", "/contacts", false, None).await;
  let contact_id = page["items"][0]["id"].as_i64().unwrap();

  let (status, _) = call(
    &h.state,
    "PUT",
    &format!("/admin/contacts/{contact_id}"),
    true,
    Some(json!({ "display_name": "Mallory" })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = call(&h.state, "DELETE", &format!("/admin/contacts/{contact_id}"), true, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn contacts_of_inactive_source_are_hidden() {
  let h  = harness(PagingConfig::default()).await;
  let id = create_source(&h, "HQ").await;
  h.fetcher.set(id, vec![entry("cn=a", "Alice", None, None)]);
  call(&h.state, "POST", &format!("/admin/sources/{id}/sync"), true, None).await;

  let (_, page) = call(&h.state, "GET", "/contacts", false, None).await;
  let contact_id = page["items"][0]["id"].as_i64().unwrap();

  call(
    &h.state,
    "PUT",
    &format!("/admin/sources/{id}"),
    true,
    Some(json!({ "name": "HQ", "server": "ldap.example.com", "is_active": false })),
  )
  .await;

  let (_, page) = call(&h.state, "GET", "/contacts", false, None).await;
  assert_eq!(page["total_count"], 0);
  let (status, _) = call(&h.state, "GET", &format!("/contacts/{contact_id}"), false, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Dimensions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn weight_adjustment_reorders_and_clamps() {
  let h = harness(PagingConfig::default()).await;
  for (name, division) in [("Alice", "Alpha"), ("Bob", "Beta")] {
    call(
      &h.state,
      "POST",
      "/admin/contacts",
      true,
      Some(json!({ "display_name": name, "division": division })),
    )
    .await;
  }

  let (_, divisions) = call(&h.state, "GET", "/dimensions/division", false, None).await;
  let beta = divisions
    .as_array()
    .unwrap()
    .iter()
    .find(|d| d["name"] == "Beta")
    .unwrap()["id"]
    .as_i64()
    .unwrap();

  let uri = format!("/admin/dimensions/division/{beta}/weight");
  let (status, row) = call(&h.state, "POST", &uri, true, Some(json!({ "delta": 250 }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(row["weight"], 100);

  let (_, page) = call(&h.state, "GET", "/contacts", false, None).await;
  assert_eq!(names(&page), ["Bob", "Alice"]);

  let (_, row) = call(&h.state, "POST", &uri, true, Some(json!({ "delta": -500 }))).await;
  assert_eq!(row["weight"], 0);
}

#[tokio::test]
async fn unknown_dimension_kind_is_400_and_unknown_id_is_404() {
  let h = harness(PagingConfig::default()).await;
  let (status, _) = call(&h.state, "GET", "/dimensions/floor", false, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call(
    &h.state,
    "POST",
    "/admin/dimensions/title/42/weight",
    true,
    Some(json!({ "delta": 1 })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
