//! JSON REST API for the phone directory.
//!
//! Exposes an axum [`Router`] backed by any
//! [`phonebook_core::store::DirectoryStore`]. Read routes are public; every
//! route under `/admin` requires HTTP Basic auth. TLS and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", phonebook_api::api_router(state))
//! ```

pub mod auth;
pub mod contacts;
pub mod dimensions;
pub mod error;
pub mod health;
pub mod sources;
pub mod sync;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use phonebook_core::{
  query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PageRequest},
  store::DirectoryStore,
};
use phonebook_sync::{DirectoryFetcher, Reconciler};
use serde::Deserialize;

pub use auth::AuthConfig;
pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Page size bounds applied to every listing route.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
  pub default_page_size: usize,
  pub max_page_size:     usize,
}

impl Default for PagingConfig {
  fn default() -> Self {
    Self {
      default_page_size: DEFAULT_PAGE_SIZE,
      max_page_size:     MAX_PAGE_SIZE,
    }
  }
}

/// `?page=&page_size=` on listing routes.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub page:      Option<usize>,
  pub page_size: Option<usize>,
}

impl PagingConfig {
  pub fn request(&self, params: &PageParams) -> PageRequest {
    PageRequest::bounded(
      params.page,
      params.page_size,
      self.default_page_size,
      self.max_page_size,
    )
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct ApiState<S, F> {
  pub store:      Arc<S>,
  pub reconciler: Arc<Reconciler<S, F>>,
  pub auth:       Arc<AuthConfig>,
  pub paging:     PagingConfig,
}

impl<S, F> Clone for ApiState<S, F> {
  fn clone(&self) -> Self {
    Self {
      store:      self.store.clone(),
      reconciler: self.reconciler.clone(),
      auth:       self.auth.clone(),
      paging:     self.paging,
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, F>(state: ApiState<S, F>) -> Router<()>
where
  S: DirectoryStore + 'static,
  F: DirectoryFetcher + 'static,
{
  Router::new()
    // Public reads
    .route("/health", get(health::health))
    .route("/contacts", get(contacts::list::<S, F>))
    .route("/contacts/search", get(contacts::search::<S, F>))
    .route("/contacts/division/{name}", get(contacts::by_division::<S, F>))
    .route("/contacts/department/{name}", get(contacts::by_department::<S, F>))
    .route("/contacts/title/{name}", get(contacts::by_title::<S, F>))
    .route("/contacts/{id}", get(contacts::get_one::<S, F>))
    .route("/dimensions/{kind}", get(dimensions::list::<S, F>))
    // Admin: sources
    .route("/admin/sources", get(sources::list::<S, F>).post(sources::create::<S, F>))
    .route("/admin/sources/sync-all", post(sync::sync_all::<S, F>))
    .route(
      "/admin/sources/{id}",
      get(sources::get_one::<S, F>)
        .put(sources::update::<S, F>)
        .delete(sources::delete::<S, F>),
    )
    .route("/admin/sources/{id}/sync", post(sync::sync_one::<S, F>))
    // Admin: manual contacts
    .route("/admin/contacts", post(contacts::create::<S, F>))
    .route(
      "/admin/contacts/{id}",
      axum::routing::put(contacts::update::<S, F>).delete(contacts::delete::<S, F>),
    )
    // Admin: weights
    .route("/admin/dimensions/{kind}/{id}/weight", post(dimensions::adjust_weight::<S, F>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
