//! Core types and algorithms for the phone directory.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the domain model, the [`store::DirectoryStore`] abstraction, the pure half
//! of directory reconciliation (entry screening, dimension-name collection,
//! diff planning) and the ordering engine used by every read path.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod contact;
pub mod dimension;
pub mod entry;
pub mod error;
pub mod ordering;
pub mod query;
pub mod reconcile;
pub mod source;
pub mod store;

pub use error::{Error, Result};
