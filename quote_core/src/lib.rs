//!
//! Core of the dynamic quote generator: a persisted quote collection and its
//! reconciliation with a remote endpoint.
//!
//! This crate aggregates:
//! - `error` — unified error type `QuoteError` used across the workspace.
//! - `result` — handy `Result<T, QuoteError>` alias.
//! - `model` — the `Quote` record, its id and the category filter.
//! - `storage` — key-value storage collaborators (memory and file backed).
//! - `ids` — injectable id generators.
//! - `store` — `QuoteStore`, owner of the collection and the selected category.
//! - `sync` — remote source access and the single-flight `Reconciler`.
//! - `scheduler` — recurring tasks with cancel handles.
//! - `config` — sync endpoint and timing settings.
#![warn(missing_docs)]
pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod result;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod sync;

pub use error::QuoteError;
pub use model::category::CategoryFilter;
pub use model::quote::{Quote, QuoteId};
pub use result::Result;
pub use store::{ImportReport, MergeReport, QuoteStore, SharedStore, StoreEvent};
pub use sync::reconciler::{Reconciler, SyncOutcome, SyncState};
