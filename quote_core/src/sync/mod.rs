//! Reconciliation with a remote quote endpoint.
//!
//! - `remote` — the `RemoteSource` seam, its HTTP implementation and record mapping.
//! - `reconciler` — the single-flight fetch/merge/persist pass.
pub mod reconciler;
pub mod remote;
