//! Data model types shared by the store, the reconciler and the CLI.
//!
//! - `quote` — the `Quote` record, its optional `QuoteId` merge key and the default set.
//! - `category` — the `CategoryFilter` used to narrow random picks.
pub mod category;
pub mod quote;
