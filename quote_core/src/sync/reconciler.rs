//! Single-flight reconciliation between the shared store and a remote source.
//!
//! A pass walks `Idle -> Fetching -> Merging -> Idle`, or `Idle -> Fetching -> Idle`
//! when the fetch or the mapping fails. Only one pass may be in flight: a pass that
//! starts while another is outstanding is skipped and reported as `SyncOutcome::Skipped`.
//! The store lock is held only while merging, never across the fetch, so user
//! mutations keep working during a slow request and are visible to the merge.

use std::sync::{Arc, Mutex};

use log::{info, warn};
use strum_macros::Display;

use crate::error::QuoteError;
use crate::result::Result;
use crate::store::{MergeReport, SharedStore};
use crate::sync::remote::{RemoteSource, map_remote_records};

/// Phase of the reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SyncState {
    /// No pass in flight.
    Idle,
    /// Waiting on the remote fetch.
    Fetching,
    /// Applying remote records to the store.
    Merging,
}

/// Result of `Reconciler::sync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote collection was merged.
    Merged(MergeReport),
    /// Another pass was already in flight; nothing was done.
    Skipped,
}

/// Marks a pass as in flight and returns the reconciler to `Idle` when dropped.
struct InFlight<'a> {
    state: &'a Mutex<SyncState>,
}

impl<'a> InFlight<'a> {
    fn acquire(state: &'a Mutex<SyncState>) -> Result<Option<Self>> {
        let mut current = state.lock()?;
        if *current != SyncState::Idle {
            return Ok(None);
        }
        *current = SyncState::Fetching;
        Ok(Some(Self { state }))
    }

    fn advance(&self, next: SyncState) -> Result<()> {
        *self.state.lock()? = next;
        Ok(())
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Ok(mut current) = self.state.lock() {
            *current = SyncState::Idle;
        }
    }
}

/// Pulls remote quotes and merges them into the shared store.
#[derive(Clone)]
pub struct Reconciler {
    store: SharedStore,
    remote: Arc<dyn RemoteSource>,
    state: Arc<Mutex<SyncState>>,
}

impl Reconciler {
    /// Create a reconciler over `store` and `remote`.
    pub fn new(store: SharedStore, remote: Arc<dyn RemoteSource>) -> Self {
        Self {
            store,
            remote,
            state: Arc::new(Mutex::new(SyncState::Idle)),
        }
    }

    /// Current phase.
    pub fn state(&self) -> Result<SyncState> {
        Ok(*self.state.lock()?)
    }

    /// Run one fetch/merge/persist pass.
    ///
    /// Fetch and mapping failures leave the store untouched and come back as
    /// `QuoteError::Sync`; there is no immediate retry. A storage failure while
    /// persisting the merge comes back as `QuoteError::Persistence`.
    pub fn sync(&self) -> Result<SyncOutcome> {
        let Some(guard) = InFlight::acquire(&self.state)? else {
            info!("Sync already in flight, skipping this pass");
            return Ok(SyncOutcome::Skipped);
        };

        let remote = match self.remote.fetch().and_then(|records| map_remote_records(&records)) {
            Ok(remote) => remote,
            Err(e) => {
                let e = as_sync_error(e);
                warn!("{}", e);
                return Err(e);
            }
        };

        guard.advance(SyncState::Merging)?;
        let report = self.store.lock()?.merge_remote(remote)?;
        if report.is_clean() {
            info!("Synced with server, no conflicts ({} new)", report.added);
        } else {
            info!(
                "Synced with server, {} conflicts resolved in favour of the server ({} new)",
                report.conflicts, report.added
            );
        }
        Ok(SyncOutcome::Merged(report))
    }

    /// Push the local collection to the remote side. Best effort: a failure is logged
    /// and reported as `false`. Local quotes are kept either way.
    pub fn push_local(&self) -> bool {
        let snapshot = match self.store.lock() {
            Ok(store) => store.quotes().to_vec(),
            Err(e) => {
                warn!("Cannot read quotes for push: {}", e);
                return false;
            }
        };
        match self.remote.push(&snapshot) {
            Ok(()) => {
                info!("Pushed {} quotes to server", snapshot.len());
                true
            }
            Err(e) => {
                warn!("Push to server failed: {}", e);
                false
            }
        }
    }
}

fn as_sync_error(err: QuoteError) -> QuoteError {
    match err {
        QuoteError::Sync(_) => err,
        other => QuoteError::Sync(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_returns_to_idle_on_drop() {
        let state = Mutex::new(SyncState::Idle);
        {
            let guard = InFlight::acquire(&state).unwrap().unwrap();
            assert!(InFlight::acquire(&state).unwrap().is_none());
            guard.advance(SyncState::Merging).unwrap();
            assert_eq!(*state.lock().unwrap(), SyncState::Merging);
        }
        assert_eq!(*state.lock().unwrap(), SyncState::Idle);
    }

    #[test]
    fn state_displays_as_name() {
        assert_eq!(SyncState::Fetching.to_string(), "Fetching");
    }
}
