//! Quote store: the in-memory collection, its persisted mirror and the active filter.
//!
//! `QuoteStore` owns the ordered collection of quotes and the selected category. Every
//! mutation is prepared on a working copy, written to storage, and only then committed
//! to memory, so the in-memory collection never drifts from what was persisted:
//!
//! - `QuoteStore::load` — read the persisted collection, falling back to the default set.
//! - `QuoteStore::add` / `QuoteStore::import_batch` — grow the collection.
//! - `QuoteStore::merge_remote` — apply a reconciliation pass (server wins on text).
//! - `QuoteStore::reset_to_defaults` — explicit clear.
//!
//! Successful mutations are broadcast as `StoreEvent`s to every receiver obtained from
//! `QuoteStore::subscribe`; receivers that hang up are dropped on the next broadcast.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info, warn};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde_json::Value;

use crate::error::QuoteError;
use crate::ids::IdGenerator;
use crate::model::category::{ALL, CategoryFilter};
use crate::model::quote::{Quote, QuoteId, default_quotes, parse_collection};
use crate::result::Result;
use crate::storage::{CATEGORY_KEY, COLLECTION_KEY, KeyValueStore, LAST_VIEWED_KEY};

/// Store shared between the UI adapter and the reconciler.
pub type SharedStore = Arc<Mutex<QuoteStore>>;

/// Change notification emitted after a successful mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A single quote was added.
    Added(Quote),
    /// A batch import finished.
    Imported(ImportReport),
    /// A reconciliation pass was merged.
    Synced(MergeReport),
    /// The collection was reset to the default set.
    Reset,
    /// The persisted category filter changed.
    CategorySelected(CategoryFilter),
}

/// Outcome of `QuoteStore::import_batch`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Records appended to the collection.
    pub accepted: usize,
    /// Records dropped for lacking string `text`/`category`.
    pub rejected: usize,
    /// First accepted quote, as stored.
    pub first: Option<Quote>,
}

/// Outcome of a merged reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Remote records with no local counterpart.
    pub added: usize,
    /// Local records overwritten because the server text differed.
    pub conflicts: usize,
}

impl MergeReport {
    /// `true` when no local record had to be overwritten.
    pub fn is_clean(&self) -> bool {
        self.conflicts == 0
    }
}

/// Owner of the quote collection and the selected category.
pub struct QuoteStore {
    quotes: Vec<Quote>,
    selected: CategoryFilter,
    storage: Box<dyn KeyValueStore>,
    session: Option<Box<dyn KeyValueStore>>,
    ids: Box<dyn IdGenerator>,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl QuoteStore {
    /// Load the persisted collection from `storage`.
    ///
    /// Absent or corrupt data is replaced by the default set, which is persisted right
    /// away. When storage cannot be read at all, the defaults are used in memory only so
    /// the unreadable collection is not overwritten. This never fails: a write failure
    /// at this point is only logged, the defaults are still usable in memory.
    pub fn load(storage: Box<dyn KeyValueStore>, ids: Box<dyn IdGenerator>) -> Self {
        let mut store = QuoteStore {
            quotes: Vec::new(),
            selected: CategoryFilter::All,
            storage,
            session: None,
            ids,
            subscribers: Vec::new(),
        };

        let loaded = match store.storage.get(COLLECTION_KEY) {
            Ok(Some(raw)) => parse_collection(&raw).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        match loaded {
            Ok(Some(quotes)) => {
                debug!("Loaded {} quotes from storage", quotes.len());
                store.quotes = quotes;
            }
            Ok(None) => {
                info!("No stored quotes, using the default set");
                store.install_defaults();
            }
            Err(e @ QuoteError::Format(_)) => {
                warn!("Could not load stored quotes, falling back to defaults: {}", e);
                store.install_defaults();
            }
            Err(e) => {
                warn!("Could not read stored quotes, using defaults without saving: {}", e);
                store.quotes = default_quotes();
            }
        }

        store.selected = store.restore_selection();
        store
    }

    /// Attach a session namespace used to remember the last displayed quote.
    pub fn with_session(mut self, session: Box<dyn KeyValueStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Wrap the store for sharing with a reconciler.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    /// Register a change listener.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Current collection in insertion order.
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    /// Number of quotes in the collection.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Look up a quote by id.
    pub fn get(&self, id: &QuoteId) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.id.as_ref() == Some(id))
    }

    /// Validate, assign a fresh id, append and persist a new quote.
    pub fn add(&mut self, text: &str, category: &str) -> Result<Quote> {
        let quote = Quote::new(text, category)?;
        let taken = self.taken_ids();
        let quote = quote.with_id(self.fresh_id(&taken));

        let mut working = self.quotes.clone();
        working.push(quote.clone());
        self.commit(working)?;

        info!("Added quote {:?} in category {}", quote.id, quote.category);
        self.emit(StoreEvent::Added(quote.clone()));
        Ok(quote)
    }

    /// Append every usable record of `records`.
    ///
    /// Records need string `text` and `category` fields that are non-empty once trimmed.
    /// Accepted records keep their id unless it is missing or already taken, in which
    /// case a fresh one is assigned. Fails with `QuoteError::Format` only if `records`
    /// is not an array.
    pub fn import_batch(&mut self, records: &Value) -> Result<ImportReport> {
        let records = records.as_array().ok_or_else(|| {
            QuoteError::Format("imported data must be an array of quote objects".into())
        })?;

        let mut taken = self.taken_ids();
        let mut accepted = Vec::new();
        let mut rejected = 0;
        for record in records {
            let Some(mut quote) = Quote::from_record(record) else {
                rejected += 1;
                continue;
            };
            let id = match quote.id.take() {
                Some(id) if !taken.contains(&id) => id,
                _ => self.fresh_id(&taken),
            };
            taken.insert(id.clone());
            accepted.push(quote.with_id(id));
        }

        let report = ImportReport {
            accepted: accepted.len(),
            rejected,
            first: accepted.first().cloned(),
        };
        if accepted.is_empty() {
            warn!("Import contained no valid quotes ({} rejected)", rejected);
            return Ok(report);
        }

        let mut working = self.quotes.clone();
        working.extend(accepted);
        self.commit(working)?;

        info!("Imported {} quotes, rejected {}", report.accepted, report.rejected);
        self.emit(StoreEvent::Imported(report.clone()));
        Ok(report)
    }

    /// Parse a file blob and import it. An unparseable blob changes nothing.
    pub fn import_json(&mut self, blob: &str) -> Result<ImportReport> {
        let records: Value = serde_json::from_str(blob)
            .map_err(|e| QuoteError::Format(format!("import file is not valid JSON: {}", e)))?;
        self.import_batch(&records)
    }

    /// The whole collection as pretty-printed JSON.
    pub fn export_all(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.quotes)?)
    }

    /// Distinct categories, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.quotes
            .iter()
            .map(|q| q.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Pick a random quote matching `filter` using the thread-local RNG.
    pub fn pick_random(&self, filter: &CategoryFilter) -> Result<Quote> {
        self.pick_random_with(filter, &mut rand::rng())
    }

    /// Pick a random quote matching `filter` using `rng`.
    ///
    /// Fails with `QuoteError::EmptySelection` if nothing matches.
    pub fn pick_random_with<R: Rng + ?Sized>(
        &self,
        filter: &CategoryFilter,
        rng: &mut R,
    ) -> Result<Quote> {
        let candidates: Vec<&Quote> = self.quotes.iter().filter(|q| filter.matches(q)).collect();
        candidates
            .choose(rng)
            .map(|q| (*q).clone())
            .ok_or_else(|| QuoteError::EmptySelection(filter.to_string()))
    }

    /// The persisted category filter.
    pub fn selected_category(&self) -> &CategoryFilter {
        &self.selected
    }

    /// Change and persist the category filter.
    ///
    /// `name` must be the "all" sentinel or an existing category.
    pub fn select_category(&mut self, name: &str) -> Result<CategoryFilter> {
        let filter = CategoryFilter::from(name);
        if let CategoryFilter::Only(category) = &filter {
            if !self.quotes.iter().any(|q| q.category == *category) {
                return Err(QuoteError::Validation(format!("unknown category: {}", category)));
            }
        }
        self.storage.set(CATEGORY_KEY, &filter.to_string())?;
        self.selected = filter.clone();
        self.emit(StoreEvent::CategorySelected(filter.clone()));
        Ok(filter)
    }

    /// Replace the collection with the default set. On a failed write nothing changes.
    pub fn reset_to_defaults(&mut self) -> Result<()> {
        self.commit(default_quotes())?;

        if !self.selection_is_known(&self.selected) {
            self.storage.set(CATEGORY_KEY, ALL)?;
            self.selected = CategoryFilter::All;
        }
        info!("Collection reset to {} default quotes", self.quotes.len());
        self.emit(StoreEvent::Reset);
        Ok(())
    }

    /// Merge already-mapped remote quotes, server winning on text mismatch.
    ///
    /// Remote quotes with an unknown id are appended; a local quote with the same id but
    /// different text takes the remote text and category. Remote quotes sharing an id
    /// count once, with the last one winning. The result is persisted once.
    pub fn merge_remote(&mut self, remote: Vec<Quote>) -> Result<MergeReport> {
        let mut working = self.quotes.clone();
        let mut positions: HashMap<QuoteId, usize> = working
            .iter()
            .enumerate()
            .filter_map(|(i, q)| q.id.clone().map(|id| (id, i)))
            .collect();

        let mut report = MergeReport::default();
        for incoming in dedup_by_id(remote) {
            let position = incoming.id.as_ref().and_then(|id| positions.get(id)).copied();
            match position {
                None => {
                    if let Some(id) = &incoming.id {
                        positions.insert(id.clone(), working.len());
                    }
                    working.push(incoming);
                    report.added += 1;
                }
                Some(i) if working[i].text != incoming.text => {
                    debug!("Server wins for quote {:?}", incoming.id);
                    working[i].text = incoming.text;
                    working[i].category = incoming.category;
                    report.conflicts += 1;
                }
                Some(_) => {}
            }
        }

        self.commit(working)?;
        self.emit(StoreEvent::Synced(report));
        Ok(report)
    }

    /// Remember `quote` as the last displayed one for this session. Best effort.
    pub fn remember_last_viewed(&mut self, quote: &Quote) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let result = serde_json::to_string(quote)
            .map_err(QuoteError::from)
            .and_then(|raw| session.set(LAST_VIEWED_KEY, &raw));
        if let Err(e) = result {
            warn!("Failed to save session info: {}", e);
        }
    }

    /// The last displayed quote of this session, if any.
    pub fn last_viewed(&self) -> Option<Quote> {
        let raw = self.session.as_ref()?.get(LAST_VIEWED_KEY).ok()??;
        serde_json::from_str(&raw).ok()
    }

    fn install_defaults(&mut self) {
        let defaults = default_quotes();
        if let Err(e) = self.persist(&defaults) {
            warn!("Failed to persist default quotes: {}", e);
        }
        self.quotes = defaults;
    }

    fn restore_selection(&self) -> CategoryFilter {
        let stored = match self.storage.get(CATEGORY_KEY) {
            Ok(Some(raw)) => CategoryFilter::from(raw.as_str()),
            Ok(None) => return CategoryFilter::All,
            Err(e) => {
                warn!("Could not read the selected category: {}", e);
                return CategoryFilter::All;
            }
        };
        if self.selection_is_known(&stored) {
            stored
        } else {
            info!("Stored category '{}' no longer exists, showing all", stored);
            CategoryFilter::All
        }
    }

    fn selection_is_known(&self, filter: &CategoryFilter) -> bool {
        match filter {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => self.quotes.iter().any(|q| q.category == *category),
        }
    }

    fn taken_ids(&self) -> HashSet<QuoteId> {
        self.quotes.iter().filter_map(|q| q.id.clone()).collect()
    }

    fn fresh_id(&mut self, taken: &HashSet<QuoteId>) -> QuoteId {
        loop {
            let id = self.ids.next_id();
            if !taken.contains(&id) {
                return id;
            }
            debug!("Generated id {} is taken, drawing again", id);
        }
    }

    fn persist(&mut self, quotes: &[Quote]) -> Result<()> {
        let raw = serde_json::to_string(quotes)?;
        self.storage.set(COLLECTION_KEY, &raw)
    }

    /// Persist `working` and, only on success, make it the live collection.
    fn commit(&mut self, working: Vec<Quote>) -> Result<()> {
        self.persist(&working)?;
        self.quotes = working;
        Ok(())
    }

    fn emit(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Collapse records sharing an id into one, keeping the first position and the last
/// values, so a batch never conflicts with itself.
fn dedup_by_id(remote: Vec<Quote>) -> Vec<Quote> {
    let mut positions: HashMap<QuoteId, usize> = HashMap::new();
    let mut unique: Vec<Quote> = Vec::with_capacity(remote.len());
    for quote in remote {
        let seen = quote.id.as_ref().and_then(|id| positions.get(id)).copied();
        match seen {
            Some(i) => unique[i] = quote,
            None => {
                if let Some(id) = &quote.id {
                    positions.insert(id.clone(), unique.len());
                }
                unique.push(quote);
            }
        }
    }
    unique
}

/// File name used when exporting at `now`, e.g. `quotes-2024-05-01T10-00-00-000Z.json`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("quotes-{}.json", stamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::storage::MemoryStorage;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fresh_store() -> (QuoteStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        let store = QuoteStore::load(Box::new(storage.clone()), Box::new(SequentialIds::starting_at(1000)));
        (store, storage)
    }

    #[test]
    fn export_file_name_has_no_colons_or_dots_in_stamp() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(export_file_name(now), "quotes-2024-05-01T10-00-00-000Z.json");
    }

    #[test]
    fn dedup_keeps_first_position_and_last_values() {
        let quote = |id: u64, text: &str| Quote::new(text, "Server").unwrap().with_id(QuoteId::Int(id));
        let unique = dedup_by_id(vec![quote(7, "A"), quote(8, "C"), quote(7, "B")]);
        assert_eq!(unique, vec![quote(7, "B"), quote(8, "C")]);
    }

    #[test]
    fn pick_random_is_deterministic_with_seed() {
        let (store, _) = fresh_store();
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        let filter = CategoryFilter::All;
        assert_eq!(
            store.pick_random_with(&filter, &mut a).unwrap(),
            store.pick_random_with(&filter, &mut b).unwrap()
        );
    }

    #[test]
    fn filtered_pick_stays_in_category() {
        let (store, _) = fresh_store();
        let filter = CategoryFilter::from("Motivation");
        for _ in 0..20 {
            assert_eq!(store.pick_random(&filter).unwrap().category, "Motivation");
        }
    }

    #[test]
    fn select_unknown_category_is_rejected() {
        let (mut store, storage) = fresh_store();
        assert!(matches!(store.select_category("Nope"), Err(QuoteError::Validation(_))));
        assert_eq!(storage.peek(CATEGORY_KEY), None);

        store.select_category("Life").unwrap();
        assert_eq!(storage.peek(CATEGORY_KEY).as_deref(), Some("Life"));
        assert_eq!(store.selected_category(), &CategoryFilter::Only("Life".into()));
    }

    #[test]
    fn subscribers_see_mutations_and_dropped_ones_are_pruned() {
        let (mut store, _) = fresh_store();
        let rx = store.subscribe();
        let dropped = store.subscribe();
        drop(dropped);

        let added = store.add("Keep going", "Motivation").unwrap();
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::Added(added));
        assert_eq!(store.subscribers.len(), 1);
    }

    #[test]
    fn last_viewed_requires_session() {
        let (mut store, _) = fresh_store();
        let quote = store.quotes()[0].clone();
        store.remember_last_viewed(&quote);
        assert_eq!(store.last_viewed(), None);

        let mut store = store.with_session(Box::new(MemoryStorage::new()));
        assert_eq!(store.last_viewed(), None);
        store.remember_last_viewed(&quote);
        assert_eq!(store.last_viewed(), Some(quote));
    }
}
