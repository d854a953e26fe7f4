//! Terminal rendering of quotes and store notifications.
//!
//! Quotes go to stdout. Store events arrive through the store's change feed and are
//! logged by a notifier thread, which ends once every store handle is dropped.
use crossbeam_channel::Receiver;
use log::{info, warn};
use quote_core::{CategoryFilter, Quote, QuoteError, StoreEvent, SyncOutcome};
use std::thread::{self, JoinHandle};

/// Maximum length of the last-viewed preview.
const PREVIEW_LEN: usize = 60;

/// Print a quote and its category.
pub fn quote(quote: &Quote) {
    println!("\"{}\"", quote.text);
    println!("Category: {}", quote.category);
}

/// Explicit empty state for a filter without matches.
pub fn empty(filter: &CategoryFilter) {
    match filter {
        CategoryFilter::All => println!("No quotes available."),
        CategoryFilter::Only(category) => println!("No quotes found in category: {}", category),
    }
}

/// One-line preview of the last viewed quote.
pub fn last_viewed(last: Option<&Quote>) {
    match last {
        Some(q) => println!("Last viewed: \"{}\" ({})", truncate(&q.text, PREVIEW_LEN), q.category),
        None => println!("No last-viewed quote in this session."),
    }
}

/// Categories with the active one marked.
pub fn categories(categories: &[String], selected: &CategoryFilter) {
    let marker = |active: bool| if active { "*" } else { " " };
    println!("{} all", marker(*selected == CategoryFilter::All));
    for category in categories {
        let active = matches!(selected, CategoryFilter::Only(c) if c == category);
        println!("{} {}", marker(active), category);
    }
}

/// Report the result of a sync pass; failures are notifications, not fatal.
pub fn sync_result(result: &Result<SyncOutcome, QuoteError>) {
    match result {
        Ok(SyncOutcome::Merged(report)) if report.is_clean() => {
            info!("Quotes synced with server. No conflicts ({} new).", report.added)
        }
        Ok(SyncOutcome::Merged(report)) => info!(
            "Quotes synced with server. {} conflicts resolved using server data ({} new).",
            report.conflicts, report.added
        ),
        Ok(SyncOutcome::Skipped) => info!("A sync is already running; skipped."),
        Err(e) => notify_error(e),
    }
}

/// Surface an error the way its kind demands.
pub fn notify_error(err: &QuoteError) {
    if err.is_user_visible() {
        warn!("{}", err);
    } else {
        println!("{}", err);
    }
}

/// Log every store event until the feed closes.
pub fn spawn_notifier(events: Receiver<StoreEvent>) -> JoinHandle<()> {
    thread::spawn(move || {
        for event in events.iter() {
            match event {
                StoreEvent::Added(q) => info!("Quote added and saved ({}).", q.category),
                StoreEvent::Imported(report) => info!(
                    "Imported {} quotes successfully ({} skipped).",
                    report.accepted, report.rejected
                ),
                StoreEvent::Synced(report) => info!(
                    "Saved sync result: {} new, {} overwritten.",
                    report.added, report.conflicts
                ),
                StoreEvent::Reset => info!("Saved quotes cleared. Quotes reset to defaults."),
                StoreEvent::CategorySelected(filter) => info!("Filter saved: {}", filter),
            }
        }
    })
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max - 1).collect();
        format!("{}…", kept)
    } else {
        text.to_string()
    }
}
