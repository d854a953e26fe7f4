//! Quote CLI — a terminal front end for the dynamic quote generator. It keeps quotes in
//! a data directory, shows random (optionally category-filtered) quotes, imports and
//! exports JSON files, and synchronises with a remote endpoint where the server wins
//! any text conflict.
//!
//! Usage example (CLI):
//! ```bash
//! quote_cli add --text "Stay hungry" --category Life
//! quote_cli filter Life
//! quote_cli --interval-secs 60 watch
//! ```
//!
//! All business logic lives in `quote_core`; this binary only maps subcommands to store
//! and reconciler operations and renders the results.
#![warn(missing_docs)]
mod args;
mod render;

use crate::args::{Args, Command};
use chrono::Utc;
use clap::Parser;
use crossbeam_channel::bounded;
use log::{info, warn};
use quote_core::config::SyncConfig;
use quote_core::scheduler::{Scheduler, ThreadScheduler};
use quote_core::storage::FileStorage;
use quote_core::store::export_file_name;
use quote_core::sync::remote::HttpRemote;
use quote_core::{CategoryFilter, QuoteError, QuoteStore, Reconciler, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Subdirectory of the data directory used for session-only data.
const SESSION_DIR: &str = "session";

fn main() -> Result<(), QuoteError> {
    init_logger();
    let args = Args::parse();
    let config = SyncConfig::new(&args.endpoint, args.timeout_secs, args.interval_secs);
    let data_dir = normalize_path(&args.data_dir);

    let mut store = QuoteStore::load(
        Box::new(FileStorage::new(&data_dir)),
        args.id_scheme.generator(),
    )
    .with_session(Box::new(FileStorage::new(data_dir.join(SESSION_DIR))));
    let notifier = render::spawn_notifier(store.subscribe());

    let result = run(args.command, store, &config);
    if notifier.join().is_err() {
        warn!("Notifier thread panicked");
    }

    match result {
        Err(QuoteError::EmptySelection(_)) => Ok(()),
        Err(e) => {
            render::notify_error(&e);
            Err(e)
        }
        Ok(()) => Ok(()),
    }
}

/// Execute one subcommand. Consumes the store so the notifier ends when this returns.
fn run(command: Command, mut store: QuoteStore, config: &SyncConfig) -> Result<()> {
    match command {
        Command::Show { category } => {
            let filter = match category {
                Some(name) => CategoryFilter::from(name.as_str()),
                None => store.selected_category().clone(),
            };
            show_random(&mut store, &filter)
        }
        Command::Add { text, category } => {
            let quote = store.add(&text, &category)?;
            render::quote(&quote);
            store.remember_last_viewed(&quote);
            Ok(())
        }
        Command::Categories => {
            render::categories(&store.categories(), store.selected_category());
            Ok(())
        }
        Command::Filter { category } => {
            let filter = store.select_category(&category)?;
            show_random(&mut store, &filter)
        }
        Command::Export { out } => {
            let path = out
                .map(|raw| normalize_path(&raw))
                .unwrap_or_else(|| PathBuf::from(export_file_name(Utc::now())));
            fs::write(&path, store.export_all()?)?;
            info!("Exported {} quotes to {}", store.len(), path.display());
            Ok(())
        }
        Command::Import { path } => {
            let path = normalize_path(&path);
            if !is_file_exist(&path) {
                return Err(QuoteError::Validation(format!(
                    "import file not found: {}",
                    path.display()
                )));
            }
            let report = store.import_json(&fs::read_to_string(&path)?)?;
            match &report.first {
                Some(first) => {
                    render::quote(first);
                    store.remember_last_viewed(first);
                }
                None => warn!(
                    "No valid quote objects found in the file. They must be objects with 'text' and 'category' strings."
                ),
            }
            Ok(())
        }
        Command::Reset { yes } => {
            if !yes {
                println!("This will delete all saved quotes and reset to defaults. Re-run with --yes to confirm.");
                return Ok(());
            }
            store.reset_to_defaults()?;
            let filter = store.selected_category().clone();
            show_random(&mut store, &filter)
        }
        Command::Sync => {
            let reconciler = reconciler_for(store, config)?;
            render::sync_result(&reconciler.sync());
            Ok(())
        }
        Command::Push => {
            let reconciler = reconciler_for(store, config)?;
            if !reconciler.push_local() {
                warn!("Quotes were not pushed; they remain saved locally.");
            }
            Ok(())
        }
        Command::Last => {
            render::last_viewed(store.last_viewed().as_ref());
            Ok(())
        }
        Command::Watch => watch(store, config),
    }
}

/// Pick and render a quote, treating an empty selection as a normal state.
fn show_random(store: &mut QuoteStore, filter: &CategoryFilter) -> Result<()> {
    match store.pick_random(filter) {
        Ok(quote) => {
            render::quote(&quote);
            store.remember_last_viewed(&quote);
            Ok(())
        }
        Err(QuoteError::EmptySelection(_)) => {
            render::empty(filter);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn reconciler_for(store: QuoteStore, config: &SyncConfig) -> Result<Reconciler> {
    let remote = HttpRemote::new(config)?;
    Ok(Reconciler::new(store.into_shared(), Arc::new(remote)))
}

/// Sync now, then every `config.interval` until Ctrl+C.
fn watch(store: QuoteStore, config: &SyncConfig) -> Result<()> {
    let reconciler = reconciler_for(store, config)?;
    let (stop_tx, stop_rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.try_send(());
    })
    .expect("Error setting Ctrl+C handler");

    render::sync_result(&reconciler.sync());

    let task_reconciler = reconciler.clone();
    let mut handle = ThreadScheduler.schedule_every(
        config.interval,
        Box::new(move || render::sync_result(&task_reconciler.sync())),
    );
    info!(
        "Syncing with {} every {:?}. Press Ctrl+C to exit.",
        config.endpoint, config.interval
    );

    let _ = stop_rx.recv();
    info!("Ctrl+C received. Stopping sync...");
    handle.cancel();
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

/// Returns `true` if the provided path exists and is a regular file.
fn is_file_exist(path: &Path) -> bool {
    path.exists() && path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote_core::ids::SequentialIds;
    use quote_core::storage::MemoryStorage;
    use std::net::TcpListener;

    #[test]
    fn normalize_path_strips_matching_quotes() {
        assert_eq!(normalize_path("  \"C:\\quotes\"  "), PathBuf::from("C:\\quotes"));
        assert_eq!(normalize_path("\"unbalanced"), PathBuf::from("\"unbalanced"));
    }

    #[test]
    fn args_parse_subcommands_and_defaults() {
        let args = Args::try_parse_from(["quote_cli", "add", "--text", "Hi", "--category", "Life"]).unwrap();
        assert_eq!(args.timeout_secs, quote_core::config::DEFAULT_TIMEOUT_SECS);
        assert!(matches!(args.command, Command::Add { ref text, .. } if text == "Hi"));

        let args = Args::try_parse_from(["quote_cli", "--id-scheme", "uuid", "watch"]).unwrap();
        assert_eq!(args.id_scheme, quote_core::ids::IdScheme::Uuid);
    }

    #[test]
    fn failed_sync_is_reported_once_not_returned() {
        let closed = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/posts", closed.local_addr().unwrap());
        drop(closed);

        let store = QuoteStore::load(
            Box::new(MemoryStorage::new()),
            Box::new(SequentialIds::starting_at(1)),
        );
        let config = SyncConfig::new(&endpoint, 1, 30);
        assert!(run(Command::Sync, store, &config).is_ok());
    }
}
