//! Command-line arguments for the quote CLI.
//!
//! This module defines the CLI interface using `clap`. Every subcommand maps to one
//! trigger of the quote page (show, add, filter, export, import, reset, sync, ...).
use clap::{Parser, Subcommand};
use quote_core::config::{DEFAULT_ENDPOINT, DEFAULT_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};
use quote_core::ids::IdScheme;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding the saved quotes, the selected category and session data.
    #[clap(long, env = "QUOTES_DATA_DIR", default_value = ".quotes")]
    pub data_dir: String,

    /// Remote endpoint used by `sync`, `push` and `watch`.
    #[clap(long, env = "QUOTES_SYNC_URL", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Maximum wait for one request to the endpoint, in seconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Period between sync passes in `watch` mode, in seconds.
    #[clap(long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval_secs: u64,

    /// How ids are generated for new quotes.
    #[clap(long, value_enum, default_value_t = IdScheme::Clock)]
    pub id_scheme: IdScheme,

    /// Action to perform.
    #[command(subcommand)]
    pub command: Command,
}

/// One subcommand per user action.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show a random quote from the saved filter, or from `--category`.
    Show {
        /// Category to pick from instead of the saved one ("all" for every quote).
        #[clap(long)]
        category: Option<String>,
    },
    /// Add a new quote.
    Add {
        /// Quote text.
        #[clap(long)]
        text: String,
        /// Quote category.
        #[clap(long)]
        category: String,
    },
    /// List the known categories; the saved filter is marked with `*`.
    Categories,
    /// Save a category filter ("all" to clear it) and show a quote from it.
    Filter {
        /// Category name or "all".
        category: String,
    },
    /// Write every quote to a JSON file.
    Export {
        /// Output path; defaults to a timestamped file in the current directory.
        #[clap(long)]
        out: Option<String>,
    },
    /// Append quotes from a JSON file.
    Import {
        /// Path to a JSON array of `{text, category}` objects.
        path: String,
    },
    /// Delete saved quotes and go back to the default set.
    Reset {
        /// Confirm the reset.
        #[clap(long)]
        yes: bool,
    },
    /// Run one sync pass against the endpoint.
    Sync,
    /// Send the local quotes to the endpoint.
    Push,
    /// Show the last quote displayed in this session.
    Last,
    /// Sync periodically until Ctrl+C.
    Watch,
}
