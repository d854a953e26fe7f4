//! Injectable id generators for newly created and imported quotes.
//!
//! The store asks its `IdGenerator` for a fresh id whenever a record needs one and
//! re-draws if the id is already taken, so generators only need to be "usually unique".

use chrono::Utc;
use clap::ValueEnum;
use strum_macros::{Display, EnumString};

use crate::model::quote::QuoteId;

/// Source of fresh quote identifiers.
pub trait IdGenerator: Send {
    /// Produce the next identifier.
    fn next_id(&mut self) -> QuoteId;
}

/// Millisecond clock ids, strictly increasing even when called within the same ms.
#[derive(Debug, Default)]
pub struct ClockIds {
    last: u64,
}

impl ClockIds {
    /// Create a generator seeded from the current clock on first use.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for ClockIds {
    fn next_id(&mut self) -> QuoteId {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        self.last = now.max(self.last + 1);
        QuoteId::Int(self.last)
    }
}

/// Plain counter, handy for reproducible ids in tests.
#[derive(Debug)]
pub struct SequentialIds {
    next: u64,
}

impl SequentialIds {
    /// Start counting at `first`.
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> QuoteId {
        let id = self.next;
        self.next += 1;
        QuoteId::Int(id)
    }
}

/// Random v4 UUID strings.
#[derive(Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> QuoteId {
        QuoteId::Str(uuid::Uuid::new_v4().to_string())
    }
}

/// Generator selection exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display, EnumString)]
#[clap(rename_all = "lower")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum IdScheme {
    /// Millisecond clock ids.
    #[default]
    Clock,
    /// Random UUID strings.
    Uuid,
}

impl IdScheme {
    /// Instantiate the selected generator.
    pub fn generator(self) -> Box<dyn IdGenerator> {
        match self {
            IdScheme::Clock => Box::new(ClockIds::new()),
            IdScheme::Uuid => Box::new(UuidIds),
        }
    }
}
