//! Category filter used when picking a random quote.

use std::fmt;

use crate::model::quote::Quote;

/// Sentinel value meaning "no filter".
pub const ALL: &str = "all";

/// Active display filter: either every quote or a single category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    /// Match every quote.
    #[default]
    All,
    /// Match quotes whose category equals the given value.
    Only(String),
}

impl CategoryFilter {
    /// Whether `quote` passes the filter.
    pub fn matches(&self, quote: &Quote) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => quote.category == *category,
        }
    }
}

impl From<&str> for CategoryFilter {
    fn from(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == ALL {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(value.to_string())
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(ALL),
            CategoryFilter::Only(category) => f.write_str(category),
        }
    }
}
