//! Quote record and validation helpers.
//!
//! A `Quote` is the unit of storage and display: a trimmed text, a trimmed category and
//! an optional identifier. When present, the identifier is unique within a collection
//! and is the merge key used during reconciliation; records without one are never
//! matched against remote data.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::QuoteError;
use crate::result::Result;

/// Identifier of a quote. Remote endpoints use integers, locally generated ids may be
/// either integers (clock based) or strings (UUID based).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuoteId {
    /// Numeric identifier.
    Int(u64),
    /// Textual identifier.
    Str(String),
}

impl QuoteId {
    /// Extract an id from a raw JSON value. Only non-negative integers and non-empty
    /// strings qualify.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(QuoteId::Int),
            Value::String(s) if !s.trim().is_empty() => Some(QuoteId::Str(s.trim().to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuoteId::Int(n) => write!(f, "{}", n),
            QuoteId::Str(s) => f.write_str(s),
        }
    }
}

/// A text/category pair, optionally keyed by a unique id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Merge key; absent for records that were never assigned one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QuoteId>,
    /// Quote text, trimmed and non-empty.
    pub text: String,
    /// Category, trimmed and non-empty.
    pub category: String,
}

impl Quote {
    /// Build an id-less quote, trimming both fields.
    ///
    /// Fails with `QuoteError::Validation` if either field is empty after trimming.
    pub fn new(text: &str, category: &str) -> Result<Self> {
        let text = text.trim();
        let category = category.trim();
        if text.is_empty() {
            return Err(QuoteError::Validation("quote text must not be empty".into()));
        }
        if category.is_empty() {
            return Err(QuoteError::Validation("quote category must not be empty".into()));
        }
        Ok(Quote {
            id: None,
            text: text.to_string(),
            category: category.to_string(),
        })
    }

    /// Attach an id to the quote.
    pub fn with_id(mut self, id: QuoteId) -> Self {
        self.id = Some(id);
        self
    }

    /// Build a quote from an arbitrary imported record.
    ///
    /// The record must be an object with string `text` and `category` fields that are
    /// non-empty after trimming. An `id` is carried over when it has a usable shape.
    pub fn from_record(record: &Value) -> Option<Self> {
        let obj = record.as_object()?;
        let text = obj.get("text")?.as_str()?;
        let category = obj.get("category")?.as_str()?;
        let quote = Quote::new(text, category).ok()?;
        Some(match obj.get("id").and_then(QuoteId::from_json) {
            Some(id) => quote.with_id(id),
            None => quote,
        })
    }

    /// Check the trimmed/non-empty invariant on an already deserialized quote.
    pub fn is_valid(&self) -> bool {
        let text = self.text.trim();
        let category = self.category.trim();
        !text.is_empty() && !category.is_empty() && text == self.text && category == self.category
    }
}

/// Parse a persisted collection.
///
/// The blob must be a JSON array of valid quotes with unique ids; anything else is a
/// `QuoteError::Format`.
pub fn parse_collection(raw: &str) -> Result<Vec<Quote>> {
    let quotes: Vec<Quote> = serde_json::from_str(raw)
        .map_err(|e| QuoteError::Format(format!("stored data is not a quote array: {}", e)))?;

    let mut seen = HashSet::new();
    for quote in &quotes {
        if !quote.is_valid() {
            return Err(QuoteError::Format(format!(
                "stored quote has empty or untrimmed fields: {:?}",
                quote
            )));
        }
        if let Some(id) = &quote.id {
            if !seen.insert(id.clone()) {
                return Err(QuoteError::Format(format!("duplicate quote id {}", id)));
            }
        }
    }
    Ok(quotes)
}

/// Built-in collection used when storage is empty, corrupt, or explicitly reset.
pub fn default_quotes() -> Vec<Quote> {
    [
        ("The journey of a thousand miles begins with one step.", "Motivation"),
        ("Success is not final; failure is not fatal.", "Success"),
        ("Believe you can and you're halfway there.", "Motivation"),
        ("Be yourself; everyone else is already taken.", "Life"),
    ]
    .into_iter()
    .map(|(text, category)| Quote {
        id: None,
        text: text.to_string(),
        category: category.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_trims_and_validates() {
        let quote = Quote::new("  Stay hungry  ", " Life ").unwrap();
        assert_eq!(quote.text, "Stay hungry");
        assert_eq!(quote.category, "Life");
        assert!(matches!(Quote::new("   ", "Life"), Err(QuoteError::Validation(_))));
        assert!(matches!(Quote::new("Text", ""), Err(QuoteError::Validation(_))));
    }

    #[test]
    fn from_record_keeps_usable_ids_only() {
        let with_int = Quote::from_record(&json!({"id": 7, "text": "a", "category": "b"})).unwrap();
        assert_eq!(with_int.id, Some(QuoteId::Int(7)));

        let with_bool = Quote::from_record(&json!({"id": true, "text": "a", "category": "b"})).unwrap();
        assert_eq!(with_bool.id, None);

        assert!(Quote::from_record(&json!({"foo": 1})).is_none());
        assert!(Quote::from_record(&json!({"text": 3, "category": "b"})).is_none());
        assert!(Quote::from_record(&json!("text")).is_none());
    }

    #[test]
    fn id_serializes_untagged() {
        let quote = Quote::new("a", "b").unwrap().with_id(QuoteId::Int(3));
        assert_eq!(
            serde_json::to_value(&quote).unwrap(),
            json!({"id": 3, "text": "a", "category": "b"})
        );
        let id_less = Quote::new("a", "b").unwrap();
        assert_eq!(
            serde_json::to_value(&id_less).unwrap(),
            json!({"text": "a", "category": "b"})
        );
    }

    #[test]
    fn parse_collection_rejects_bad_shapes() {
        assert!(matches!(parse_collection("{}"), Err(QuoteError::Format(_))));
        assert!(matches!(parse_collection("not json"), Err(QuoteError::Format(_))));
        assert!(matches!(
            parse_collection(r#"[{"text":"","category":"x"}]"#),
            Err(QuoteError::Format(_))
        ));
        assert!(matches!(
            parse_collection(r#"[{"id":1,"text":"a","category":"x"},{"id":1,"text":"b","category":"y"}]"#),
            Err(QuoteError::Format(_))
        ));
        let ok = parse_collection(r#"[{"id":"u-1","text":"a","category":"x"}]"#).unwrap();
        assert_eq!(ok[0].id, Some(QuoteId::Str("u-1".into())));
    }

    #[test]
    fn defaults_are_valid() {
        let defaults = default_quotes();
        assert_eq!(defaults.len(), 4);
        assert!(defaults.iter().all(Quote::is_valid));
    }
}
