//! Remote sync endpoint access and mapping of remote records into quotes.
//!
//! The endpoint answers GET with a JSON array of arbitrary objects. Each object is
//! mapped into a `Quote`: the `id` is mandatory, the text comes from `text`, `title` or
//! `body` (first non-empty wins), and the category defaults to `SERVER_CATEGORY` unless
//! the record carries its own. POST pushes the local collection and is best effort.

use log::debug;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::SyncConfig;
use crate::error::QuoteError;
use crate::model::quote::{Quote, QuoteId};
use crate::result::Result;

/// Category assigned to remote records that do not carry one.
pub const SERVER_CATEGORY: &str = "Server";

/// Source of remote quote records.
pub trait RemoteSource: Send + Sync {
    /// Fetch the full remote collection as raw JSON records.
    fn fetch(&self) -> Result<Vec<Value>>;

    /// Push local quotes to the remote side.
    fn push(&self, quotes: &[Quote]) -> Result<()>;
}

/// `RemoteSource` over HTTP with a bounded per-request timeout.
pub struct HttpRemote {
    client: Client,
    endpoint: String,
}

impl HttpRemote {
    /// Build a client for `config.endpoint` using `config.timeout`.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl RemoteSource for HttpRemote {
    fn fetch(&self) -> Result<Vec<Value>> {
        debug!("GET {}", self.endpoint);
        let body: Value = self
            .client
            .get(&self.endpoint)
            .send()?
            .error_for_status()?
            .json()?;
        match body {
            Value::Array(records) => Ok(records),
            other => Err(QuoteError::Sync(format!(
                "expected a JSON array from {}, got {}",
                self.endpoint,
                json_kind(&other)
            ))),
        }
    }

    fn push(&self, quotes: &[Quote]) -> Result<()> {
        debug!("POST {} quotes to {}", quotes.len(), self.endpoint);
        self.client
            .post(&self.endpoint)
            .json(quotes)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

/// Map one remote record into a quote.
pub fn map_remote_record(record: &Value) -> Result<Quote> {
    let obj = record
        .as_object()
        .ok_or_else(|| QuoteError::Sync(format!("remote record is a {}, not an object", json_kind(record))))?;

    let id = obj
        .get("id")
        .and_then(QuoteId::from_json)
        .ok_or_else(|| QuoteError::Sync(format!("remote record without a usable id: {}", record)))?;

    let text = ["text", "title", "body"]
        .iter()
        .filter_map(|field| obj.get(*field).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .ok_or_else(|| QuoteError::Sync(format!("remote record {} has no text", id)))?;

    let category = obj
        .get("category")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(SERVER_CATEGORY);

    Ok(Quote {
        id: Some(id),
        text: text.to_string(),
        category: category.to_string(),
    })
}

/// Map a whole remote collection; the first unmappable record fails the batch.
pub fn map_remote_records(records: &[Value]) -> Result<Vec<Quote>> {
    records.iter().map(map_remote_record).collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
