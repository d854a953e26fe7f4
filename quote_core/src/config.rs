//! Sync settings shared by the HTTP remote and the periodic scheduler.

use std::time::Duration;

/// Default remote endpoint (a public fake REST API).
pub const DEFAULT_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/posts";
/// Default bounded wait for one fetch.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
/// Default period between scheduled sync passes.
pub const DEFAULT_INTERVAL_SECS: u64 = 30;

/// Where and how often to synchronise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// URL answering GET with a JSON array and accepting POSTed quotes.
    pub endpoint: String,
    /// Upper bound on a single request; expiry counts as a fetch failure.
    pub timeout: Duration,
    /// Period of the recurring sync task.
    pub interval: Duration,
}

impl SyncConfig {
    /// Build a config from plain values, as parsed from the command line.
    pub fn new(endpoint: &str, timeout_secs: u64, interval_secs: u64) -> Self {
        Self {
            endpoint: endpoint.trim().to_string(),
            timeout: Duration::from_secs(timeout_secs.max(1)),
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS, DEFAULT_INTERVAL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_durations_are_clamped() {
        let config = SyncConfig::new(" http://localhost/quotes ", 0, 0);
        assert_eq!(config.endpoint, "http://localhost/quotes");
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.interval, Duration::from_secs(1));
    }
}
