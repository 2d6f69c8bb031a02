//! Settings shared by the dispatcher and the matcher.

use serde::{Deserialize, Serialize};

/// Worker count used when nothing else is configured.
pub const DEFAULT_THREADS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Size of the worker pool for metadata fetches and batch matching.
    pub threads: usize,
    /// Custom search-query template; disables the ISRC lookup when set.
    pub search_query: Option<String>,
    /// Take the provider's first hit instead of scoring candidates.
    pub filter_results: bool,
    /// Hide progress bars and print periodic log lines instead.
    pub log_only: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            search_query: None,
            filter_results: false,
            log_only: false,
        }
    }
}

impl Settings {
    /// Parse a settings object; absent keys keep their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Worker count, never zero.
    pub fn worker_count(&self) -> usize {
        self.threads.max(1)
    }
}
