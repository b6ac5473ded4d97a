//! Storage abstraction for nisab entries

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::warn;

use crate::data::{CacheKey, NisabEntry, Source};

/// Errors raised by a store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Directory creation, read, write or rename failed
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored document is not a valid nisab entry
    #[error("corrupt cache entry {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Entry could not be serialized
    #[error("failed to serialize entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// An entry together with the time it was last written
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub entry: NisabEntry,
    pub modified: DateTime<Utc>,
}

/// True iff `modified` is less than `max_age` before `now`
pub fn is_within(modified: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    now - modified < max_age
}

/// Key-value store the proxy caches entries in
///
/// Implementations only move whole entries: `save` replaces the previous value
/// for a key in one step, so readers see either the old or the new entry.
pub trait NisabStore: Send + Sync {
    /// Storage location for `key`, for logging
    fn locate(&self, key: &CacheKey) -> String;

    /// Last-write time of the entry, `None` if there is none
    fn modified_at(&self, key: &CacheKey) -> Option<DateTime<Utc>>;

    /// Loads the raw stored entry
    fn load(&self, key: &CacheKey) -> Result<Option<StoredEntry>, StoreError>;

    /// Replaces the entry for `key`
    fn save(&self, key: &CacheKey, entry: &NisabEntry) -> Result<(), StoreError>;

    /// Whether an entry exists and was written less than `max_age` before `now`
    fn is_fresh(&self, key: &CacheKey, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.modified_at(key)
            .map(|modified| is_within(modified, now, max_age))
            .unwrap_or(false)
    }

    /// Reads an entry and tags it as served from cache.
    ///
    /// Missing, unreadable and corrupt entries all yield `None`; failures are logged.
    fn read(&self, key: &CacheKey) -> Option<NisabEntry> {
        match self.load(key) {
            Ok(Some(stored)) => {
                let mut entry = stored.entry;
                entry.source = Some(Source::Cache);
                entry.cached_at = Some(stored.modified.to_rfc3339());
                Some(entry)
            }
            Ok(None) => {
                warn!(location = %self.locate(key), "cache entry not found");
                None
            }
            Err(e) => {
                warn!(error = %e, "failed to read cache entry");
                None
            }
        }
    }
}
