//! In-process store, used for tests and the `memory` cache backend

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use super::store::{NisabStore, StoreError, StoredEntry};
use crate::data::{CacheKey, NisabEntry};

/// Keeps entries in a map; contents are lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<CacheKey, StoredEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an entry with an explicit last-write time
    pub fn insert_at(&self, key: CacheKey, entry: NisabEntry, modified: DateTime<Utc>) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, StoredEntry { entry, modified });
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NisabStore for MemoryStore {
    fn locate(&self, key: &CacheKey) -> String {
        format!("memory:{}", key.location())
    }

    fn modified_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).map(|stored| stored.modified)
    }

    fn load(&self, key: &CacheKey) -> Result<Option<StoredEntry>, StoreError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &CacheKey, entry: &NisabEntry) -> Result<(), StoreError> {
        self.insert_at(*key, entry.clone(), Utc::now());
        Ok(())
    }
}
