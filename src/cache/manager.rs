//! Cache manager for persisting nisab entries to disk
//!
//! Provides a `CacheManager` that stores each entry as a pretty-printed JSON file
//! named after its key. The file modification time is the freshness signal.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use super::store::{NisabStore, StoreError, StoredEntry};
use crate::data::{CacheKey, NisabEntry};

/// Distinguishes temp files written concurrently by one process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Manages reading and writing nisab entries on disk
///
/// Files live in an XDG-compliant cache directory (`~/.cache/nisab-proxy/` on
/// Linux) unless a directory is given explicitly. Writes go to a temporary file
/// in the same directory which is then renamed over the target, so a concurrent
/// reader never sees a half-written document.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl CacheManager {
    /// Creates a new CacheManager using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "nisab-proxy")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a new CacheManager with a custom cache directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Returns the path to the cache file for the given key
    pub fn cache_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key.location()))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.cache_dir).map_err(|source| StoreError::Io {
            path: self.cache_dir.display().to_string(),
            source,
        })
    }

    fn temp_path(&self, key: &CacheKey) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.cache_dir.join(format!(
            ".{}.{}.{}.tmp",
            key.location(),
            std::process::id(),
            n
        ))
    }
}

impl NisabStore for CacheManager {
    fn locate(&self, key: &CacheKey) -> String {
        self.cache_path(key).display().to_string()
    }

    fn modified_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(self.cache_path(key)).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    fn load(&self, key: &CacheKey) -> Result<Option<StoredEntry>, StoreError> {
        let path = self.cache_path(key);
        let io_error = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(e)),
        };
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(io_error)?;

        let entry: NisabEntry =
            serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Some(StoredEntry {
            entry,
            modified: DateTime::<Utc>::from(modified),
        }))
    }

    /// Writes the entry as pretty-printed JSON
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err` if directory creation, writing or the final rename fails
    fn save(&self, key: &CacheKey, entry: &NisabEntry) -> Result<(), StoreError> {
        self.ensure_dir()?;

        let json = serde_json::to_string_pretty(entry)?;
        let temp_path = self.temp_path(key);
        let final_path = self.cache_path(key);

        fs::write(&temp_path, json).map_err(|source| StoreError::Io {
            path: temp_path.display().to_string(),
            source,
        })?;

        fs::rename(&temp_path, &final_path).map_err(|source| {
            fs::remove_file(&temp_path).ok();
            StoreError::Io {
                path: final_path.display().to_string(),
                source,
            }
        })
    }
}
