//! Cache module for storing nisab entries
//!
//! Entries are keyed by [`CacheKey`](crate::data::CacheKey) and judged fresh by
//! their last-write time alone. The [`NisabStore`] trait lets the proxy run on the
//! filesystem-backed [`CacheManager`] or the in-process [`MemoryStore`].

mod manager;
mod memory;
mod store;

pub use manager::CacheManager;
pub use memory::MemoryStore;
pub use store::{is_within, NisabStore, StoreError, StoredEntry};
