//! Request handling: cache, then upstream, then fallback
//!
//! [`NisabProxy::resolve`] always produces an entry. A fresh cache entry is
//! served as is; otherwise IslamicAPI is asked once, and if that fails the
//! fallback calculation answers instead. Whatever was fetched or computed is
//! written back to the store on a best-effort basis.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::{CacheManager, MemoryStore, NisabStore};
use crate::config::{CacheBackend, ProxyConfig};
use crate::data::{
    calculate_fallback, CacheKey, IslamicApiClient, NisabEntry, Source, UpstreamError,
};

const CACHE_DEBUG: &str = "Served from cache";
const UPSTREAM_DEBUG: &str = "Fresh from IslamicAPI";

/// Serves nisab entries for any (currency, standard) request
#[derive(Clone)]
pub struct NisabProxy {
    config: Arc<ProxyConfig>,
    store: Arc<dyn NisabStore>,
    upstream: IslamicApiClient,
}

impl NisabProxy {
    pub fn new(
        config: Arc<ProxyConfig>,
        store: Arc<dyn NisabStore>,
        upstream: IslamicApiClient,
    ) -> Self {
        Self {
            config,
            store,
            upstream,
        }
    }

    /// Builds the proxy with the store and client described by `config`
    pub fn from_config(config: ProxyConfig) -> Result<Self, UpstreamError> {
        let upstream = IslamicApiClient::new(
            config.upstream.base_url.clone(),
            config.upstream.api_key.clone(),
            config.upstream.timeout(),
        )?;
        info!(
            upstream = %upstream.base_url(),
            timeout_secs = config.upstream.timeout_secs,
            max_age_secs = config.cache.max_age_secs,
            "configured nisab proxy"
        );

        let store: Arc<dyn NisabStore> = match config.cache.backend {
            CacheBackend::File => {
                let dir = config.cache.resolved_dir();
                info!(dir = %dir.display(), "using file cache");
                Arc::new(CacheManager::with_dir(dir))
            }
            CacheBackend::Memory => {
                info!("using in-memory cache");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::new(Arc::new(config), store, upstream))
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Normalizes raw query values and resolves them.
    pub async fn handle(&self, currency: Option<&str>, standard: Option<&str>) -> NisabEntry {
        let key = CacheKey::normalize(currency, standard);
        debug!(raw_currency = ?currency, raw_standard = ?standard, key = %key, "nisab request");
        self.resolve(&key).await
    }

    /// Returns the entry for `key`.
    ///
    /// # Behavior
    /// - Fresh, readable cache entry: returned with `source = cache`
    /// - Otherwise one upstream attempt; on success it is stored and returned
    ///   with `source = islamicapi`
    /// - On upstream failure the fallback entry is stored and returned with
    ///   `source = fallback`
    ///
    /// Store write failures are logged and do not change the response.
    pub async fn resolve(&self, key: &CacheKey) -> NisabEntry {
        let now = Utc::now();

        if self.store.is_fresh(key, self.config.cache.max_age(), now) {
            if let Some(mut entry) = self.store.read(key) {
                entry.debug = Some(CACHE_DEBUG.to_string());
                debug!(key = %key, "cache hit");
                return entry;
            }
        }

        match self.upstream.fetch(key).await {
            Ok(mut entry) => {
                entry.annotate(Source::IslamicApi, Some(Utc::now().to_rfc3339()), UPSTREAM_DEBUG);
                self.persist(key, &entry);
                info!(key = %key, "served fresh IslamicAPI data");
                entry
            }
            Err(e) => {
                warn!(key = %key, error = %e, "IslamicAPI request failed, using fallback");
                let entry = calculate_fallback(key, &self.config.fallback);
                self.persist(key, &entry);
                entry
            }
        }
    }

    fn persist(&self, key: &CacheKey, entry: &NisabEntry) {
        if let Err(e) = self.store.save(key, entry) {
            warn!(location = %self.store.locate(key), error = %e, "failed to write cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fallback::FALLBACK_DEBUG;
    use crate::data::{Currency, FallbackPriceTable, Standard};
    use chrono::Duration;
    use std::time::Duration as StdDuration;

    /// Proxy whose upstream points at a closed local port
    fn offline_proxy(store: Arc<dyn NisabStore>) -> NisabProxy {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/", listener.local_addr().unwrap());
        drop(listener);

        let upstream = IslamicApiClient::new(url, "test-key", StdDuration::from_secs(2)).unwrap();
        NisabProxy::new(Arc::new(ProxyConfig::default()), store, upstream)
    }

    fn cached_entry(key: &CacheKey, status: &str) -> NisabEntry {
        let mut entry = calculate_fallback(key, &FallbackPriceTable::default());
        entry.status = status.to_string();
        entry
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_from_cache() {
        let store = Arc::new(MemoryStore::new());
        let key = CacheKey::new(Currency::Usd, Standard::Classical);
        store.insert_at(
            key,
            cached_entry(&key, "cached"),
            Utc::now() - Duration::seconds(21600 - 60),
        );

        let proxy = offline_proxy(store.clone());
        let entry = proxy.resolve(&key).await;

        assert_eq!(entry.source, Some(Source::Cache));
        assert_eq!(entry.status, "cached");
        assert_eq!(entry.debug.as_deref(), Some(CACHE_DEBUG));
    }

    #[tokio::test]
    async fn test_stale_entry_triggers_refetch() {
        let store = Arc::new(MemoryStore::new());
        let key = CacheKey::new(Currency::Usd, Standard::Classical);
        let stale_at = Utc::now() - Duration::seconds(21600 + 60);
        store.insert_at(key, cached_entry(&key, "cached"), stale_at);

        let proxy = offline_proxy(store.clone());
        let entry = proxy.resolve(&key).await;

        // Upstream is down, so the refetch ends in the fallback
        assert_eq!(entry.source, Some(Source::Fallback));
        assert_eq!(entry.status, "success");
        assert_eq!(entry.debug.as_deref(), Some(FALLBACK_DEBUG));
        assert!(store.modified_at(&key).unwrap() > stale_at);
    }

    #[tokio::test]
    async fn test_miss_with_upstream_down_persists_fallback() {
        let store = Arc::new(MemoryStore::new());
        let proxy = offline_proxy(store.clone());

        let entry = proxy.handle(Some("usd"), Some("classical")).await;

        assert_eq!(entry.source, Some(Source::Fallback));
        assert_eq!(entry.currency, "USD");
        assert_eq!(entry.data.nisab_thresholds.gold.nisab_amount, 5489.37);
        assert_eq!(entry.data.nisab_thresholds.silver.nisab_amount, 520.51);
        assert_eq!(store.len(), 1);

        // The persisted fallback now answers as a cache hit
        let again = proxy.handle(Some("USD"), None).await;
        assert_eq!(again.source, Some(Source::Cache));
        assert_eq!(again.data, entry.data);
    }

    #[tokio::test]
    async fn test_invalid_input_resolves_default_key() {
        let store = Arc::new(MemoryStore::new());
        let proxy = offline_proxy(store.clone());

        let entry = proxy.handle(Some("XYZ"), Some("bogus")).await;

        assert_eq!(entry.currency, "NGN");
        assert_eq!(entry.calculation_standard, "classical");
        assert!(store.modified_at(&CacheKey::default()).is_some());
    }

    #[tokio::test]
    async fn test_unwritable_store_still_answers() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();
        let store = Arc::new(CacheManager::with_dir(blocker.join("cache")));
        let proxy = offline_proxy(store);

        let entry = proxy.handle(Some("GBP"), Some("common")).await;

        assert_eq!(entry.code, 200);
        assert_eq!(entry.currency, "GBP");
        assert_eq!(entry.calculation_standard, "common");
        assert_eq!(entry.data.nisab_thresholds.gold.weight, 85.0);
    }

    #[test]
    fn test_from_config_memory_backend() {
        let mut config = ProxyConfig::default();
        config.cache.backend = CacheBackend::Memory;
        let proxy = NisabProxy::from_config(config).unwrap();
        assert_eq!(proxy.config().cache.backend, CacheBackend::Memory);
    }
}
