//! Catalog fetcher with a per-collection cache.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::CatalogError;
use super::listing::{CatalogEntry, parse_listing};
use super::registry::{CatalogRegistry, CatalogSource};
use crate::download::HttpClient;
use crate::download::constants::LISTING_TIMEOUT_SECS;
use crate::filter::{self, SearchOptions};

type CacheKey = (String, String);

/// Fetches and caches directory listings for registry collections.
///
/// Listings are cached for the lifetime of the fetcher. A forced reload
/// replaces one collection's entry; a failed fetch leaves it untouched.
#[derive(Debug)]
pub struct CatalogFetcher {
    registry: Arc<CatalogRegistry>,
    client: HttpClient,
    cache: RwLock<HashMap<CacheKey, Arc<[CatalogEntry]>>>,
    timeout: Duration,
}

impl CatalogFetcher {
    /// Creates a fetcher over `registry` using `client` for listing requests.
    #[must_use]
    pub fn new(registry: Arc<CatalogRegistry>, client: HttpClient) -> Self {
        Self {
            registry,
            client,
            cache: RwLock::new(HashMap::new()),
            timeout: Duration::from_secs(LISTING_TIMEOUT_SECS),
        }
    }

    /// Overrides the listing request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the registry this fetcher reads from.
    #[must_use]
    pub fn registry(&self) -> &CatalogRegistry {
        &self.registry
    }

    /// Returns the entries of one collection.
    ///
    /// Served from cache unless `force_reload` is set or nothing is cached.
    /// Failures are logged and yield an empty list; callers cannot tell an
    /// empty collection from a failed fetch.
    #[instrument(skip(self))]
    pub async fn fetch(
        &self,
        category: &str,
        key: &str,
        force_reload: bool,
    ) -> Arc<[CatalogEntry]> {
        let cache_key = (category.to_string(), key.to_string());
        if !force_reload && let Some(entries) = self.cached(&cache_key) {
            debug!(entries = entries.len(), "listing served from cache");
            return entries;
        }

        match self.fetch_listing(category, key).await {
            Ok(entries) => {
                info!(entries = entries.len(), "fetched listing");
                let entries: Arc<[CatalogEntry]> = entries.into();
                self.cache
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(cache_key, Arc::clone(&entries));
                entries
            }
            Err(error) => {
                warn!(error = %error, "listing fetch failed, returning no entries");
                Arc::from(Vec::new())
            }
        }
    }

    /// Fetches a collection and applies [`filter::search`].
    #[instrument(skip(self, options))]
    pub async fn search(
        &self,
        category: &str,
        key: &str,
        options: &SearchOptions,
    ) -> Vec<CatalogEntry> {
        let entries = self.fetch(category, key, false).await;
        filter::search(&entries, options)
    }

    /// Drops the cached listing of one collection.
    ///
    /// Returns true if something was cached.
    pub fn invalidate(&self, category: &str, key: &str) -> bool {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(category.to_string(), key.to_string()))
            .is_some()
    }

    /// Returns true if a listing is cached for the collection.
    #[must_use]
    pub fn is_cached(&self, category: &str, key: &str) -> bool {
        self.cached(&(category.to_string(), key.to_string()))
            .is_some()
    }

    fn cached(&self, cache_key: &CacheKey) -> Option<Arc<[CatalogEntry]>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(cache_key)
            .cloned()
    }

    fn source(&self, category: &str, key: &str) -> Result<&CatalogSource, CatalogError> {
        self.registry
            .get(category, key)
            .ok_or_else(|| CatalogError::unknown_collection(category, key))
    }

    async fn fetch_listing(
        &self,
        category: &str,
        key: &str,
    ) -> Result<Vec<CatalogEntry>, CatalogError> {
        let source = self.source(category, key)?;
        let url = source.url.as_str();
        info!(url, "fetching listing");

        let response = self
            .client
            .inner()
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| CatalogError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::http_status(url, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CatalogError::network(url, e))?;

        Ok(parse_listing(&body, source))
    }
}
