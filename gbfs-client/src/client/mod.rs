//! Cached GBFS client.
//!
//! Resolves child feeds through the auto-discovery document, fetches and
//! normalizes each feed, and caches every document for the TTL it declares.
//! All operations block on I/O and are safe to call from several threads on
//! one client. Concurrent calls on a cold cache may each fetch; the last
//! write wins.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{COMPLETE_LABEL, CacheConfig, CacheKey, FeedCache, LANGUAGES_LABEL};
use crate::feed::{
    AutoDiscovery, ChildFeed, CompleteSnapshot, FeedDocument, FeedTransport, GbfsError,
    HttpTransport, StationInformationFeed, StationStatusFeed, TransportConfig,
};


/// Configuration for the GBFS client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// URL of the auto-discovery document (`gbfs.json`)
    pub feed_url: String,
    /// HTTP transport settings
    pub transport: TransportConfig,
    /// Cache settings
    pub cache: CacheConfig,
}

impl ClientConfig {
    /// Create a new config for the given auto-discovery URL.
    pub fn new(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            transport: TransportConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.transport.timeout_secs = secs;
        self
    }

    /// Set a custom user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.transport.user_agent = user_agent.into();
        self
    }

    /// Set cache configuration.
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}

/// GBFS client with caching.
///
/// Owns its transport and cache; nothing is shared between clients.
pub struct GbfsClient<T = HttpTransport> {
    feed_url: String,
    transport: T,
    cache: FeedCache,
}

impl GbfsClient<HttpTransport> {
    /// Create a client that fetches feeds over HTTP.
    pub fn new(config: ClientConfig) -> Result<Self, GbfsError> {
        let transport = HttpTransport::new(&config.transport)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: FeedTransport> GbfsClient<T> {
    /// Create a client over an arbitrary transport.
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            feed_url: config.feed_url,
            transport,
            cache: FeedCache::new(&config.cache),
        }
    }

    /// URL of the auto-discovery document.
    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// Access the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Get the auto-discovery document, using cache if available.
    pub fn auto_discovery(&self) -> Result<Arc<AutoDiscovery>, GbfsError> {
        let key = CacheKey::topic(AutoDiscovery::CACHE_LABEL);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let document = Arc::new(self.fetch_feed::<AutoDiscovery>(&self.feed_url)?);
        self.cache.set(key, document.clone(), document.header.ttl_duration);
        Ok(document)
    }

    /// Language codes advertised by the auto-discovery document.
    pub fn supported_languages(&self) -> Result<Arc<BTreeSet<String>>, GbfsError> {
        let key = CacheKey::topic(LANGUAGES_LABEL);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let discovery = self.auto_discovery()?;
        let languages = Arc::new(discovery.languages());
        self.cache.set(key, languages.clone(), discovery.header.ttl_duration);
        Ok(languages)
    }

    /// Status of all stations, from the feed advertised for `language`.
    pub fn station_status(&self, language: &str) -> Result<Arc<StationStatusFeed>, GbfsError> {
        self.child_feed(language)
    }

    /// Descriptive information for all stations, from the feed advertised
    /// for `language`.
    pub fn station_information(
        &self,
        language: &str,
    ) -> Result<Arc<StationInformationFeed>, GbfsError> {
        self.child_feed(language)
    }

    /// Auto-discovery, station status and station information for `language`.
    ///
    /// The first failing step fails the whole call; no partial snapshot is
    /// returned or cached. The snapshot is cached for
    /// [`CacheConfig::snapshot_ttl`] regardless of the documents' own TTLs.
    pub fn complete_snapshot(&self, language: &str) -> Result<Arc<CompleteSnapshot>, GbfsError> {
        let key = self.cache.language_key(COMPLETE_LABEL, language);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let snapshot = Arc::new(CompleteSnapshot {
            auto_discovery: self.auto_discovery()?,
            station_status: self.station_status(language)?,
            station_information: self.station_information(language)?,
        });
        self.cache.set(key, snapshot.clone(), self.cache.snapshot_ttl());
        Ok(snapshot)
    }

    /// Get any child feed for `language`, using cache if available.
    pub fn child_feed<F: ChildFeed>(&self, language: &str) -> Result<Arc<F>, GbfsError> {
        let key = self.cache.language_key(F::CACHE_LABEL, language);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let url = self.child_feed_url(language, F::FEED_NAME)?;
        let document = Arc::new(self.fetch_feed::<F>(&url)?);
        self.cache.set(key, document.clone(), document.header().ttl_duration);
        Ok(document)
    }

    /// Locate a child feed URL from the auto-discovery document.
    ///
    /// When a language lists the same feed name more than once, the last
    /// entry wins.
    pub fn child_feed_url(&self, language: &str, feed_name: &str) -> Result<String, GbfsError> {
        let discovery = self.auto_discovery()?;
        discovery.feed_url(language, feed_name).map(str::to_string)
    }

    /// Fetch, decode and normalize a feed document, bypassing the cache.
    pub fn fetch_feed<D: FeedDocument>(&self, url: &str) -> Result<D, GbfsError> {
        debug!(url, feed = D::CACHE_LABEL, "fetching feed");
        let body = self.transport.fetch(url)?;

        let mut document: D = serde_json::from_slice(&body)
            .map_err(|e| GbfsError::decode(url, e.to_string(), Some(&body)))?;
        document
            .prepare()
            .map_err(|message| GbfsError::decode(url, message, None))?;

        debug!(
            url,
            feed = D::CACHE_LABEL,
            ttl_secs = document.header().ttl,
            "fetched feed"
        );
        Ok(document)
    }

    /// Get cache statistics.
    pub fn cache_entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }
}
