//! Expiring in-memory cache for GBFS documents.
//!
//! Each entry carries its own TTL, taken from the `ttl` the feed declares.
//! By default entries are keyed by topic alone: a station status document
//! fetched for one language is served to callers asking for another language
//! until it expires, and the most recent fetch in any language replaces it.
//! Set [`CacheConfig::key_by_language`] to key child feeds by language too.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache as MokaCache;
use tracing::trace;

/// Cache slot for the supported-languages set.
pub const LANGUAGES_LABEL: &str = "languages";

/// Cache slot for complete snapshots.
pub const COMPLETE_LABEL: &str = "complete";

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached complete snapshots. Individual documents use their
    /// own declared TTL.
    pub snapshot_ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,

    /// Include the language in child-feed and snapshot keys.
    pub key_by_language: bool,
}

impl CacheConfig {
    /// Set the snapshot TTL.
    pub fn with_snapshot_ttl(mut self, ttl: Duration) -> Self {
        self.snapshot_ttl = ttl;
        self
    }

    /// Set the maximum number of entries.
    pub fn with_max_capacity(mut self, n: u64) -> Self {
        self.max_capacity = n;
        self
    }

    /// Key child feeds and snapshots by language.
    pub fn with_key_by_language(mut self, enabled: bool) -> Self {
        self.key_by_language = enabled;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_ttl: Duration::from_secs(10),
            max_capacity: 64,
            key_by_language: false,
        }
    }
}

/// Cache key: a topic label, optionally scoped to a language.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    label: &'static str,
    language: Option<String>,
}

impl CacheKey {
    /// Key shared by every language.
    pub fn topic(label: &'static str) -> Self {
        Self {
            label,
            language: None,
        }
    }

    /// Key scoped to one language.
    pub fn for_language(label: &'static str, language: &str) -> Self {
        Self {
            label,
            language: Some(language.to_string()),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

/// Cached value with the TTL it was stored under.
#[derive(Clone)]
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    ttl: Duration,
}

/// Expires each entry after its own TTL, restarting the clock on replacement.
struct PerEntryTtl;

impl Expiry<CacheKey, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Thread-safe expiring cache of GBFS documents.
pub struct FeedCache {
    entries: MokaCache<CacheKey, Entry>,
    snapshot_ttl: Duration,
    key_by_language: bool,
}

impl FeedCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(PerEntryTtl)
            .build();

        Self {
            entries,
            snapshot_ttl: config.snapshot_ttl,
            key_by_language: config.key_by_language,
        }
    }

    /// Key for a per-language resource under the configured key policy.
    pub fn language_key(&self, label: &'static str, language: &str) -> CacheKey {
        if self.key_by_language {
            CacheKey::for_language(label, language)
        } else {
            CacheKey::topic(label)
        }
    }

    /// TTL used for complete snapshots.
    pub fn snapshot_ttl(&self) -> Duration {
        self.snapshot_ttl
    }

    /// Look up a value. Returns `None` when absent, expired, or of a
    /// different type.
    pub fn get<V: Send + Sync + 'static>(&self, key: &CacheKey) -> Option<Arc<V>> {
        let entry = self.entries.get(key)?;
        match entry.value.downcast::<V>() {
            Ok(value) => {
                trace!(label = key.label, language = ?key.language, "cache hit");
                Some(value)
            }
            Err(_) => None,
        }
    }

    /// Store a value for `ttl`.
    ///
    /// A zero TTL means the value must not be reused: it is not stored and
    /// any previous entry under the key is dropped.
    pub fn set<V: Send + Sync + 'static>(&self, key: CacheKey, value: Arc<V>, ttl: Duration) {
        if ttl.is_zero() {
            trace!(label = key.label, language = ?key.language, "zero ttl, not caching");
            self.entries.invalidate(&key);
            return;
        }
        trace!(
            label = key.label,
            language = ?key.language,
            ttl_secs = ttl.as_secs(),
            "cache set"
        );
        self.entries.insert(key, Entry { value, ttl });
    }

    /// Run pending housekeeping, evicting expired entries.
    pub fn purge_expired(&self) {
        self.entries.run_pending_tasks();
    }

    /// Get cache statistics (for monitoring).
    ///
    /// The count is eventually consistent; call [`FeedCache::purge_expired`]
    /// first for an exact figure.
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}
