//! In-memory series cache with TTL-based lazy eviction
//!
//! Entries are only checked for expiry when read; there is no background
//! sweeper. A stale entry found during `get` is removed on the spot and the
//! read reports a miss.

use log::debug;
use parking_lot::Mutex;
use portal_charts_shared::{Series, SeriesKey};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How long a cached series stays fresh
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cache key derived from the series key plus the request parameters.
///
/// The key stays structured rather than concatenated: filter values may
/// themselves contain separator characters, and two distinct requests must
/// never alias to one entry. Filters are carried in a `BTreeMap`, so two
/// requests with the same parameters in different order produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: SeriesKey,
    period: Option<String>,
    filters: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(
        key: SeriesKey,
        period: Option<&str>,
        filters: &BTreeMap<String, String>,
    ) -> Self {
        Self {
            key,
            period: period.map(str::to_string),
            filters: filters.clone(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|", self.key, self.period.as_deref().unwrap_or(""))?;
        let mut first = true;
        for (name, value) in &self.filters {
            if !first {
                f.write_str("&")?;
            }
            write!(f, "{}={}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

struct CacheEntry {
    series: Series,
    stored_at: Instant,
}

/// TTL cache for normalized series
pub struct SeriesCache {
    entries: HashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    /// Fresh entry for the key, or `None`. Expired entries are evicted here.
    pub fn get(&mut self, key: &CacheKey) -> Option<Series> {
        match self.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                debug!("cache hit for {}", key);
                Some(entry.series.clone())
            }
            Some(_) => {
                debug!("cache entry for {} expired, evicting", key);
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a series, superseding any previous entry and restarting its TTL
    pub fn put(&mut self, key: CacheKey, series: Series) {
        self.entries.insert(
            key,
            CacheEntry {
                series,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, expired ones included until they are read
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SeriesCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe cache handle shared across the pipeline
#[derive(Clone)]
pub struct SharedSeriesCache {
    inner: Arc<Mutex<SeriesCache>>,
}

impl SharedSeriesCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SeriesCache::with_ttl(ttl))),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Series> {
        self.inner.lock().get(key)
    }

    pub fn put(&self, key: CacheKey, series: Series) {
        self.inner.lock().put(key, series);
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }
}

impl Default for SharedSeriesCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_charts_shared::{CanonicalRecord, RecordId};
    use std::thread::sleep;

    fn sample_series(value: f64) -> Series {
        Series::from_records(vec![CanonicalRecord {
            id: RecordId::Int(0),
            label: "Ene".to_string(),
            value,
            category: "general".to_string(),
            timestamp: chrono::Utc::now(),
            extra: serde_json::Map::new(),
        }])
    }

    fn key_for(series: SeriesKey) -> CacheKey {
        CacheKey::new(series, None, &BTreeMap::new())
    }

    #[test]
    fn test_get_within_ttl() {
        let mut cache = SeriesCache::new();
        let key = key_for(SeriesKey::Empresas);
        cache.put(key.clone(), sample_series(10.0));

        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.values(), vec![10.0]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_evicted_on_read() {
        let mut cache = SeriesCache::with_ttl(Duration::from_millis(20));
        let key = key_for(SeriesKey::Usuarios);
        cache.put(key.clone(), sample_series(5.0));

        sleep(Duration::from_millis(40));

        assert!(cache.get(&key).is_none());
        // The expired entry is gone, not merely hidden
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_expired_entry_lingers_until_read() {
        let mut cache = SeriesCache::with_ttl(Duration::from_millis(10));
        cache.put(key_for(SeriesKey::Eventos), sample_series(3.0));

        sleep(Duration::from_millis(30));

        // No sweeper: the stale entry still counts until someone reads it
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_put_supersedes_and_restarts_ttl() {
        let mut cache = SeriesCache::with_ttl(Duration::from_millis(50));
        let key = key_for(SeriesKey::Empresas);
        cache.put(key.clone(), sample_series(1.0));

        sleep(Duration::from_millis(30));
        cache.put(key.clone(), sample_series(2.0));
        sleep(Duration::from_millis(30));

        // 60ms after the first put but only 30ms after the second
        let hit = cache.get(&key).unwrap();
        assert_eq!(hit.values(), vec![2.0]);
    }

    #[test]
    fn test_key_is_order_insensitive_for_filters() {
        let mut a = BTreeMap::new();
        a.insert("region".to_string(), "norte".to_string());
        a.insert("activo".to_string(), "1".to_string());

        let mut b = BTreeMap::new();
        b.insert("activo".to_string(), "1".to_string());
        b.insert("region".to_string(), "norte".to_string());

        let ka = CacheKey::new(SeriesKey::Empresas, Some("2026"), &a);
        let kb = CacheKey::new(SeriesKey::Empresas, Some("2026"), &b);
        assert_eq!(ka, kb);
        assert_eq!(ka.to_string(), "empresas|2026|activo=1&region=norte");
    }

    #[test]
    fn test_separator_characters_in_filters_do_not_alias_keys() {
        // One filter whose value embeds "&" and "=" versus two plain filters
        let mut embedded = BTreeMap::new();
        embedded.insert("a".to_string(), "1&b=2".to_string());

        let mut plain = BTreeMap::new();
        plain.insert("a".to_string(), "1".to_string());
        plain.insert("b".to_string(), "2".to_string());

        let ka = CacheKey::new(SeriesKey::Empresas, None, &embedded);
        let kb = CacheKey::new(SeriesKey::Empresas, None, &plain);
        assert_ne!(ka, kb);

        let mut cache = SeriesCache::new();
        cache.put(ka.clone(), sample_series(1.0));
        cache.put(kb.clone(), sample_series(2.0));
        assert_eq!(cache.get(&ka).unwrap().values(), vec![1.0]);
        assert_eq!(cache.get(&kb).unwrap().values(), vec![2.0]);
    }

    #[test]
    fn test_distinct_parameters_distinct_entries() {
        let mut cache = SeriesCache::new();
        let plain = key_for(SeriesKey::Empresas);
        let scoped = CacheKey::new(SeriesKey::Empresas, Some("2025"), &BTreeMap::new());

        cache.put(plain.clone(), sample_series(1.0));
        cache.put(scoped.clone(), sample_series(2.0));

        assert_eq!(cache.get(&plain).unwrap().values(), vec![1.0]);
        assert_eq!(cache.get(&scoped).unwrap().values(), vec![2.0]);
    }

    #[test]
    fn test_shared_cache_clones_view_same_store() {
        let cache = SharedSeriesCache::new();
        let other = cache.clone();
        let key = key_for(SeriesKey::Usuarios);

        cache.put(key.clone(), sample_series(9.0));
        assert_eq!(other.get(&key).unwrap().values(), vec![9.0]);

        other.clear();
        assert!(cache.get(&key).is_none());
    }
}
