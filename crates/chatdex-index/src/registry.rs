//! Discovery and caching of extension field names per tenant.
//!
//! Extension fields are not part of the fixed schema: each tenant grows its own set as
//! messages with OCR, speech or QR transcripts arrive. Enumerating the names requires a walk
//! over the term dictionary of every segment, so results are cached per tenant for a fixed
//! time and dropped as soon as the tenant's index changes.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use chatdex_config::RegistrySettings;
use chatdex_query::EXTENSION_PREFIX;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::IndexError;

/// Anything that can list the field names present in one tenant index.
pub trait FieldNameSource {
    /// Returns every extension-capable field name present in the index.
    fn field_names(&self) -> Result<Vec<String>, IndexError>;
}

/// A cached name list.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Extension field names of the tenant.
    fields: Arc<[String]>,
    /// When the list was derived.
    cached_at: Instant,
}

/// Mutable registry state, guarded by one lock.
#[derive(Debug, Default)]
struct State {
    /// Cached entries by tenant id.
    entries: HashMap<i64, CacheEntry>,
    /// Bumped by every invalidation so lookups racing a write do not cache stale names.
    generation: u64,
}

/// Thread-safe, time-limited cache of extension field names keyed by tenant.
#[derive(Debug)]
pub struct ExtensionFieldRegistry {
    /// Cache state.
    state: Mutex<State>,
    /// How long an entry stays valid.
    ttl: Duration,
    /// Maximum number of cached tenants.
    max_entries: usize,
}

impl ExtensionFieldRegistry {
    /// Creates an empty registry.
    ///
    /// A `max_entries` of zero is treated as one.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Creates a registry from configuration.
    pub fn from_settings(settings: &RegistrySettings) -> Self {
        Self::new(settings.ttl(), settings.max_entries)
    }

    /// Returns the extension field names of a tenant.
    ///
    /// Serves from cache while the entry is fresh. On a miss the names are enumerated from
    /// `source` and filtered to those carrying the extension marker. Enumeration failures are
    /// logged and produce an empty list, which is not cached.
    pub fn get_fields(&self, tenant: i64, source: &dyn FieldNameSource) -> Vec<String> {
        let generation = {
            let mut state = self.state.lock();
            self.purge_expired(&mut state);
            if let Some(entry) = state.entries.get(&tenant) {
                return entry.fields.to_vec();
            }
            state.generation
        };

        let fields: Vec<String> = match source.field_names() {
            Ok(names) => names
                .into_iter()
                .filter(|name| name.starts_with(EXTENSION_PREFIX))
                .collect(),
            Err(e) => {
                warn!(group_id = tenant, error = %e, "failed to enumerate extension fields");
                return Vec::new();
            }
        };
        debug!(group_id = tenant, count = fields.len(), "discovered extension fields");

        let mut state = self.state.lock();
        if state.generation == generation {
            self.insert(&mut state, tenant, &fields);
        }
        fields
    }

    /// Drops the cached entry of one tenant, or of every tenant when `tenant` is `None`.
    ///
    /// Invalidating a tenant that is not cached is a no-op.
    pub fn invalidate(&self, tenant: Option<i64>) {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        match tenant {
            Some(tenant) => {
                state.entries.remove(&tenant);
            }
            None => state.entries.clear(),
        }
    }

    /// Number of tenants currently cached, expired entries included.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every entry older than the TTL.
    fn purge_expired(&self, state: &mut State) {
        let ttl = self.ttl;
        state
            .entries
            .retain(|_, entry| entry.cached_at.elapsed() < ttl);
    }

    /// Stores a fresh entry, evicting the oldest one when the cache is full.
    fn insert(&self, state: &mut State, tenant: i64, fields: &[String]) {
        if !state.entries.contains_key(&tenant) && state.entries.len() >= self.max_entries {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.cached_at)
                .map(|(tenant, _)| *tenant);
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
            }
        }
        state.entries.insert(
            tenant,
            CacheEntry {
                fields: fields.into(),
                cached_at: Instant::now(),
            },
        );
    }
}

impl Default for ExtensionFieldRegistry {
    fn default() -> Self {
        Self::from_settings(&RegistrySettings::default())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        thread,
    };

    use super::*;

    /// Field source with a call counter and switchable failure.
    struct FakeSource {
        names: Vec<String>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeSource {
        fn new(names: &[&str]) -> Self {
            Self {
                names: names.iter().map(|s| (*s).to_string()).collect(),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(&[])
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl FieldNameSource for FakeSource {
        fn field_names(&self) -> Result<Vec<String>, IndexError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(IndexError::Search("segment unreadable".into()))
            } else {
                Ok(self.names.clone())
            }
        }
    }

    fn registry() -> ExtensionFieldRegistry {
        ExtensionFieldRegistry::new(Duration::from_secs(3600), 100)
    }

    #[test]
    fn filters_to_extension_fields() {
        let source = FakeSource::new(&["Ext_OCR_Result", "content", "Ext_ASR_Result", "ext_x"]);
        assert_eq!(
            registry().get_fields(1, &source),
            vec!["Ext_OCR_Result", "Ext_ASR_Result"]
        );
    }

    #[test]
    fn caches_within_ttl() {
        let registry = registry();
        let source = FakeSource::new(&["Ext_OCR_Result"]);

        registry.get_fields(1, &source);
        registry.get_fields(1, &source);
        assert_eq!(source.calls(), 1);
    }

    #[test]
    fn expired_entries_are_rederived() {
        let registry = ExtensionFieldRegistry::new(Duration::ZERO, 100);
        let source = FakeSource::new(&["Ext_OCR_Result"]);

        registry.get_fields(1, &source);
        registry.get_fields(1, &source);
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn expired_entries_of_other_tenants_are_purged_on_access() {
        let registry = ExtensionFieldRegistry::new(Duration::from_millis(20), 100);
        registry.get_fields(1, &FakeSource::new(&["Ext_A"]));
        thread::sleep(Duration::from_millis(40));

        registry.get_fields(2, &FakeSource::new(&["Ext_B"]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn invalidate_forces_rederivation() {
        let registry = registry();
        let source = FakeSource::new(&["Ext_OCR_Result"]);

        registry.get_fields(1, &source);
        registry.invalidate(Some(1));
        registry.get_fields(1, &source);
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn invalidate_missing_and_all() {
        let registry = registry();
        registry.invalidate(Some(99));
        registry.get_fields(1, &FakeSource::new(&["Ext_A"]));
        registry.get_fields(2, &FakeSource::new(&["Ext_B"]));
        assert_eq!(registry.len(), 2);

        registry.invalidate(None);
        assert!(registry.is_empty());
    }

    #[test]
    fn evicts_oldest_when_full() {
        let registry = ExtensionFieldRegistry::new(Duration::from_secs(3600), 2);
        let first = FakeSource::new(&["Ext_A"]);
        registry.get_fields(1, &first);
        thread::sleep(Duration::from_millis(2));
        registry.get_fields(2, &FakeSource::new(&["Ext_B"]));
        thread::sleep(Duration::from_millis(2));

        // Reading tenant 1 again does not refresh its age.
        registry.get_fields(1, &first);
        registry.get_fields(3, &FakeSource::new(&["Ext_C"]));
        assert_eq!(registry.len(), 2);

        registry.get_fields(1, &first);
        assert_eq!(first.calls(), 2, "tenant 1 should have been evicted");
    }

    #[test]
    fn failure_returns_empty_and_is_not_cached() {
        let registry = registry();
        let source = FakeSource::failing();

        assert!(registry.get_fields(1, &source).is_empty());
        assert!(registry.is_empty());
        registry.get_fields(1, &source);
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn concurrent_access_is_safe() {
        let registry = Arc::new(registry());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let source = FakeSource::new(&["Ext_OCR_Result"]);
                    for _ in 0..50 {
                        assert_eq!(registry.get_fields(i % 3, &source).len(), 1);
                        registry.invalidate(Some(i % 3));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(registry.len() <= 3);
    }
}
