use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// The platform call that actually warms an image URI. Injected so the cache
/// stays testable and the UI layer can plug in whatever prefetch primitive it
/// has.
pub trait Prefetcher: Send + Sync {
    /// Returns true when the URI was fetched and is safe to record as warm.
    fn prefetch(&self, uri: &str) -> bool;
}

/// Prefetcher that accepts everything without doing work, for callers that
/// only want the dedup behavior.
pub struct NoPrefetch;

impl Prefetcher for NoPrefetch {
    fn prefetch(&self, _uri: &str) -> bool {
        true
    }
}

/// Process-lifetime memo of already-prefetched image URIs. Unbounded on
/// purpose: it only ever holds the distinct images seen during one app
/// session.
pub struct ImageCache {
    prefetcher: Box<dyn Prefetcher>,
    cached: Mutex<HashMap<String, String>>,
}

impl ImageCache {
    pub fn new(prefetcher: Box<dyn Prefetcher>) -> Self {
        Self {
            prefetcher,
            cached: Mutex::new(HashMap::new()),
        }
    }

    /// Warm a URI. A second call for the same URI is a cache hit and never
    /// reaches the prefetcher; a failed prefetch is not recorded, so the next
    /// call retries.
    pub fn preload(&self, uri: &str) -> bool {
        if self.entries().contains_key(uri) {
            return true;
        }
        if self.prefetcher.prefetch(uri) {
            self.entries().insert(uri.to_string(), uri.to_string());
            true
        } else {
            false
        }
    }

    /// Synchronous lookup; `None` means the URI was never warmed.
    pub fn cached_uri(&self, uri: &str) -> Option<String> {
        self.entries().get(uri).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.cached.lock().unwrap_or_else(|err| err.into_inner())
    }
}
