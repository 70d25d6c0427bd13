//! Short-lived attribute cache keyed by normalized path.
//!
//! Directory listings populate it opportunistically so that the stat storm
//! following a readdir does not hit the document store once per entry. Every
//! value is re-derivable from the store; losing the cache only costs time.

use crate::attr::Attributes;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(2);

struct Entry {
    attr: Attributes,
    expires_at: Instant,
}

pub struct AttributeCache {
    ttl: Duration,
    entries: HashMap<String, Entry>,
}

impl AttributeCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Lookup; expired entries are swept first so a stale value can never be
    /// returned.
    pub fn get(&mut self, path: &str) -> Option<Attributes> {
        self.sweep();
        self.entries.get(path).map(|e| e.attr)
    }

    /// Insert or overwrite, resetting the expiry.
    pub fn put(&mut self, path: &str, attr: Attributes) {
        self.sweep();
        self.entries.insert(
            path.to_string(),
            Entry {
                attr,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    pub fn remove(&mut self, path: &str) {
        self.entries.remove(path);
    }

    /// Lazy expiration: there is no background timer, so every read or write
    /// drops whatever has aged out.
    fn sweep(&mut self) {
        let now = Instant::now();
        self.entries.retain(|_, e| e.expires_at > now);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.len()
    }
}
