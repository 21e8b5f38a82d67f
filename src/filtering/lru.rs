// DANS : src/filtering/lru.rs

use super::DedupRegistry;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Registre borné : quand la capacité est atteinte, l'entrée la moins récemment vue
/// est évincée. Un pool évincé puis revu très longtemps après serait notifié une seconde fois.
#[derive(Debug)]
pub struct BoundedRegistry {
    cache: LruCache<String, ()>,
}

impl BoundedRegistry {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self { cache: LruCache::new(capacity) }
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

impl DedupRegistry for BoundedRegistry {
    fn has(&mut self, pool_id: &str) -> bool {
        // `get` rafraîchit la récence.
        self.cache.get(pool_id).is_some()
    }

    fn add(&mut self, pool_id: &str) {
        self.cache.put(pool_id.to_string(), ());
    }

    fn len(&self) -> usize {
        self.cache.len()
    }

    fn kind(&self) -> &'static str {
        "lru"
    }
}
