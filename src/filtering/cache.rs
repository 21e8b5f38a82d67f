// DANS : src/filtering/cache.rs

use super::DedupRegistry;
use std::collections::HashSet;

/// Registre en mémoire, sans éviction : il grossit pendant toute la durée du run
/// et disparaît au redémarrage.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    seen: HashSet<String>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DedupRegistry for MemoryRegistry {
    fn has(&mut self, pool_id: &str) -> bool {
        self.seen.contains(pool_id)
    }

    fn add(&mut self, pool_id: &str) {
        if !self.seen.contains(pool_id) {
            self.seen.insert(pool_id.to_string());
        }
    }

    fn len(&self) -> usize {
        self.seen.len()
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
