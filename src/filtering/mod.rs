// DANS : src/filtering/mod.rs

pub mod cache;
pub mod lru;

pub use cache::MemoryRegistry;
pub use lru::BoundedRegistry;

/// L'ensemble des pools déjà notifiés pendant la vie du processus.
///
/// `has` prend `&mut self` : une implémentation bornée peut rafraîchir la récence
/// d'une entrée consultée. La boucle de polling est séquentielle, aucun verrou n'est
/// nécessaire ; `Send` suffit pour qu'elle tourne sur n'importe quel worker tokio.
pub trait DedupRegistry: Send {
    fn has(&mut self, pool_id: &str) -> bool;
    /// Idempotent.
    fn add(&mut self, pool_id: &str);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Nom court pour les logs.
    fn kind(&self) -> &'static str;
}

/// `capacity == 0` : registre illimité (comportement de référence).
pub fn build_registry(capacity: usize) -> Box<dyn DedupRegistry> {
    if capacity == 0 {
        Box::new(MemoryRegistry::new())
    } else {
        Box::new(BoundedRegistry::new(capacity))
    }
}
