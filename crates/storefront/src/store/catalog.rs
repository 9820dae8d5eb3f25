//! Product catalog, split by product kind.

use bubblemart_core::{Product, ProductId, ProductKind};

use super::EntityStore;

/// Gift and log products live in separate collections, each with its own
/// fetch error and paging state.
#[derive(Clone, Default)]
pub struct Catalog {
    gifts: EntityStore<Product>,
    logs: EntityStore<Product>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection holding products of `kind`.
    #[must_use]
    pub const fn for_kind(&self, kind: ProductKind) -> &EntityStore<Product> {
        match kind {
            ProductKind::Gift => &self.gifts,
            ProductKind::Log => &self.logs,
        }
    }

    /// Look a product up in either collection.
    #[must_use]
    pub fn find(&self, id: &ProductId) -> Option<Product> {
        self.gifts.get(id).or_else(|| self.logs.get(id))
    }

    /// Replace a product wherever it is already listed; otherwise add it to
    /// the collection of its kind.
    pub fn upsert(&self, product: Product) {
        let other = match product.kind {
            ProductKind::Gift => &self.logs,
            ProductKind::Log => &self.gifts,
        };
        other.remove(&product.id);
        self.for_kind(product.kind).upsert(product);
    }

    /// Remove a product from both collections.
    pub fn remove(&self, id: &ProductId) {
        self.gifts.remove(id);
        self.logs.remove(id);
    }

    pub fn clear(&self) {
        self.gifts.clear();
        self.logs.clear();
    }
}
