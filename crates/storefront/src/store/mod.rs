//! Observable entity stores.
//!
//! Each store holds the last-known-good server state of one collection and
//! publishes an immutable [`Collection`] snapshot on every mutation. Views
//! subscribe through a `tokio::sync::watch` receiver.
//!
//! Merge rules:
//! - No two entities in a collection share an id.
//! - A later write for an id replaces the earlier one, unless the entity type
//!   overrides [`Entity::reconcile`] (cart lines keep the larger quantity).

mod cart;
mod catalog;

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use bubblemart_core::{
    LogCredential, LogId, Order, OrderId, Pagination, Payment, PaymentId, Product, ProductId,
    User, UserId,
};
use tokio::sync::watch;

pub use cart::{CartItem, LinePhase};
pub use catalog::Catalog;

// =============================================================================
// Entity
// =============================================================================

/// Something a store can hold.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Debug + Send + Sync;

    fn id(&self) -> &Self::Id;

    /// Resolve two versions of the same entity. The incoming one wins by default.
    #[must_use]
    fn reconcile(_existing: &Self, incoming: Self) -> Self {
        incoming
    }

    /// When true, `set_all` merges into the current items instead of
    /// replacing them.
    const ADDITIVE_SET_ALL: bool = false;
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &ProductId {
        &self.id
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &OrderId {
        &self.id
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }
}

impl Entity for Payment {
    type Id = PaymentId;

    fn id(&self) -> &PaymentId {
        &self.id
    }
}

impl Entity for LogCredential {
    type Id = LogId;

    fn id(&self) -> &LogId {
        &self.id
    }
}

// =============================================================================
// Collection
// =============================================================================

/// Snapshot of a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T> {
    /// `None` until the first successful fetch; `Some(vec![])` means fetched and empty.
    pub items: Option<Vec<T>>,
    /// Message from the last failed fetch.
    pub error: Option<String>,
    /// A next-page fetch is in progress.
    pub loading_next: bool,
    /// Paging info from the last list response.
    pub pagination: Option<Pagination>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: None,
            error: None,
            loading_next: false,
            pagination: None,
        }
    }
}

impl<T> Collection<T> {
    /// Whether the first fetch has completed.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.items.is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.as_ref().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().flatten()
    }

    /// Page to request next, if the server reported one.
    #[must_use]
    pub fn next_page(&self) -> Option<u32> {
        self.pagination.as_ref().and_then(Pagination::next_page)
    }
}

impl<T: Entity> Collection<T> {
    #[must_use]
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.iter().find(|item| item.id() == id)
    }
}

// =============================================================================
// EntityStore
// =============================================================================

/// An observable, deduplicating collection of `T`.
///
/// Clones share the same underlying state.
pub struct EntityStore<T: Entity> {
    tx: Arc<watch::Sender<Collection<T>>>,
}

impl<T: Entity> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: Entity> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntityStore<T> {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Collection::default());
        Self { tx: Arc::new(tx) }
    }

    /// Receive a snapshot on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Collection<T>> {
        self.tx.subscribe()
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Collection<T> {
        self.tx.borrow().clone()
    }

    /// Current items, `None` if never fetched.
    #[must_use]
    pub fn items(&self) -> Option<Vec<T>> {
        self.tx.borrow().items.clone()
    }

    #[must_use]
    pub fn get(&self, id: &T::Id) -> Option<T> {
        self.tx.borrow().get(id).cloned()
    }

    /// Store the result of a list fetch.
    ///
    /// Replaces the items (deduplicated) unless `T::ADDITIVE_SET_ALL`, in
    /// which case they are merged into the existing ones. Clears the error and
    /// the loading flag.
    pub fn set_all(&self, items: Vec<T>) {
        self.tx.send_modify(|c| {
            let base = if T::ADDITIVE_SET_ALL {
                c.items.take().unwrap_or_default()
            } else {
                Vec::new()
            };
            c.items = Some(merge(base, items));
            c.error = None;
            c.loading_next = false;
        });
    }

    /// Store the first page of a list fetch along with its paging info.
    pub fn set_page(&self, items: Vec<T>, pagination: Option<Pagination>) {
        self.tx.send_modify(|c| {
            let base = if T::ADDITIVE_SET_ALL {
                c.items.take().unwrap_or_default()
            } else {
                Vec::new()
            };
            c.items = Some(merge(base, items));
            c.error = None;
            c.loading_next = false;
            c.pagination = pagination;
        });
    }

    /// Merge a further page into the current items.
    pub fn merge_all(&self, items: Vec<T>) {
        self.tx.send_modify(|c| {
            let base = c.items.take().unwrap_or_default();
            c.items = Some(merge(base, items));
            c.error = None;
            c.loading_next = false;
        });
    }

    /// Merge a further page and record its paging info.
    pub fn merge_page(&self, items: Vec<T>, pagination: Option<Pagination>) {
        self.tx.send_modify(|c| {
            let base = c.items.take().unwrap_or_default();
            c.items = Some(merge(base, items));
            c.error = None;
            c.loading_next = false;
            c.pagination = pagination;
        });
    }

    /// Record a fetch failure (or clear it with `None`).
    pub fn set_error(&self, error: Option<String>) {
        self.tx.send_modify(|c| {
            c.error = error;
            c.loading_next = false;
        });
    }

    /// Mark a next-page fetch as started.
    pub fn begin_fetch_next(&self) {
        self.tx.send_modify(|c| {
            c.loading_next = true;
            c.error = None;
        });
    }

    /// Replace the entity with the same id, or append it.
    pub fn upsert(&self, item: T) {
        self.tx.send_modify(|c| {
            let items = c.items.get_or_insert_with(Vec::new);
            if let Some(slot) = items.iter_mut().find(|i| i.id() == item.id()) {
                *slot = T::reconcile(slot, item);
            } else {
                items.push(item);
            }
        });
    }

    /// Insert at the front, dropping any existing entity with the same id.
    pub fn prepend(&self, item: T) {
        self.tx.send_modify(|c| {
            let items = c.items.get_or_insert_with(Vec::new);
            items.retain(|i| i.id() != item.id());
            items.insert(0, item);
        });
    }

    /// Remove by id. Returns whether anything was removed.
    pub fn remove(&self, id: &T::Id) -> bool {
        let mut removed = false;
        self.tx.send_if_modified(|c| {
            if let Some(items) = c.items.as_mut() {
                let before = items.len();
                items.retain(|i| i.id() != id);
                removed = items.len() != before;
            }
            removed
        });
        removed
    }

    /// Mutate one entity in place. Returns whether it was found.
    ///
    /// Bypasses [`Entity::reconcile`].
    pub fn update(&self, id: &T::Id, f: impl FnOnce(&mut T)) -> bool {
        let mut found = false;
        self.tx.send_if_modified(|c| {
            if let Some(item) = c.items.iter_mut().flatten().find(|i| i.id() == id) {
                f(item);
                found = true;
            }
            found
        });
        found
    }

    /// Reset to the initial, not-yet-fetched state.
    pub fn clear(&self) {
        self.tx.send_replace(Collection::default());
    }
}

/// Deduplicate `base ++ incoming` by id, keeping first-appearance order and
/// resolving collisions with [`Entity::reconcile`].
fn merge<T: Entity>(base: Vec<T>, incoming: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(base.len() + incoming.len());
    let mut index: HashMap<T::Id, usize> = HashMap::new();

    for item in base.into_iter().chain(incoming) {
        if let Some(&at) = index.get(item.id()) {
            if let Some(slot) = out.get_mut(at) {
                *slot = T::reconcile(slot, item);
            }
        } else {
            index.insert(item.id().clone(), out.len());
            out.push(item);
        }
    }
    out
}
