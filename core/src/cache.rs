//! Identity map of resources seen by one session.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::document::{ResourceDocument, ResourceId};

/// Thread-safe map from resource id to the last known document.
///
/// Every operation takes the lock for a single entry access, so readers never
/// observe a half-written document. A panic while holding the lock cannot
/// leave a partial entry behind, so poisoning is ignored and cache
/// operations never fail.
#[derive(Debug, Default)]
pub struct ResourceCache {
    entries: RwLock<HashMap<ResourceId, ResourceDocument>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs or replaces the entry for `id`.
    pub fn put(&self, id: ResourceId, document: ResourceDocument) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, document);
    }

    /// Returns a copy of the cached document; never fetches.
    pub fn get(&self, id: &ResourceId) -> Option<ResourceDocument> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Reads through the cached document without cloning it.
    pub fn read<R>(&self, id: &ResourceId, f: impl FnOnce(&ResourceDocument) -> R) -> Option<R> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(f)
    }

    /// Mutates the cached document in place under the write lock. Returns
    /// `None` when `id` is not cached.
    pub fn update<R>(&self, id: &ResourceId, f: impl FnOnce(&mut ResourceDocument) -> R) -> Option<R> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(id)
            .map(f)
    }

    /// Removes the entry for `id`. Evicting an absent id is a no-op.
    pub fn evict(&self, id: &ResourceId) -> Option<ResourceDocument> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
