//! In-process fiscal profile cache.
//!
//! Entries are keyed by supplier and live until explicitly invalidated.
//! Reads take a shared `parking_lot` lock and never wait on an in-flight
//! registry lookup.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use wht_core::{FiscalProfile, SupplierId};

#[derive(Debug, Clone, Default)]
pub struct ProfileCache {
    entries: Arc<RwLock<HashMap<SupplierId, FiscalProfile>>>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &SupplierId) -> Option<FiscalProfile> {
        self.entries.read().get(id).cloned()
    }

    pub fn insert(&self, profile: FiscalProfile) {
        self.entries
            .write()
            .insert(profile.supplier_id.clone(), profile);
    }

    /// Evict one supplier. Returns whether it was cached.
    pub fn invalidate(&self, id: &SupplierId) -> bool {
        self.entries.write().remove(id).is_some()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
