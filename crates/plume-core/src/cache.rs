//! Per-pass cache of factory results.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::context::Value;
use crate::dependency::FactoryId;

/// Factory identity → computed value, scoped to one top-level resolution.
///
/// Lookups and inserts are individually atomic, but nothing holds the lock
/// while a factory runs: two concurrent resolutions of the same factory can
/// both miss and both insert. The later insert wins.
#[derive(Default)]
pub struct ResolutionCache {
    entries: Mutex<HashMap<FactoryId, Value>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached value for `id`.
    pub fn get(&self, id: FactoryId) -> Option<Value> {
        self.entries.lock().get(&id).cloned()
    }

    /// Stores the value computed by factory `id`.
    pub fn insert(&self, id: FactoryId, value: Value) {
        self.entries.lock().insert(id, value);
    }

    pub fn contains(&self, id: FactoryId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl std::fmt::Debug for ResolutionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("ResolutionCache")
            .field(
                "factories",
                &entries.keys().map(FactoryId::name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
