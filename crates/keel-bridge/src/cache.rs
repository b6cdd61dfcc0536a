//! Adapter Cache
//!
//! One adapter per distinct `(target identity, flags)` pair, held
//! weakly per engine instance so repeated exposure of the same host
//! object reuses one adapter. Stale entries are pruned opportunistically
//! during lookups once enough of them accumulate — there is no
//! dedicated sweep.

use std::sync::{Arc, Weak};

use keel_value::{HostRef, WeakHostRef};
use parking_lot::Mutex;

use crate::adapter::{HostItem, ItemFlags};
use crate::engine::ScriptEngine;
use keel_host::{ConfigRegistry, HostError};

/// Stale entries tolerated before a lookup prunes the list. A tunable,
/// not an invariant.
const PRUNE_THRESHOLD: usize = 4;

struct CacheEntry {
    target: WeakHostRef,
    flags: ItemFlags,
    item: Weak<HostItem>,
}

impl CacheEntry {
    fn is_stale(&self) -> bool {
        !self.target.is_alive() || self.item.strong_count() == 0
    }
}

/// Per-engine adapter cache.
#[derive(Default)]
pub struct AdapterCache {
    entries: Mutex<Vec<CacheEntry>>,
}

impl AdapterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the adapter for `(target, flags)`, creating and caching it
    /// on a miss. Differing flags for the same target yield a separate
    /// adapter.
    pub fn get_or_create(
        &self,
        engine: &Arc<dyn ScriptEngine>,
        registry: &ConfigRegistry,
        target: &HostRef,
        flags: ItemFlags,
    ) -> Result<Arc<HostItem>, HostError> {
        let mut entries = self.entries.lock();

        let stale = entries.iter().filter(|e| e.is_stale()).count();
        if stale > PRUNE_THRESHOLD {
            entries.retain(|e| !e.is_stale());
            tracing::debug!(pruned = stale, "pruned stale adapter cache entries");
        }

        for entry in entries.iter() {
            if entry.flags == flags && entry.target.refers_to(target) {
                if let Some(item) = entry.item.upgrade() {
                    return Ok(item);
                }
            }
        }

        let item = Arc::new(HostItem::new(engine.clone(), registry, target.clone(), flags)?);
        entries.push(CacheEntry {
            target: target.downgrade(),
            flags,
            item: Arc::downgrade(&item),
        });
        Ok(item)
    }

    /// Entries currently tracked, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
