//! Dynamic Property Overlay
//!
//! Per-instance sparse maps (named and indexed) layered under a type's
//! static configuration, for host types that support ad hoc fields.
//! Entries are ordinary value slots; no arity or type constraints.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use keel_value::ScriptValue;

#[derive(Debug, Default)]
pub struct DynamicOverlay {
    named: HashMap<Arc<str>, ScriptValue>,
    indexed: BTreeMap<u32, ScriptValue>,
}

impl DynamicOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_named(&self, name: &str) -> Option<&ScriptValue> {
        self.named.get(name)
    }

    pub fn set_named(&mut self, name: Arc<str>, value: ScriptValue) {
        self.named.insert(name, value);
    }

    /// Reports whether an entry was actually removed.
    pub fn delete_named(&mut self, name: &str) -> bool {
        self.named.remove(name).is_some()
    }

    pub fn has_named(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    pub fn names(&self) -> Vec<Arc<str>> {
        self.named.keys().cloned().collect()
    }

    pub fn get_index(&self, index: u32) -> Option<&ScriptValue> {
        self.indexed.get(&index)
    }

    pub fn set_index(&mut self, index: u32, value: ScriptValue) {
        self.indexed.insert(index, value);
    }

    pub fn delete_index(&mut self, index: u32) -> bool {
        self.indexed.remove(&index).is_some()
    }

    pub fn has_index(&self, index: u32) -> bool {
        self.indexed.contains_key(&index)
    }

    /// Occupied indices in ascending order.
    pub fn indices(&self) -> Vec<u32> {
        self.indexed.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.indexed.is_empty()
    }
}
