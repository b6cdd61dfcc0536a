//! Configuration Registry
//!
//! Maps a stable type identity to its immutable configuration table.
//! Each entry moves through a one-way lifecycle guarded by an atomic
//! compare-and-swap: `Unconfigured -> Configuring -> Configured`, with
//! rollback to `Unconfigured` when the configurator fails. After that,
//! all reads are lock-free.

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use keel_value::HostRef;

use crate::config::{TypeConfiguration, TypeConfigurator};
use crate::error::HostError;

const UNCONFIGURED: u8 = 0;
const CONFIGURING: u8 = 1;
const CONFIGURED: u8 = 2;

#[derive(Default)]
struct RegistryEntry {
    state: AtomicU8,
    ops: OnceLock<Arc<TypeConfiguration>>,
}

/// Explicit, shareable handle to the per-type configuration tables.
///
/// Clones share the same underlying registry.
#[derive(Clone, Default)]
pub struct ConfigRegistry {
    entries: Arc<DashMap<TypeId, Arc<RegistryEntry>>>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the one-time configurator for `T`.
    ///
    /// Exactly one caller wins the configuration window; re-entrant or
    /// concurrent attempts fail immediately with `InvalidOperation`
    /// rather than blocking. A failing configurator rolls the state
    /// back so a later attempt may succeed.
    pub fn configure<T, F>(&self, configure: F) -> Result<(), HostError>
    where
        T: Any + Send + Sync,
        F: FnOnce(&mut TypeConfigurator<T>) -> Result<(), HostError>,
    {
        let entry = self
            .entries
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Arc::new(RegistryEntry::default()))
            .clone();

        entry
            .state
            .compare_exchange(UNCONFIGURED, CONFIGURING, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                HostError::InvalidOperation("the type is already configured or being configured")
            })?;

        let mut configurator = TypeConfigurator::<T>::new();
        match configure(&mut configurator) {
            Ok(()) => {
                let table = Arc::new(configurator.finish());
                // Only the CAS winner reaches this point, so the cell
                // cannot already hold a table.
                let _ = entry.ops.set(table);
                entry.state.store(CONFIGURED, Ordering::Release);
                tracing::debug!(host_type = std::any::type_name::<T>(), "host type configured");
                Ok(())
            }
            Err(err) => {
                entry.state.store(UNCONFIGURED, Ordering::Release);
                Err(err)
            }
        }
    }

    pub fn is_configured<T: Any>(&self) -> bool {
        self.lookup(TypeId::of::<T>()).is_some()
    }

    /// Lock-free read of a configured table.
    pub fn lookup(&self, type_id: TypeId) -> Option<Arc<TypeConfiguration>> {
        let entry = self.entries.get(&type_id)?;
        if entry.state.load(Ordering::Acquire) == CONFIGURED {
            entry.ops.get().cloned()
        } else {
            None
        }
    }

    /// Table for the concrete type behind a host reference.
    pub fn lookup_for(&self, target: &HostRef) -> Option<Arc<TypeConfiguration>> {
        self.lookup(target.as_any().type_id())
    }
}
