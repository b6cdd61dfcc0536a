//! Host Object Capabilities
//!
//! The erased, engine-facing contract a configured host type provides.
//! The adapter consumes this; concrete types never implement it by hand
//! — they get it by building a [`TypeConfiguration`](crate::TypeConfiguration).

use std::sync::Arc;

use bitflags::bitflags;
use keel_value::{Args, HostRef, ResultSlot};

use crate::enumerate::{AsyncHostEnumerator, HostEnumerator};
use crate::error::HostError;

bitflags! {
    /// Result of a property query.
    ///
    /// Derived invariants: `WRITABLE` is present iff a setter was
    /// registered; `DELETABLE` is never set for statically configured
    /// properties; `CACHEABLE` is only valid without a setter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PropertyFlags: u8 {
        const AVAILABLE  = 1 << 0;
        const CACHEABLE  = 1 << 1;
        const ENUMERABLE = 1 << 2;
        const WRITABLE   = 1 << 3;
        const DELETABLE  = 1 << 4;
    }
}

/// How an invocable target expects to be called. Selects the argument
/// role used in error messages and the constructor-call policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Method,
    Function,
}

/// Invocation capability of a host type.
pub struct InvokerSpec {
    pub kind: InvokeKind,
    pub required_args: usize,
    /// Only function targets may opt into constructor-style invocation.
    pub constructible: bool,
    pub invoke: Arc<dyn Fn(&HostRef, &Args<'_>, &mut ResultSlot<'_>) -> Result<(), HostError> + Send + Sync>,
}

impl std::fmt::Debug for InvokerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokerSpec")
            .field("kind", &self.kind)
            .field("required_args", &self.required_args)
            .field("constructible", &self.constructible)
            .finish_non_exhaustive()
    }
}

/// Uniform host-object operations the adapter dispatches against.
///
/// `target` is always the instance the adapter was created for; the
/// implementation downcasts it to the concrete type it was built for.
pub trait HostOps: Send + Sync + 'static {
    /// Run the registered getter for `name` into `ret`. `Ok(true)` if
    /// the name is statically configured, `Ok(false)` if unknown.
    fn get_property(
        &self,
        target: &HostRef,
        name: &str,
        ret: &mut ResultSlot<'_>,
    ) -> Result<bool, HostError>;

    /// Run the registered setter for `name`. `Ok(false)` if the name is
    /// unknown; `PropertyReadOnly` if configured without a setter.
    fn set_property(&self, target: &HostRef, name: &str, args: &Args<'_>) -> Result<bool, HostError>;

    /// Flags for a statically configured name; empty if unknown.
    fn query_property(&self, name: &str) -> PropertyFlags;

    /// Statically configured names registered as enumerable.
    fn enumerable_names(&self) -> Vec<Arc<str>>;

    /// Whether instances carry the per-instance dynamic overlay.
    fn supports_dynamic_properties(&self) -> bool {
        false
    }

    /// Whether overlay indices participate in name enumeration.
    fn enumerates_indexed_properties(&self) -> bool {
        false
    }

    /// Invocation capability, if the type itself is callable.
    fn invoker(&self) -> Option<&InvokerSpec> {
        None
    }

    fn create_enumerator(
        &self,
        target: &HostRef,
    ) -> Result<Option<Box<dyn HostEnumerator>>, HostError>;

    fn create_async_enumerator(
        &self,
        target: &HostRef,
    ) -> Result<Option<Box<dyn AsyncHostEnumerator>>, HostError>;
}
