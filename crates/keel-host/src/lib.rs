//! Keel host object model
//!
//! The contract a host-exposed type provides to the script engine, and
//! the machinery that builds it: a per-type configuration registered
//! once and shared immutably across every instance, a per-instance
//! dynamic property overlay, bound method objects, and the enumerator
//! bridges.
//!
//! Types gain capabilities by registering a configuration, not by
//! inheriting from a base: the configuration is the capability provider.

mod capability;
mod config;
mod enumerate;
mod error;
mod method;
mod overlay;
mod registry;

pub use capability::{HostOps, InvokeKind, InvokerSpec, PropertyFlags};
pub use config::{TypeConfiguration, TypeConfigurator};
pub use enumerate::{
    AsyncHostEnumerator, HostEnumerator, IterEnumerator, StreamEnumerator, SyncToAsyncEnumerator,
};
pub use error::HostError;
pub use method::{BoundMethod, MethodInvoker};
pub use overlay::DynamicOverlay;
pub use registry::ConfigRegistry;
