//! Keel bridge layer
//!
//! The engine-facing surface of the fast host-object marshaling path:
//! the host item adapter that receives raw engine callbacks, the
//! property-name intern pool behind it, the per-engine adapter cache,
//! and the narrow collaborator interface to the script engine itself.

mod adapter;
mod cache;
mod engine;
mod intern;

pub use adapter::{HostItem, ItemFlags};
pub use cache::AdapterCache;
pub use engine::{ScriptEngine, StubEngine};
pub use intern::{NamePool, NameSource, intern};
