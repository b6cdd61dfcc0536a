//! Keel tagged value ABI
//!
//! The fundamental unit of the host/engine boundary: a tagged value cell
//! that holds exactly one script-visible value, plus the read/write views
//! layered on top of it.
//!
//! - `ScriptValue` — the tagged value itself
//! - `ResultSlot` — write-once view used to return a value to the engine
//! - `Args` — read-only view over call arguments with lazy coercion
//! - `NumericTarget` / `FromScript` / `IntoScript` — the coercion engine

mod args;
mod coerce;
mod error;
mod policy;
mod result;
mod value;

pub use args::{ArgKind, Args};
pub use coerce::{FromScript, NumericTarget, coerce_numeric};
pub use error::ValueError;
pub use policy::{Int64Mode, MarshalPolicy};
pub use result::{IntoScript, ResultSlot};
pub use value::{HostRef, ObjectRef, ScriptDate, ScriptHandle, ScriptValue, WeakHostRef};

pub use num_bigint::BigInt;
