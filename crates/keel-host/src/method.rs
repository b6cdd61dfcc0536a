//! Bound Methods
//!
//! A method fetch produces a small callable wrapper binding the target
//! instance to the registered invoker. A fresh wrapper is allocated per
//! fetch; the `CACHEABLE` property flag lets the engine elide repeats.

use std::fmt;
use std::sync::Arc;

use keel_value::{Args, HostRef, ResultSlot};

use crate::error::HostError;

/// Erased method body: `(bound target, arguments, result slot)`.
pub type MethodInvoker =
    Arc<dyn Fn(&HostRef, &Args<'_>, &mut ResultSlot<'_>) -> Result<(), HostError> + Send + Sync>;

/// A host method bound to its target instance.
pub struct BoundMethod {
    target: HostRef,
    name: Arc<str>,
    required_args: usize,
    invoker: MethodInvoker,
}

impl BoundMethod {
    pub fn new(target: HostRef, name: Arc<str>, required_args: usize, invoker: MethodInvoker) -> Self {
        Self { target, name, required_args, invoker }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_args(&self) -> usize {
        self.required_args
    }

    pub fn target(&self) -> &HostRef {
        &self.target
    }

    /// Invoke against the bound target. Checks arity first; the invoker
    /// itself never runs on a shortfall.
    pub fn invoke(&self, args: &Args<'_>, ret: &mut ResultSlot<'_>) -> Result<(), HostError> {
        if args.len() < self.required_args {
            return Err(HostError::TooFewArguments {
                name: self.name.to_string(),
                required: self.required_args,
                supplied: args.len(),
            });
        }
        (self.invoker)(&self.target, args, ret)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("name", &self.name)
            .field("required_args", &self.required_args)
            .finish_non_exhaustive()
    }
}
