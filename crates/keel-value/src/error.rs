//! Value-layer errors

use crate::args::ArgKind;

/// Errors raised by the tagged-value ABI itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// A result slot was written twice. Programming error in the invoked
    /// callback; always surfaced, never swallowed.
    #[error("the result value has already been set")]
    AlreadySet,

    /// A required coercion failed. The message names the offending
    /// argument and its role, which is load-bearing for debuggability.
    #[error("Invalid value specified for {} '{name}'", .kind.subject())]
    InvalidArgument { kind: ArgKind, name: String },
}
