//! Host-layer errors

use keel_value::ValueError;

/// Errors raised while dispatching engine callbacks against host
/// objects. All of these surface synchronously from the callback that
/// detected them; nothing is retried or suppressed.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error(transparent)]
    Value(#[from] ValueError),

    /// A capability is absent for the requested operation.
    #[error("operation not supported: {0}")]
    NotSupported(&'static str),

    /// Configuration-state violation or mispositioned enumerator access.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// Arity check failure for a method or function call.
    #[error("too few arguments specified for '{name}': {required} required, {supplied} supplied")]
    TooFewArguments {
        name: String,
        required: usize,
        supplied: usize,
    },

    /// Assignment to a statically configured property with no setter.
    #[error("property '{0}' is read-only")]
    PropertyReadOnly(String),
}
