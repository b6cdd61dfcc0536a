//! Argument View
//!
//! Read-only view over the tagged value cells of one call. Reads are
//! idempotent and side-effect free; any slot may be coerced repeatedly,
//! unlike the write-once result slot.

use std::any::Any;
use std::sync::Arc;

use crate::coerce::FromScript;
use crate::error::ValueError;
use crate::value::ScriptValue;

/// Role of the arguments in the current callback. Used only to format
/// coercion error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    PropertyValue,
    MethodArg,
    FunctionArg,
}

impl ArgKind {
    pub fn subject(&self) -> &'static str {
        match self {
            ArgKind::PropertyValue => "property",
            ArgKind::MethodArg => "method parameter",
            ArgKind::FunctionArg => "function parameter",
        }
    }
}

/// Borrowed view over the argument cells of one invocation.
///
/// Valid only for the duration of the current callback.
#[derive(Clone, Copy)]
pub struct Args<'a> {
    slots: &'a [ScriptValue],
    kind: ArgKind,
}

impl<'a> Args<'a> {
    pub fn new(slots: &'a [ScriptValue], kind: ArgKind) -> Self {
        Self { slots, kind }
    }

    pub fn kind(&self) -> ArgKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Raw slot access. Out-of-range reads observe `undefined`, matching
    /// script call semantics for missing arguments.
    pub fn slot(&self, index: usize) -> &ScriptValue {
        self.slots.get(index).unwrap_or(&ScriptValue::Undefined)
    }

    /// Attempt to coerce one argument. Never fails loudly; `None` means
    /// no coercion path exists.
    pub fn try_get<T: FromScript>(&self, index: usize) -> Option<T> {
        T::from_script(self.slot(index))
    }

    /// Coerce one argument or fail with a descriptive error naming the
    /// property / method parameter / function parameter.
    pub fn get<T: FromScript>(&self, index: usize, name: &str) -> Result<T, ValueError> {
        self.try_get(index).ok_or_else(|| ValueError::InvalidArgument {
            kind: self.kind,
            name: name.to_owned(),
        })
    }

    /// Downcast a host-object argument to a concrete host type — the
    /// "directly assignable" fallback of the generic coercion cascade.
    pub fn try_get_host<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
        self.slot(index).as_host().and_then(|h| h.downcast_arc())
    }

    /// Script truthiness of one argument.
    pub fn is_truthy(&self, index: usize) -> bool {
        self.slot(index).is_truthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{HostRef, ObjectRef};

    #[test]
    fn test_reads_are_idempotent() {
        let slots = [ScriptValue::Number(3.0)];
        let args = Args::new(&slots, ArgKind::MethodArg);
        for _ in 0..3 {
            assert_eq!(args.try_get::<u8>(0), Some(3));
            assert_eq!(args.try_get::<f64>(0), Some(3.0));
        }
    }

    #[test]
    fn test_missing_argument_reads_undefined() {
        let args = Args::new(&[], ArgKind::FunctionArg);
        assert!(args.slot(0).is_undefined());
        assert_eq!(args.try_get::<i32>(0), None);
        // Nullable targets absorb the missing argument.
        assert_eq!(args.try_get::<Option<i32>>(0), Some(None));
    }

    #[test]
    fn test_get_names_the_argument() {
        let slots = [ScriptValue::from("not a number")];
        let args = Args::new(&slots, ArgKind::MethodArg);
        let err = args.get::<i32>(0, "offset").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value specified for method parameter 'offset'"
        );

        let args = Args::new(&slots, ArgKind::PropertyValue);
        let err = args.get::<i32>(0, "count").unwrap_err();
        assert_eq!(err.to_string(), "Invalid value specified for property 'count'");
    }

    #[test]
    fn test_host_downcast_fallback() {
        #[derive(Debug, PartialEq)]
        struct Widget(u32);

        let slots = [ScriptValue::Object(ObjectRef::Host(HostRef::new(Widget(9))))];
        let args = Args::new(&slots, ArgKind::FunctionArg);
        let widget = args.try_get_host::<Widget>(0).unwrap();
        assert_eq!(*widget, Widget(9));
        assert!(args.try_get_host::<String>(0).is_none());
    }

    #[test]
    fn test_truthiness_helper() {
        let slots = [ScriptValue::Number(0.0), ScriptValue::from("x")];
        let args = Args::new(&slots, ArgKind::FunctionArg);
        assert!(!args.is_truthy(0));
        assert!(args.is_truthy(1));
        assert!(!args.is_truthy(5));
    }
}
