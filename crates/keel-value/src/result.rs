//! Result Slot
//!
//! Write-once view over a caller-allocated tagged value cell, used to
//! return a value from a property getter, method, or function call. The
//! cell transitions `Nonexistent -> one concrete variant` exactly once;
//! a second write is a contract violation.

use std::sync::Arc;

use num_bigint::BigInt;

use crate::error::ValueError;
use crate::policy::MarshalPolicy;
use crate::value::{HostRef, ObjectRef, ScriptDate, ScriptHandle, ScriptValue};

/// Conversion from a host value into the tagged boundary representation.
///
/// Dispatch is closed-form over the known primitive set and resolved at
/// compile time; anything outside it is marshaled through the generic
/// host-object path (`ResultSlot::set_host`).
pub trait IntoScript {
    fn into_script(self, policy: &MarshalPolicy) -> ScriptValue;
}

impl IntoScript for ScriptValue {
    fn into_script(self, _policy: &MarshalPolicy) -> ScriptValue {
        self
    }
}

impl IntoScript for bool {
    fn into_script(self, _policy: &MarshalPolicy) -> ScriptValue {
        ScriptValue::Bool(self)
    }
}

macro_rules! small_int_into_script {
    ($($ty:ty),* $(,)?) => {$(
        impl IntoScript for $ty {
            fn into_script(self, _policy: &MarshalPolicy) -> ScriptValue {
                ScriptValue::Number(f64::from(self))
            }
        }
    )*};
}

small_int_into_script!(i8, i16, i32, u8, u16, u32, f32);

impl IntoScript for f64 {
    fn into_script(self, _policy: &MarshalPolicy) -> ScriptValue {
        ScriptValue::Number(self)
    }
}

impl IntoScript for i64 {
    fn into_script(self, policy: &MarshalPolicy) -> ScriptValue {
        if policy.int64_mode.wants_bigint(self.unsigned_abs()) {
            ScriptValue::BigInt(BigInt::from(self))
        } else {
            ScriptValue::Number(self as f64)
        }
    }
}

impl IntoScript for u64 {
    fn into_script(self, policy: &MarshalPolicy) -> ScriptValue {
        if policy.int64_mode.wants_bigint(self) {
            ScriptValue::BigInt(BigInt::from(self))
        } else {
            ScriptValue::Number(self as f64)
        }
    }
}

impl IntoScript for i128 {
    fn into_script(self, policy: &MarshalPolicy) -> ScriptValue {
        match i64::try_from(self) {
            Ok(v) => v.into_script(policy),
            // Too wide for the 64-bit policy paths; never lossy.
            Err(_) => ScriptValue::BigInt(BigInt::from(self)),
        }
    }
}

impl IntoScript for u128 {
    fn into_script(self, policy: &MarshalPolicy) -> ScriptValue {
        match u64::try_from(self) {
            Ok(v) => v.into_script(policy),
            Err(_) => ScriptValue::BigInt(BigInt::from(self)),
        }
    }
}

impl IntoScript for char {
    fn into_script(self, _policy: &MarshalPolicy) -> ScriptValue {
        let mut buf = [0u8; 4];
        ScriptValue::String(Arc::from(&*self.encode_utf8(&mut buf)))
    }
}

impl IntoScript for &str {
    fn into_script(self, _policy: &MarshalPolicy) -> ScriptValue {
        ScriptValue::String(Arc::from(self))
    }
}

impl IntoScript for String {
    fn into_script(self, _policy: &MarshalPolicy) -> ScriptValue {
        ScriptValue::String(Arc::from(self.as_str()))
    }
}

impl IntoScript for Arc<str> {
    fn into_script(self, _policy: &MarshalPolicy) -> ScriptValue {
        ScriptValue::String(self)
    }
}

impl IntoScript for ScriptDate {
    fn into_script(self, policy: &MarshalPolicy) -> ScriptValue {
        if policy.date_conversion {
            ScriptValue::Date(self)
        } else {
            // Date support disabled: the value crosses as an opaque host
            // object rather than a script date.
            ScriptValue::Object(ObjectRef::Host(HostRef::new(self)))
        }
    }
}

impl IntoScript for BigInt {
    fn into_script(self, _policy: &MarshalPolicy) -> ScriptValue {
        ScriptValue::BigInt(self)
    }
}

impl IntoScript for HostRef {
    fn into_script(self, _policy: &MarshalPolicy) -> ScriptValue {
        ScriptValue::Object(ObjectRef::Host(self))
    }
}

impl IntoScript for ScriptHandle {
    fn into_script(self, _policy: &MarshalPolicy) -> ScriptValue {
        ScriptValue::Object(ObjectRef::Script(self))
    }
}

impl<T: IntoScript> IntoScript for Option<T> {
    fn into_script(self, policy: &MarshalPolicy) -> ScriptValue {
        match self {
            Some(v) => v.into_script(policy),
            None => ScriptValue::Null,
        }
    }
}

impl IntoScript for () {
    fn into_script(self, _policy: &MarshalPolicy) -> ScriptValue {
        ScriptValue::Undefined
    }
}

/// Write-once view over a result cell.
///
/// Valid only for the duration of the current callback; the borrow makes
/// storing it past that impossible.
pub struct ResultSlot<'a> {
    cell: &'a mut ScriptValue,
    policy: &'a MarshalPolicy,
}

impl<'a> ResultSlot<'a> {
    /// Wrap a caller-allocated cell. The cell is expected to arrive as
    /// `Nonexistent`; a pre-populated cell will refuse all writes.
    pub fn new(cell: &'a mut ScriptValue, policy: &'a MarshalPolicy) -> Self {
        Self { cell, policy }
    }

    pub fn is_set(&self) -> bool {
        !self.cell.is_nonexistent()
    }

    pub fn policy(&self) -> &MarshalPolicy {
        self.policy
    }

    fn verify_unset(&self) -> Result<(), ValueError> {
        if self.is_set() {
            Err(ValueError::AlreadySet)
        } else {
            Ok(())
        }
    }

    pub fn set_undefined(&mut self) -> Result<(), ValueError> {
        self.verify_unset()?;
        *self.cell = ScriptValue::Undefined;
        Ok(())
    }

    pub fn set_null(&mut self) -> Result<(), ValueError> {
        self.verify_unset()?;
        *self.cell = ScriptValue::Null;
        Ok(())
    }

    /// Write a host value through the closed-form primitive dispatch.
    pub fn set<T: IntoScript>(&mut self, value: T) -> Result<(), ValueError> {
        self.verify_unset()?;
        *self.cell = value.into_script(self.policy);
        Ok(())
    }

    /// The generic path: marshal an arbitrary host object as an opaque
    /// object reference.
    pub fn set_host(&mut self, value: HostRef) -> Result<(), ValueError> {
        self.verify_unset()?;
        *self.cell = ScriptValue::Object(ObjectRef::Host(value));
        Ok(())
    }

    /// Write an already-tagged value (overlay reads, engine pass-through).
    pub fn set_value(&mut self, value: ScriptValue) -> Result<(), ValueError> {
        self.verify_unset()?;
        // Nonexistent never crosses as a payload; map it to undefined so
        // the cell still reaches a concrete variant.
        debug_assert!(!value.is_nonexistent());
        *self.cell = if value.is_nonexistent() { ScriptValue::Undefined } else { value };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Int64Mode;

    #[test]
    fn test_single_write_invariant() {
        let policy = MarshalPolicy::default();
        let mut cell = ScriptValue::Nonexistent;
        let mut slot = ResultSlot::new(&mut cell, &policy);
        assert!(!slot.is_set());
        slot.set(42_i32).unwrap();
        assert!(slot.is_set());
        assert_eq!(slot.set(43_i32), Err(ValueError::AlreadySet));
        assert_eq!(slot.set_undefined(), Err(ValueError::AlreadySet));
        assert_eq!(slot.set_null(), Err(ValueError::AlreadySet));
        assert!(matches!(cell, ScriptValue::Number(n) if n == 42.0));
    }

    #[test]
    fn test_every_writer_respects_the_precheck() {
        let policy = MarshalPolicy::default();

        let mut cell = ScriptValue::Nonexistent;
        let mut slot = ResultSlot::new(&mut cell, &policy);
        slot.set_undefined().unwrap();
        assert_eq!(slot.set_host(HostRef::new(1_u8)), Err(ValueError::AlreadySet));

        let mut cell = ScriptValue::Nonexistent;
        let mut slot = ResultSlot::new(&mut cell, &policy);
        slot.set_host(HostRef::new(1_u8)).unwrap();
        assert_eq!(slot.set_value(ScriptValue::Null), Err(ValueError::AlreadySet));
    }

    #[test]
    fn test_int64_policy_table() {
        let safe = 1_i64 << 50;
        let unsafe_value = (1_i64 << 53) + 1;
        let cases = [
            (Int64Mode::Number, safe, false),
            (Int64Mode::Number, unsafe_value, false),
            (Int64Mode::UnsafeBigInt, safe, false),
            (Int64Mode::UnsafeBigInt, unsafe_value, true),
            (Int64Mode::AlwaysBigInt, safe, true),
            (Int64Mode::AlwaysBigInt, unsafe_value, true),
        ];
        for (mode, value, expect_bigint) in cases {
            let policy = MarshalPolicy::default().with_int64_mode(mode);
            let out = value.into_script(&policy);
            match (expect_bigint, &out) {
                (true, ScriptValue::BigInt(b)) => assert_eq!(b, &BigInt::from(value)),
                (false, ScriptValue::Number(n)) => assert_eq!(*n, value as f64),
                _ => panic!("mode {mode:?} value {value}: unexpected {out:?}"),
            }
        }
    }

    #[test]
    fn test_u64_policy() {
        let policy = MarshalPolicy::default().with_int64_mode(Int64Mode::UnsafeBigInt);
        assert!(matches!(1_000_u64.into_script(&policy), ScriptValue::Number(_)));
        assert!(matches!(u64::MAX.into_script(&policy), ScriptValue::BigInt(_)));
    }

    #[test]
    fn test_wide_integers_never_lose_precision() {
        let policy = MarshalPolicy::default(); // Number mode
        let wide = i128::from(i64::MAX) + 1;
        assert!(matches!(wide.into_script(&policy), ScriptValue::BigInt(_)));
        let narrow = 7_i128;
        assert!(matches!(narrow.into_script(&policy), ScriptValue::Number(_)));
    }

    #[test]
    fn test_date_policy() {
        let date = ScriptDate::from_millis(86_400_000.0);

        let enabled = MarshalPolicy::default().with_date_conversion(true);
        assert!(matches!(date.into_script(&enabled), ScriptValue::Date(_)));

        let disabled = MarshalPolicy::default();
        let out = date.into_script(&disabled);
        let host = out.as_host().expect("opaque host object");
        assert_eq!(host.downcast_ref::<ScriptDate>(), Some(&date));
    }

    #[test]
    fn test_char_and_string_writes() {
        let policy = MarshalPolicy::default();
        assert_eq!('A'.into_script(&policy).as_str(), Some("A"));
        assert_eq!("hello".into_script(&policy).as_str(), Some("hello"));
        assert_eq!(Some("x").into_script(&policy).as_str(), Some("x"));
        assert!(Option::<i32>::None.into_script(&policy).is_null());
        assert!(().into_script(&policy).is_undefined());
    }

    #[test]
    fn test_set_value_passthrough() {
        let policy = MarshalPolicy::default();
        let mut cell = ScriptValue::Nonexistent;
        let mut slot = ResultSlot::new(&mut cell, &policy);
        slot.set_value(ScriptValue::from("kept")).unwrap();
        assert_eq!(cell.as_str(), Some("kept"));
    }
}
