//! Numeric coercion engine
//!
//! Converts script values (64-bit floats, big integers, boxed host
//! primitives) into requested host primitive types using exact-range,
//! exact-truncation rules. Each primitive target implements
//! [`NumericTarget`] once; the cascade drivers are generic over it.

use std::any::Any;
use std::sync::Arc;

use num_bigint::BigInt;

use crate::policy::{F32_EXACT_INT_MAX, F64_EXACT_INT_MAX};
use crate::value::{HostRef, ObjectRef, ScriptDate, ScriptHandle, ScriptValue};

// 2^63 as f64; the half-open float range representable in an i64.
const I64_RANGE_LO: f64 = -9_223_372_036_854_775_808.0;
const I64_RANGE_HI: f64 = 9_223_372_036_854_775_808.0;

/// A primitive type a script value can be narrowed or widened into.
///
/// Implementations carry their own exact bounds; the conversion entry
/// points return `None` rather than rounding, truncating, or wrapping.
pub trait NumericTarget: Sized {
    /// Exact conversion from the common signed 64-bit reduction.
    fn from_i64(value: i64) -> Option<Self>;

    /// Exact conversion for unsigned magnitudes above `i64::MAX`, which
    /// the common path cannot represent.
    fn from_u64(value: u64) -> Option<Self>;

    /// Exact conversion from a big integer.
    fn from_bigint(value: &BigInt) -> Option<Self>;

    /// Conversion from a 64-bit float. Integer targets accept only
    /// fraction-free values inside their bounds; the truncation check is
    /// bit-exact, not epsilon-based.
    fn from_f64(value: f64) -> Option<Self> {
        if value.trunc() == value && value >= I64_RANGE_LO && value < I64_RANGE_HI {
            Self::from_i64(value as i64)
        } else {
            None
        }
    }
}

macro_rules! int_target {
    ($($ty:ty),* $(,)?) => {$(
        impl NumericTarget for $ty {
            fn from_i64(value: i64) -> Option<Self> {
                Self::try_from(value).ok()
            }

            fn from_u64(value: u64) -> Option<Self> {
                Self::try_from(value).ok()
            }

            fn from_bigint(value: &BigInt) -> Option<Self> {
                Self::try_from(value).ok()
            }
        }
    )*};
}

int_target!(i8, i16, i32, i64, u8, u16, u32, u64, i128, u128);

impl NumericTarget for char {
    fn from_i64(value: i64) -> Option<Self> {
        u32::try_from(value).ok().and_then(char::from_u32)
    }

    fn from_u64(value: u64) -> Option<Self> {
        u32::try_from(value).ok().and_then(char::from_u32)
    }

    fn from_bigint(value: &BigInt) -> Option<Self> {
        u32::try_from(value).ok().and_then(char::from_u32)
    }
}

impl NumericTarget for f64 {
    fn from_i64(value: i64) -> Option<Self> {
        (value.unsigned_abs() <= F64_EXACT_INT_MAX).then(|| value as f64)
    }

    fn from_u64(value: u64) -> Option<Self> {
        (value <= F64_EXACT_INT_MAX).then(|| value as f64)
    }

    fn from_bigint(value: &BigInt) -> Option<Self> {
        i64::try_from(value).ok().and_then(Self::from_i64)
    }

    fn from_f64(value: f64) -> Option<Self> {
        Some(value)
    }
}

impl NumericTarget for f32 {
    fn from_i64(value: i64) -> Option<Self> {
        (value.unsigned_abs() <= F32_EXACT_INT_MAX).then(|| value as f32)
    }

    fn from_u64(value: u64) -> Option<Self> {
        (value <= F32_EXACT_INT_MAX).then(|| value as f32)
    }

    fn from_bigint(value: &BigInt) -> Option<Self> {
        i64::try_from(value).ok().and_then(Self::from_i64)
    }

    fn from_f64(value: f64) -> Option<Self> {
        let finite = value >= f64::from(f32::MIN) && value <= f64::from(f32::MAX);
        finite.then(|| value as f32)
    }
}

/// Coercion cascade entry point for numeric targets.
///
/// Sources, in order of recognition: a script number, a big integer, a
/// boxed host primitive (re-dispatched through the first two after
/// extraction). Anything else has no coercion path.
pub fn coerce_numeric<T: NumericTarget>(value: &ScriptValue) -> Option<T> {
    match value {
        ScriptValue::Number(n) => T::from_f64(*n),
        ScriptValue::BigInt(b) => T::from_bigint(b),
        ScriptValue::Object(ObjectRef::Host(h)) => boxed_numeric::<T>(h),
        _ => None,
    }
}

/// Re-dispatch for boxed host primitives: extract the underlying
/// i64/u64/f64/BigInt and run the ordinary cascade on it.
fn boxed_numeric<T: NumericTarget>(host: &HostRef) -> Option<T> {
    let any: &dyn Any = host.as_any();
    if let Some(v) = any.downcast_ref::<i8>() {
        return T::from_i64(i64::from(*v));
    }
    if let Some(v) = any.downcast_ref::<i16>() {
        return T::from_i64(i64::from(*v));
    }
    if let Some(v) = any.downcast_ref::<i32>() {
        return T::from_i64(i64::from(*v));
    }
    if let Some(v) = any.downcast_ref::<i64>() {
        return T::from_i64(*v);
    }
    if let Some(v) = any.downcast_ref::<u8>() {
        return T::from_i64(i64::from(*v));
    }
    if let Some(v) = any.downcast_ref::<u16>() {
        return T::from_i64(i64::from(*v));
    }
    if let Some(v) = any.downcast_ref::<u32>() {
        return T::from_i64(i64::from(*v));
    }
    if let Some(v) = any.downcast_ref::<u64>() {
        // Values at or below i64::MAX travel the common signed path; the
        // rest need the unsigned-specific one.
        return match i64::try_from(*v) {
            Ok(signed) => T::from_i64(signed),
            Err(_) => T::from_u64(*v),
        };
    }
    if let Some(v) = any.downcast_ref::<i128>() {
        return match i64::try_from(*v) {
            Ok(signed) => T::from_i64(signed),
            Err(_) => T::from_bigint(&BigInt::from(*v)),
        };
    }
    if let Some(v) = any.downcast_ref::<u128>() {
        if let Ok(signed) = i64::try_from(*v) {
            return T::from_i64(signed);
        }
        return match u64::try_from(*v) {
            Ok(unsigned) => T::from_u64(unsigned),
            Err(_) => T::from_bigint(&BigInt::from(*v)),
        };
    }
    if let Some(v) = any.downcast_ref::<f32>() {
        return T::from_f64(f64::from(*v));
    }
    if let Some(v) = any.downcast_ref::<f64>() {
        return T::from_f64(*v);
    }
    if let Some(v) = any.downcast_ref::<char>() {
        return T::from_i64(i64::from(u32::from(*v)));
    }
    if let Some(v) = any.downcast_ref::<BigInt>() {
        return T::from_bigint(v);
    }
    None
}

/// Coercion from a script value into a concrete host type.
///
/// `try_get`-style: returns `None` when no coercion path exists, never
/// fails loudly.
pub trait FromScript: Sized {
    fn from_script(value: &ScriptValue) -> Option<Self>;
}

macro_rules! numeric_from_script {
    ($($ty:ty),* $(,)?) => {$(
        impl FromScript for $ty {
            fn from_script(value: &ScriptValue) -> Option<Self> {
                coerce_numeric(value)
            }
        }
    )*};
}

numeric_from_script!(i8, i16, i32, i64, u8, u16, u32, u64, i128, u128, f32, f64, char);

impl FromScript for bool {
    fn from_script(value: &ScriptValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromScript for String {
    fn from_script(value: &ScriptValue) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromScript for Arc<str> {
    fn from_script(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromScript for ScriptDate {
    fn from_script(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::Date(d) => Some(*d),
            // A date marshaled with conversion disabled comes back as an
            // opaque host object; read it back symmetrically.
            ScriptValue::Object(ObjectRef::Host(h)) => h.downcast_ref::<ScriptDate>().copied(),
            _ => None,
        }
    }
}

impl FromScript for BigInt {
    fn from_script(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::BigInt(b) => Some(b.clone()),
            ScriptValue::Number(n) => {
                if n.trunc() != *n {
                    return None;
                }
                if *n >= I64_RANGE_LO && *n < I64_RANGE_HI {
                    Some(BigInt::from(*n as i64))
                } else if *n >= I64_RANGE_HI && *n < 18_446_744_073_709_551_616.0 {
                    Some(BigInt::from(*n as u64))
                } else {
                    None
                }
            }
            ScriptValue::Object(ObjectRef::Host(h)) => h.downcast_ref::<BigInt>().cloned(),
            _ => None,
        }
    }
}

impl FromScript for HostRef {
    fn from_script(value: &ScriptValue) -> Option<Self> {
        value.as_host().cloned()
    }
}

impl FromScript for ScriptHandle {
    fn from_script(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::Object(ObjectRef::Script(h)) => Some(h.clone()),
            _ => None,
        }
    }
}

impl FromScript for ScriptValue {
    fn from_script(value: &ScriptValue) -> Option<Self> {
        Some(value.clone())
    }
}

/// Nullable targets: null/undefined sources map to "no value" and always
/// succeed; any other source must coerce through the inner type.
impl<T: FromScript> FromScript for Option<T> {
    fn from_script(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::Null | ScriptValue::Undefined => Some(None),
            other => T::from_script(other).map(Some),
        }
    }
}
