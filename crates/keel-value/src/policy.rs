//! Marshaling policy
//!
//! Engine-level switches consulted by the result slot at write time.

use serde::{Deserialize, Serialize};

/// Largest integer magnitude a 64-bit float represents exactly.
pub const F64_EXACT_INT_MAX: u64 = 1 << 53;

/// Largest integer magnitude a 32-bit float represents exactly.
pub const F32_EXACT_INT_MAX: u64 = 1 << 24;

/// How 64-bit host integers cross into the script numeric domain.
///
/// The script number type is a 64-bit float and cannot represent every
/// 64-bit integer exactly; this mode lets the host pick between safety
/// (never lossy) and compatibility (looks like a normal number). The
/// variants encode the precedence of the original switch pair: "always"
/// beats "only if unsafe".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Int64Mode {
    /// Always marshal as a plain number, even when lossy.
    #[default]
    Number,
    /// Marshal as a big integer only when the value falls outside the
    /// exactly-representable float range.
    UnsafeBigInt,
    /// Marshal every 64-bit integer as a big integer.
    AlwaysBigInt,
}

impl Int64Mode {
    /// Resolve the original two-switch surface into a mode.
    pub fn from_flags(all_bigint: bool, unsafe_bigint: bool) -> Self {
        if all_bigint {
            Int64Mode::AlwaysBigInt
        } else if unsafe_bigint {
            Int64Mode::UnsafeBigInt
        } else {
            Int64Mode::Number
        }
    }

    /// Whether a value with the given magnitude takes the big-integer
    /// representation under this mode.
    pub fn wants_bigint(&self, magnitude: u64) -> bool {
        match self {
            Int64Mode::Number => false,
            Int64Mode::UnsafeBigInt => magnitude > F64_EXACT_INT_MAX,
            Int64Mode::AlwaysBigInt => true,
        }
    }
}

/// Marshaling switches read by [`ResultSlot`](crate::ResultSlot) writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MarshalPolicy {
    pub int64_mode: Int64Mode,
    /// When disabled, host dates are marshaled through the generic
    /// object path instead of becoming script dates.
    pub date_conversion: bool,
}

impl MarshalPolicy {
    pub fn with_int64_mode(mut self, mode: Int64Mode) -> Self {
        self.int64_mode = mode;
        self
    }

    pub fn with_date_conversion(mut self, enabled: bool) -> Self {
        self.date_conversion = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_precedence_table() {
        // (all, unsafe) -> mode; "always" wins over "only if unsafe".
        let table = [
            (false, false, Int64Mode::Number),
            (false, true, Int64Mode::UnsafeBigInt),
            (true, false, Int64Mode::AlwaysBigInt),
            (true, true, Int64Mode::AlwaysBigInt),
        ];
        for (all, unsafe_only, expected) in table {
            assert_eq!(Int64Mode::from_flags(all, unsafe_only), expected);
        }
    }

    #[test]
    fn test_wants_bigint_boundaries() {
        assert!(!Int64Mode::Number.wants_bigint(u64::MAX));
        assert!(!Int64Mode::UnsafeBigInt.wants_bigint(F64_EXACT_INT_MAX));
        assert!(Int64Mode::UnsafeBigInt.wants_bigint(F64_EXACT_INT_MAX + 1));
        assert!(Int64Mode::AlwaysBigInt.wants_bigint(0));
    }

    #[test]
    fn test_policy_round_trips_through_serde() {
        let policy = MarshalPolicy::default()
            .with_int64_mode(Int64Mode::UnsafeBigInt)
            .with_date_conversion(true);
        let json = serde_json::to_string(&policy).unwrap();
        let back: MarshalPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, back);
    }
}
