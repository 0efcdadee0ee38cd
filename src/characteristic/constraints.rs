//! Value constraints, one strategy per value shape.
//!
//! ```text
//! integers   min <= v <= max  &&  (step == 0 || (v - min) % step == 0)
//! float      min <= v <= max  &&  (step == 0 || |fract((v-min)/step + ½) - ½| <= 0.1)
//!            ±inf only when the bound on that side is itself infinite
//! uint8      range as above, then valid-values / valid-values-range lists
//!            (Apple-defined types only)
//! ```

use crate::uuid::Uuid;

/// Largest deviation from the nearest step accepted for float values,
/// expressed as a fraction of the step.
pub const FLOAT_STEP_TOLERANCE: f32 = 0.1;

/// Default `max_length` of string characteristics.
pub const DEFAULT_STRING_MAX_LENGTH: usize = 64;

/// Default `max_length` of data characteristics.
pub const DEFAULT_DATA_MAX_LENGTH: usize = 2_097_152;

/// Checks applied to a value before a write reaches the application and
/// after a read comes back from it.
pub trait Constraint<T: Copy> {
    /// `char_type` is the type of the characteristic carrying the value.
    fn accepts(&self, value: T, char_type: &Uuid) -> bool;

    /// Canonical form of an accepted value.
    fn normalize(&self, value: T) -> T {
        value
    }
}

/// No constraint beyond the type itself (bool).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unconstrained;

impl<T: Copy> Constraint<T> for Unconstrained {
    fn accepts(&self, _value: T, _char_type: &Uuid) -> bool {
        true
    }
}

// ═══════════════════════════════════════════════════════════════
//  Integer ranges
// ═══════════════════════════════════════════════════════════════

/// Inclusive range with an optional step, anchored at `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericRange<T> {
    pub min: T,
    pub max: T,
    /// 0 and 1 both mean "any integer".
    pub step: T,
}

macro_rules! numeric_range {
    ($($t:ty),*) => {$(
        impl NumericRange<$t> {
            /// The whole domain of the type. Not serialized.
            pub const FULL: Self = Self { min: <$t>::MIN, max: <$t>::MAX, step: 1 };

            pub const fn new(min: $t, max: $t, step: $t) -> Self {
                Self { min, max, step }
            }

            /// True when no range field needs to go on the wire.
            pub fn is_full_range(&self) -> bool {
                self.min == <$t>::MIN && self.max == <$t>::MAX && self.step <= 1
            }

            pub fn contains(&self, value: $t) -> bool {
                if value < self.min || value > self.max {
                    return false;
                }
                // Widened so `value - min` cannot overflow for signed types.
                self.step == 0 || (i128::from(value) - i128::from(self.min)) % i128::from(self.step) == 0
            }
        }

        impl Default for NumericRange<$t> {
            fn default() -> Self {
                Self::FULL
            }
        }

        impl Constraint<$t> for NumericRange<$t> {
            fn accepts(&self, value: $t, _char_type: &Uuid) -> bool {
                self.contains(value)
            }
        }
    )*};
}

numeric_range!(u8, u16, u32, u64, i32);

// ═══════════════════════════════════════════════════════════════
//  UInt8 with enumerated values
// ═══════════════════════════════════════════════════════════════

/// One inclusive `[start, end]` entry of a valid-values-range list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidValuesRange {
    pub start: u8,
    pub end: u8,
}

impl ValidValuesRange {
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, value: u8) -> bool {
        (self.start..=self.end).contains(&value)
    }
}

/// UInt8 constraints. The enumerated lists only exist for Apple-defined
/// characteristic types; `None` means the list is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UInt8Constraints<'a> {
    pub range: NumericRange<u8>,
    pub valid_values: Option<&'a [u8]>,
    pub valid_values_ranges: Option<&'a [ValidValuesRange]>,
}

impl UInt8Constraints<'_> {
    pub const fn from_range(min: u8, max: u8, step: u8) -> Self {
        Self {
            range: NumericRange::<u8>::new(min, max, step),
            valid_values: None,
            valid_values_ranges: None,
        }
    }

    pub fn has_valid_values(&self) -> bool {
        self.valid_values.is_some() || self.valid_values_ranges.is_some()
    }
}

impl Default for UInt8Constraints<'_> {
    fn default() -> Self {
        Self {
            range: NumericRange::<u8>::FULL,
            valid_values: None,
            valid_values_ranges: None,
        }
    }
}

impl Constraint<u8> for UInt8Constraints<'_> {
    fn accepts(&self, value: u8, char_type: &Uuid) -> bool {
        if !self.range.contains(value) {
            return false;
        }
        if !char_type.is_apple_defined() {
            assert!(
                !self.has_valid_values(),
                "valid values are reserved for Apple-defined characteristics"
            );
            return true;
        }
        if !self.has_valid_values() {
            return true;
        }
        self.valid_values.is_some_and(|list| list.contains(&value))
            || self
                .valid_values_ranges
                .is_some_and(|ranges| ranges.iter().any(|r| r.contains(value)))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Float
// ═══════════════════════════════════════════════════════════════

/// Float range. Bounds may be infinite; `step == 0` disables stepping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl FloatRange {
    pub const UNBOUNDED: Self = Self {
        min: f32::NEG_INFINITY,
        max: f32::INFINITY,
        step: 0.0,
    };

    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    /// True when no range field needs to go on the wire.
    pub fn is_unbounded(&self) -> bool {
        self.min == f32::NEG_INFINITY && self.max == f32::INFINITY && self.step == 0.0
    }

    /// Signed distance to the nearest step, in units of the step.
    fn step_deviation(&self, value: f32) -> f32 {
        ((value - self.min) / self.step + 0.5).fract() - 0.5
    }
}

impl Default for FloatRange {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

impl Constraint<f32> for FloatRange {
    fn accepts(&self, value: f32, _char_type: &Uuid) -> bool {
        if value.is_infinite() {
            return if value > 0.0 {
                self.max == f32::INFINITY
            } else {
                self.min == f32::NEG_INFINITY
            };
        }
        if value.is_nan() || value < self.min || value > self.max {
            return false;
        }
        self.step == 0.0 || self.step_deviation(value).abs() <= FLOAT_STEP_TOLERANCE
    }

    fn normalize(&self, value: f32) -> f32 {
        if self.step == 0.0 || !value.is_finite() {
            return value;
        }
        value - self.step_deviation(value) * self.step
    }
}

// ── Tests ─────────────────────────────────────────────────────
