//! Exact-constant payload for the constant-value analysis.
//!
//! A [`ConstValue`] is a compile-time literal tracked through the function.
//! The folding rules themselves (overflow strategies, trivial identities)
//! live in the constant analysis; this type only carries the value and its
//! checked accessors.

use std::fmt;

use super::DomainPayload;

/// A known compile-time constant.
///
/// The variant is determined by the static CHIR type of the value, so two
/// constants joined at a control-flow merge always share the same variant
/// kind; payload-kind mismatches are programming errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    /// Unsigned integer, stored widened to 64 bits.
    UInt(u64),
    /// Signed integer, stored widened to 64 bits.
    Int(i64),
    /// Floating point, stored widened to 64 bits.
    Float(f64),
    /// Unicode scalar.
    Rune(char),
    /// Boolean.
    Bool(bool),
    /// String.
    Str(String),
}

impl ConstValue {
    /// Returns `true` if this is an integer constant (signed or unsigned).
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_) | Self::UInt(_))
    }

    /// Returns the constant as a signed 64-bit value if applicable.
    ///
    /// Unsigned constants convert when they fit.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) if *v <= i64::MAX as u64 => Some(*v as i64),
            _ => None,
        }
    }

    /// Returns the constant as an unsigned 64-bit value if applicable.
    ///
    /// Signed constants convert when non-negative.
    #[must_use]
    pub const fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    /// Returns the raw 64-bit two's-complement bit pattern of an integer
    /// constant.
    #[must_use]
    pub const fn as_bits(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => Some(*v as u64),
            _ => None,
        }
    }

    /// Returns the constant as a float if applicable.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the constant as a bool if applicable.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns `true` if this constant is integer zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        matches!(self, Self::Int(0) | Self::UInt(0))
    }

    /// Returns `true` if this constant is integer one.
    #[must_use]
    pub const fn is_one(&self) -> bool {
        matches!(self, Self::Int(1) | Self::UInt(1))
    }

    fn same_kind(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl DomainPayload for ConstValue {
    fn join(&self, other: &Self) -> Option<Self> {
        // Static types agree at merges, so kinds always match.
        debug_assert!(
            self.same_kind(other),
            "joined constants of different kinds: {self} vs {other}"
        );
        (self == other).then(|| self.clone())
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Rune(v) => write!(f, "'{v}'"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
        }
    }
}
