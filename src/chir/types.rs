//! Type model for CHIR values.
//!
//! The engine never type-checks; it consumes an already-checked function and
//! only needs enough type structure to answer the queries the transfer
//! functions make: integer kind (width + signedness), reference-ness, and the
//! representable range used for overflow checking and diagnostic hints.

use std::fmt;

use strum::Display;

/// Integer kinds supported by CHIR, covering width and signedness.
///
/// `INative`/`UNative` are the pointer-sized kinds; this crate models them as
/// 64-bit, matching the targets the surrounding compiler currently emits for.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    /// 8-bit signed integer.
    #[strum(serialize = "Int8")]
    I8,
    /// 16-bit signed integer.
    #[strum(serialize = "Int16")]
    I16,
    /// 32-bit signed integer.
    #[strum(serialize = "Int32")]
    I32,
    /// 64-bit signed integer.
    #[strum(serialize = "Int64")]
    I64,
    /// Pointer-sized signed integer.
    #[strum(serialize = "IntNative")]
    INative,
    /// 8-bit unsigned integer.
    #[strum(serialize = "UInt8")]
    U8,
    /// 16-bit unsigned integer.
    #[strum(serialize = "UInt16")]
    U16,
    /// 32-bit unsigned integer.
    #[strum(serialize = "UInt32")]
    U32,
    /// 64-bit unsigned integer.
    #[strum(serialize = "UInt64")]
    U64,
    /// Pointer-sized unsigned integer.
    #[strum(serialize = "UIntNative")]
    UNative,
}

impl IntKind {
    /// All integer kinds, in a stable order.
    ///
    /// Used by the generic numeric-cast routine, which is exercised across
    /// the full source/target cross product.
    pub const ALL: [Self; 10] = [
        Self::I8,
        Self::I16,
        Self::I32,
        Self::I64,
        Self::INative,
        Self::U8,
        Self::U16,
        Self::U32,
        Self::U64,
        Self::UNative,
    ];

    /// Returns the bit width of this kind.
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            Self::I8 | Self::U8 => 8,
            Self::I16 | Self::U16 => 16,
            Self::I32 | Self::U32 => 32,
            Self::I64 | Self::INative | Self::U64 | Self::UNative => 64,
        }
    }

    /// Returns `true` if this kind is signed.
    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            Self::I8 | Self::I16 | Self::I32 | Self::I64 | Self::INative
        )
    }

    /// Returns the smallest representable value as an `i128`.
    #[must_use]
    pub const fn min_value(self) -> i128 {
        if self.is_signed() {
            -(1_i128 << (self.width() - 1))
        } else {
            0
        }
    }

    /// Returns the largest representable value as an `i128`.
    #[must_use]
    pub const fn max_value(self) -> i128 {
        if self.is_signed() {
            (1_i128 << (self.width() - 1)) - 1
        } else {
            (1_i128 << self.width()) - 1
        }
    }

    /// Returns `true` if `value` is representable in this kind.
    #[must_use]
    pub const fn contains(self, value: i128) -> bool {
        value >= self.min_value() && value <= self.max_value()
    }

    /// Renders the representable range for diagnostic notes,
    /// e.g. `"-128 ~ 127"`.
    #[must_use]
    pub fn range_hint(self) -> String {
        format!("{} ~ {}", self.min_value(), self.max_value())
    }
}

/// Floating-point kinds.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    /// 16-bit float.
    #[strum(serialize = "Float16")]
    F16,
    /// 32-bit float.
    #[strum(serialize = "Float32")]
    F32,
    /// 64-bit float.
    #[strum(serialize = "Float64")]
    F64,
}

/// Per-operation overflow policy, declared on each arithmetic expression.
///
/// Governs both runtime semantics (what codegen emits) and what the analysis
/// is allowed to conclude: only `Throwing` operations carry a runtime check
/// that a `Success` outcome can elide.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OverflowStrategy {
    /// Overflow raises a runtime exception; a provable overflow is a
    /// compile-time diagnostic.
    #[default]
    Throwing,
    /// Overflow wraps modulo 2^width.
    Wrapping,
    /// Overflow clamps to the destination's representable bounds.
    Saturating,
}

/// A CHIR type, as much of it as the analysis needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChirType {
    /// Integer type.
    Int(IntKind),
    /// Floating-point type.
    Float(FloatKind),
    /// Boolean type.
    Bool,
    /// Unicode scalar value.
    Rune,
    /// Immutable string.
    Str,
    /// Unit type.
    Unit,
    /// Reference to a value of the inner type.
    Ref(Box<ChirType>),
    /// Nominal struct type.
    Struct(String),
    /// Nominal class (heap) type.
    Class(String),
    /// Dynamically sized array with the given element type.
    RawArray(Box<ChirType>),
    /// Fixed-size value array.
    VArray(Box<ChirType>, usize),
    /// Placeholder produced for unreachable/erroneous IR.
    Invalid,
}

impl ChirType {
    /// Returns the integer kind if this is an integer type.
    #[must_use]
    pub fn int_kind(&self) -> Option<IntKind> {
        match self {
            Self::Int(k) => Some(*k),
            _ => None,
        }
    }

    /// Returns `true` if this is an integer type.
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// Returns `true` if this is a floating-point type.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    /// Returns `true` if this is the boolean type.
    #[must_use]
    pub const fn is_boolean(&self) -> bool {
        matches!(self, Self::Bool)
    }

    /// Returns `true` if this is the string type.
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::Str)
    }

    /// Returns `true` if this is the unit type.
    #[must_use]
    pub const fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Returns `true` if this is a reference type.
    #[must_use]
    pub const fn is_ref(&self) -> bool {
        matches!(self, Self::Ref(_))
    }

    /// Returns `true` if this is a class type.
    #[must_use]
    pub const fn is_class(&self) -> bool {
        matches!(self, Self::Class(_))
    }

    /// Returns `true` if values of this type get a tracked field tree
    /// (references, classes, structs, and arrays).
    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(
            self,
            Self::Ref(_) | Self::Struct(_) | Self::Class(_) | Self::RawArray(_) | Self::VArray(..)
        )
    }

    /// Strips one layer of reference, if any.
    #[must_use]
    pub fn deref_once(&self) -> &Self {
        match self {
            Self::Ref(inner) => inner,
            other => other,
        }
    }
}

impl fmt::Display for ChirType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(k) => write!(f, "{k}"),
            Self::Float(k) => write!(f, "{k}"),
            Self::Bool => write!(f, "Bool"),
            Self::Rune => write!(f, "Rune"),
            Self::Str => write!(f, "String"),
            Self::Unit => write!(f, "Unit"),
            Self::Ref(inner) => write!(f, "&{inner}"),
            Self::Struct(name) | Self::Class(name) => write!(f, "{name}"),
            Self::RawArray(elem) => write!(f, "RawArray<{elem}>"),
            Self::VArray(elem, n) => write!(f, "VArray<{elem}, ${n}>"),
            Self::Invalid => write!(f, "Invalid"),
        }
    }
}

/// Source location carried by expressions for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Location {
    /// File id, resolved by the surrounding driver's source manager.
    pub file: u32,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl Location {
    /// Creates a location.
    #[must_use]
    pub const fn new(file: u32, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_kind_bounds() {
        assert_eq!(IntKind::I8.min_value(), -128);
        assert_eq!(IntKind::I8.max_value(), 127);
        assert_eq!(IntKind::U8.min_value(), 0);
        assert_eq!(IntKind::U8.max_value(), 255);
        assert_eq!(IntKind::I64.max_value(), i64::MAX as i128);
        assert_eq!(IntKind::U64.max_value(), u64::MAX as i128);
    }

    #[test]
    fn test_int_kind_contains() {
        assert!(IntKind::I8.contains(127));
        assert!(!IntKind::I8.contains(128));
        assert!(IntKind::U16.contains(65535));
        assert!(!IntKind::U16.contains(-1));
    }

    #[test]
    fn test_range_hint() {
        assert_eq!(IntKind::I8.range_hint(), "-128 ~ 127");
        assert_eq!(IntKind::U8.range_hint(), "0 ~ 255");
    }

    #[test]
    fn test_type_queries() {
        assert!(ChirType::Int(IntKind::I32).is_integer());
        assert!(ChirType::Bool.is_boolean());
        assert!(ChirType::Ref(Box::new(ChirType::Bool)).is_ref());
        assert!(ChirType::Class("Array".into()).is_class());
        assert!(!ChirType::Unit.is_composite());
        assert!(ChirType::RawArray(Box::new(ChirType::Int(IntKind::I64))).is_composite());
    }

    #[test]
    fn test_type_display() {
        assert_eq!(ChirType::Int(IntKind::I32).to_string(), "Int32");
        assert_eq!(
            ChirType::Ref(Box::new(ChirType::Int(IntKind::U8))).to_string(),
            "&UInt8"
        );
        assert_eq!(
            ChirType::VArray(Box::new(ChirType::Bool), 4).to_string(),
            "VArray<Bool, $4>"
        );
    }
}
