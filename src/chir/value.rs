//! Value identities and literals.
//!
//! CHIR is SSA-like: every [`Value`] is assigned by exactly one expression
//! (or is a parameter/literal). The analysis keys all of its abstract facts
//! on [`ValueId`], and synthesizes additional ids for field slots discovered
//! through the object graph.

use std::fmt;

use crate::chir::types::ChirType;

/// Identity of a CHIR value.
///
/// Ids below [`ValueId::SYNTHETIC_BASE`] index the owning function's value
/// table; ids at or above it are field slots minted by the analysis' object
/// graph and have no entry in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl ValueId {
    /// First id reserved for analysis-synthesized field slots.
    pub const SYNTHETIC_BASE: u32 = 0x8000_0000;

    /// Returns `true` if this id was minted by the analysis rather than the
    /// IR builder.
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        self.0 >= Self::SYNTHETIC_BASE
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_synthetic() {
            write!(f, "%s{}", self.0 - Self::SYNTHETIC_BASE)
        } else {
            write!(f, "%{}", self.0)
        }
    }
}

/// A literal constant embedded in the IR.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Signed integer literal (width given by the value's static type).
    Int(i64),
    /// Unsigned integer literal.
    UInt(u64),
    /// Floating-point literal.
    Float(f64),
    /// Boolean literal.
    Bool(bool),
    /// Unicode scalar literal.
    Rune(char),
    /// String literal.
    Str(String),
    /// The unit value.
    Unit,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Rune(c) => write!(f, "r'{c}'"),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Unit => write!(f, "()"),
        }
    }
}

/// How a value comes into existence.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// Function parameter with its position.
    Param(usize),
    /// Result of an expression in the body.
    Local,
    /// Literal constant.
    Literal(Literal),
    /// Reference to a package-level variable; carries its literal initializer
    /// when the global-initializer pass resolved one.
    Global(Option<Literal>),
}

/// A single-assignment CHIR value: identity, static type, and provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    id: ValueId,
    ty: ChirType,
    kind: ValueKind,
}

impl Value {
    /// Creates a new value.
    #[must_use]
    pub const fn new(id: ValueId, ty: ChirType, kind: ValueKind) -> Self {
        Self { id, ty, kind }
    }

    /// Returns the value's identity.
    #[must_use]
    pub const fn id(&self) -> ValueId {
        self.id
    }

    /// Returns the value's static type.
    #[must_use]
    pub const fn ty(&self) -> &ChirType {
        &self.ty
    }

    /// Returns how the value is introduced.
    #[must_use]
    pub const fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// Returns the literal if this value is a literal constant (or a global
    /// with a resolved literal initializer).
    #[must_use]
    pub fn literal(&self) -> Option<&Literal> {
        match &self.kind {
            ValueKind::Literal(lit) | ValueKind::Global(Some(lit)) => Some(lit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chir::types::IntKind;

    #[test]
    fn test_synthetic_ids() {
        let real = ValueId(3);
        let synth = ValueId(ValueId::SYNTHETIC_BASE + 2);
        assert!(!real.is_synthetic());
        assert!(synth.is_synthetic());
        assert_eq!(real.to_string(), "%3");
        assert_eq!(synth.to_string(), "%s2");
    }

    #[test]
    fn test_value_literal() {
        let v = Value::new(
            ValueId(0),
            ChirType::Int(IntKind::I32),
            ValueKind::Literal(Literal::Int(42)),
        );
        assert_eq!(v.literal(), Some(&Literal::Int(42)));

        let p = Value::new(ValueId(1), ChirType::Bool, ValueKind::Param(0));
        assert_eq!(p.literal(), None);

        let g = Value::new(
            ValueId(2),
            ChirType::Int(IntKind::I64),
            ValueKind::Global(Some(Literal::Int(7))),
        );
        assert_eq!(g.literal(), Some(&Literal::Int(7)));
    }
}
