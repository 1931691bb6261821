//! CHIR expressions.
//!
//! An expression reads zero or more operand values and defines exactly one
//! result value. Every expression carries an operation-kind tag, the declared
//! overflow strategy (meaningful for arithmetic/cast kinds), and a source
//! location for diagnostics.

use std::fmt;

use strum::Display;

use crate::chir::{
    types::{ChirType, Location, OverflowStrategy},
    value::{Literal, ValueId},
};

/// Stable identity of an expression within its function.
///
/// Used by the analysis to attach side-channel facts (the "never overflows"
/// set) without mutating the shared IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Binary operator kinds.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Addition `+`.
    #[strum(serialize = "+")]
    Add,
    /// Subtraction `-`.
    #[strum(serialize = "-")]
    Sub,
    /// Multiplication `*`.
    #[strum(serialize = "*")]
    Mul,
    /// Division `/`.
    #[strum(serialize = "/")]
    Div,
    /// Remainder `%`.
    #[strum(serialize = "%")]
    Mod,
    /// Exponentiation `**`.
    #[strum(serialize = "**")]
    Exp,
    /// Left shift `<<`.
    #[strum(serialize = "<<")]
    Shl,
    /// Right shift `>>`.
    #[strum(serialize = ">>")]
    Shr,
    /// Bitwise and `&`.
    #[strum(serialize = "&")]
    BitAnd,
    /// Bitwise or `|`.
    #[strum(serialize = "|")]
    BitOr,
    /// Bitwise xor `^`.
    #[strum(serialize = "^")]
    BitXor,
    /// Less-than `<`.
    #[strum(serialize = "<")]
    Lt,
    /// Less-or-equal `<=`.
    #[strum(serialize = "<=")]
    Le,
    /// Greater-than `>`.
    #[strum(serialize = ">")]
    Gt,
    /// Greater-or-equal `>=`.
    #[strum(serialize = ">=")]
    Ge,
    /// Equality `==`.
    #[strum(serialize = "==")]
    Eq,
    /// Inequality `!=`.
    #[strum(serialize = "!=")]
    Ne,
    /// Short-circuit logical and `&&`.
    #[strum(serialize = "&&")]
    And,
    /// Short-circuit logical or `||`.
    #[strum(serialize = "||")]
    Or,
}

impl BinaryOp {
    /// Returns `true` for the arithmetic operators subject to overflow
    /// strategies.
    #[must_use]
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod | Self::Exp
        )
    }

    /// Returns `true` for shift operators.
    #[must_use]
    pub const fn is_shift(self) -> bool {
        matches!(self, Self::Shl | Self::Shr)
    }

    /// Returns `true` for relational operators producing a boolean.
    #[must_use]
    pub const fn is_relational(self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Le | Self::Gt | Self::Ge | Self::Eq | Self::Ne
        )
    }

    /// Returns `true` for the short-circuit logical operators.
    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }
}

/// Unary operator kinds.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation `-`.
    #[strum(serialize = "-")]
    Neg,
    /// Logical not `!` over booleans.
    #[strum(serialize = "!")]
    Not,
    /// Bitwise complement `!` over integers.
    #[strum(serialize = "~")]
    BitNot,
}

/// Intrinsics the analysis recognizes directly (rather than via the stdlib
/// signature matcher).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicKind {
    /// `VArray` element read: operands `[varray, index]`.
    VArrayGet,
    /// `VArray` element write: operands `[varray, index, value]`.
    VArraySet,
    /// `VArray` length query: operand `[varray]`.
    VArraySize,
}

/// Callee description attached to `Apply` expressions.
///
/// The analysis recognizes standard-library operations by matching on this
/// data (name + declaring type + package + arity), never by nominal linkage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalleeInfo {
    /// Function or method name (`"init"`, `"get"`, `"[]"`, ...).
    pub name: String,
    /// Name of the declaring type, empty for free functions.
    pub declaring_type: String,
    /// Owning package name (`"std.core"`, ...).
    pub package: String,
    /// Number of explicit parameters, excluding the receiver.
    pub param_count: usize,
}

impl CalleeInfo {
    /// Creates a callee description.
    #[must_use]
    pub fn new(name: &str, declaring_type: &str, package: &str, param_count: usize) -> Self {
        Self {
            name: name.to_string(),
            declaring_type: declaring_type.to_string(),
            package: package.to_string(),
            param_count,
        }
    }
}

/// Operation kind tag of an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Materializes a literal constant.
    Constant(Literal),
    /// Unary operation on `operands[0]`.
    Unary(UnaryOp),
    /// Binary operation on `operands[0]`, `operands[1]`.
    Binary(BinaryOp),
    /// Numeric/reference cast of `operands[0]` to the result type.
    TypeCast,
    /// Heap/struct allocation of the given type.
    Allocate(ChirType),
    /// Reads field `index` of `operands[0]`.
    Field(usize),
    /// Writes `operands[1]` into field `index` of `operands[0]`.
    StoreField(usize),
    /// Reads through the reference `operands[0]`.
    Load,
    /// Writes `operands[1]` through the reference `operands[0]`.
    Store,
    /// Call to the described callee; receiver (if any) is `operands[0]`.
    Apply(CalleeInfo),
    /// Directly recognized intrinsic.
    Intrinsic(IntrinsicKind),
    /// Debug/trace marker; analysis renders `operands[0]`'s abstract value
    /// to the trace sink and otherwise treats it as the identity.
    Debug,
}

/// A CHIR expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    id: ExprId,
    kind: ExprKind,
    operands: Vec<ValueId>,
    result: ValueId,
    overflow: OverflowStrategy,
    loc: Location,
}

impl Expression {
    /// Creates a new expression.
    #[must_use]
    pub fn new(
        id: ExprId,
        kind: ExprKind,
        operands: Vec<ValueId>,
        result: ValueId,
        overflow: OverflowStrategy,
        loc: Location,
    ) -> Self {
        Self {
            id,
            kind,
            operands,
            result,
            overflow,
            loc,
        }
    }

    /// Returns the expression's stable id.
    #[must_use]
    pub const fn id(&self) -> ExprId {
        self.id
    }

    /// Returns the operation-kind tag.
    #[must_use]
    pub const fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Returns the operand values in order.
    #[must_use]
    pub fn operands(&self) -> &[ValueId] {
        &self.operands
    }

    /// Returns operand `i`, panicking if the IR is malformed.
    ///
    /// Transfer functions only call this for arities the kind tag guarantees.
    #[must_use]
    pub fn operand(&self, i: usize) -> ValueId {
        self.operands[i]
    }

    /// Returns the value this expression defines.
    #[must_use]
    pub const fn result(&self) -> ValueId {
        self.result
    }

    /// Returns the declared overflow strategy.
    #[must_use]
    pub const fn overflow(&self) -> OverflowStrategy {
        self.overflow
    }

    /// Returns the source location.
    #[must_use]
    pub const fn location(&self) -> Location {
        self.loc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_op_classes() {
        assert!(BinaryOp::Add.is_arithmetic());
        assert!(BinaryOp::Exp.is_arithmetic());
        assert!(!BinaryOp::Shl.is_arithmetic());
        assert!(BinaryOp::Shr.is_shift());
        assert!(BinaryOp::Eq.is_relational());
        assert!(BinaryOp::And.is_logical());
        assert!(!BinaryOp::BitAnd.is_logical());
    }

    #[test]
    fn test_op_display() {
        assert_eq!(BinaryOp::Exp.to_string(), "**");
        assert_eq!(BinaryOp::Ne.to_string(), "!=");
        assert_eq!(UnaryOp::BitNot.to_string(), "~");
    }
}
