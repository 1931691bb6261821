//! The CHIR mid-level IR consumed by the analysis.
//!
//! CHIR is a control-flow graph of basic blocks; each block is an ordered
//! sequence of [`Expression`]s ending in exactly one [`Terminator`]. Values
//! are SSA-like (single assignment) and typed. This module is deliberately
//! a *consumer's view* of the IR: enough structure for the dataflow engine
//! and its tests, none of the construction/verification machinery of the
//! surrounding compiler.

mod block;
mod builder;
mod expr;
mod function;
mod types;
mod value;

pub use block::{BasicBlock, Terminator};
pub use builder::{BlockBuilder, FuncBuilder};
pub use expr::{BinaryOp, CalleeInfo, ExprId, ExprKind, Expression, IntrinsicKind, UnaryOp};
pub use function::{Func, FuncId};
pub use types::{ChirType, FloatKind, IntKind, Location, OverflowStrategy};
pub use value::{Literal, Value, ValueId, ValueKind};
