//! Basic blocks and terminators.
//!
//! A CHIR basic block is an ordered sequence of expressions ending in exactly
//! one terminator. Terminators are the only way control leaves a block; the
//! analysis narrows conditional terminators when the condition's abstract
//! value is known.

use std::fmt;

use crate::chir::{expr::Expression, value::ValueId};

/// Block terminator.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    /// Unconditional jump.
    Goto(usize),
    /// Two-way branch on a boolean condition.
    Branch {
        /// The boolean condition value.
        cond: ValueId,
        /// Successor when the condition is true.
        true_block: usize,
        /// Successor when the condition is false.
        false_block: usize,
    },
    /// Multi-way branch on an integer value.
    MultiBranch {
        /// The scrutinee value.
        value: ValueId,
        /// `(case constant, successor)` pairs.
        cases: Vec<(u64, usize)>,
        /// Successor when no case matches.
        default: usize,
    },
    /// Function exit.
    Exit,
    /// Raises a runtime exception; control continues at the error successor
    /// when the enclosing function has a handler for it.
    Raise {
        /// Landing block for the in-function handler, if any.
        error_block: Option<usize>,
    },
}

impl Terminator {
    /// Returns all successor block indices, ignoring abstract narrowing.
    #[must_use]
    pub fn successors(&self) -> Vec<usize> {
        match self {
            Self::Goto(b) => vec![*b],
            Self::Branch {
                true_block,
                false_block,
                ..
            } => vec![*true_block, *false_block],
            Self::MultiBranch { cases, default, .. } => {
                let mut out: Vec<usize> = cases.iter().map(|(_, b)| *b).collect();
                out.push(*default);
                out
            }
            Self::Exit => Vec::new(),
            Self::Raise { error_block } => error_block.iter().copied().collect(),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Goto(b) => write!(f, "goto bb{b}"),
            Self::Branch {
                cond,
                true_block,
                false_block,
            } => write!(f, "br {cond} ? bb{true_block} : bb{false_block}"),
            Self::MultiBranch { value, default, .. } => {
                write!(f, "switch {value} default bb{default}")
            }
            Self::Exit => write!(f, "exit"),
            Self::Raise { error_block } => match error_block {
                Some(b) => write!(f, "raise -> bb{b}"),
                None => write!(f, "raise"),
            },
        }
    }
}

/// A basic block: ordered expressions plus exactly one terminator.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    id: usize,
    exprs: Vec<Expression>,
    terminator: Terminator,
}

impl BasicBlock {
    /// Creates a block.
    #[must_use]
    pub fn new(id: usize, exprs: Vec<Expression>, terminator: Terminator) -> Self {
        Self {
            id,
            exprs,
            terminator,
        }
    }

    /// Returns the block index.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Returns the expressions in statement order.
    #[must_use]
    pub fn expressions(&self) -> &[Expression] {
        &self.exprs
    }

    /// Returns the terminator.
    #[must_use]
    pub const fn terminator(&self) -> &Terminator {
        &self.terminator
    }
}
