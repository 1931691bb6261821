//! CHIR functions.
//!
//! A function owns its value table and its basic blocks. The analysis treats
//! functions as read-only: all computed facts live in the analysis' own
//! state, keyed by value and expression ids.

use crate::{
    chir::{
        block::BasicBlock,
        types::ChirType,
        value::{Value, ValueId},
    },
    Error, Result,
};
use std::fmt;

/// Identity of a function within a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub u32);

impl fmt::Display for FuncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

/// A CHIR function body: parameters, value table, and basic blocks.
#[derive(Debug, Clone)]
pub struct Func {
    id: FuncId,
    name: String,
    params: Vec<ValueId>,
    values: Vec<Value>,
    blocks: Vec<BasicBlock>,
    entry: usize,
}

impl Func {
    /// Creates a function. Prefer [`crate::chir::FuncBuilder`] outside of IR
    /// construction code.
    #[must_use]
    pub fn new(
        id: FuncId,
        name: String,
        params: Vec<ValueId>,
        values: Vec<Value>,
        blocks: Vec<BasicBlock>,
        entry: usize,
    ) -> Self {
        Self {
            id,
            name,
            params,
            values,
            blocks,
            entry,
        }
    }

    /// Returns the function id.
    #[must_use]
    pub const fn id(&self) -> FuncId {
        self.id
    }

    /// Returns the function name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter value ids in declaration order.
    #[must_use]
    pub fn params(&self) -> &[ValueId] {
        &self.params
    }

    /// Returns the entry block index.
    #[must_use]
    pub const fn entry(&self) -> usize {
        self.entry
    }

    /// Returns a block by index.
    #[must_use]
    pub fn block(&self, idx: usize) -> Option<&BasicBlock> {
        self.blocks.get(idx)
    }

    /// Returns all blocks in index order.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Returns the number of basic blocks.
    ///
    /// The driver's pool-strategy and skip policies key off this count.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns a value by id. Synthetic ids minted by the analysis have no
    /// table entry and return `None`.
    #[must_use]
    pub fn value(&self, id: ValueId) -> Option<&Value> {
        if id.is_synthetic() {
            return None;
        }
        self.values.get(id.index())
    }

    /// Returns the static type of a value, if it has a table entry.
    #[must_use]
    pub fn value_ty(&self, id: ValueId) -> Option<&ChirType> {
        self.value(id).map(Value::ty)
    }

    /// Returns all values in the table.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Validates the structural invariants the engine relies on: a non-empty
    /// body, an in-range entry, and in-range terminator successors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyFunction`] or [`Error::InvalidBlock`] when the
    /// body is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.blocks.is_empty() {
            return Err(Error::EmptyFunction(self.name.clone()));
        }
        if self.entry >= self.blocks.len() {
            return Err(Error::InvalidBlock {
                block: self.entry,
                count: self.blocks.len(),
            });
        }
        for block in &self.blocks {
            for succ in block.terminator().successors() {
                if succ >= self.blocks.len() {
                    return Err(Error::InvalidBlock {
                        block: succ,
                        count: self.blocks.len(),
                    });
                }
            }
        }
        Ok(())
    }
}
