//! Recognition of standard-library operations.
//!
//! The analyses never link against the standard library; they recognize the
//! handful of operations they model by matching `Apply` callees structurally
//! on name, declaring type, package and arity. All known signatures live in
//! one table so adding a recognized operation is a one-line change.

use crate::chir::CalleeInfo;

/// Standard-library operations the analyses model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StdlibOp {
    /// `Array<T>(size, ...)`: binds the array's tracked length to `size`.
    ArrayInit,
    /// `Array.slice(start, len)`: the result's tracked length is `len`.
    ArraySlice,
    /// `Array.get(index)`: checked element read.
    ArrayGet,
    /// `Array[index]` read.
    ArrayIndexGet,
    /// `Array[index] = value` write.
    ArrayIndexSet,
    /// `Array.size` getter.
    ArraySize,
    /// `Range<T>(start, end, step)`: a provably zero `step` always throws.
    RangeInit,
}

#[derive(Debug)]
struct Signature {
    package: &'static str,
    declaring_type: &'static str,
    name: &'static str,
    param_count: usize,
    op: StdlibOp,
}

/// Lookup table from callee shape to [`StdlibOp`].
#[derive(Debug)]
pub struct SignatureTable {
    entries: Vec<Signature>,
}

impl Default for SignatureTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl SignatureTable {
    /// The table of recognized `std.core` operations.
    #[must_use]
    pub fn standard() -> Self {
        let sig = |package, declaring_type, name, param_count, op| Signature {
            package,
            declaring_type,
            name,
            param_count,
            op,
        };
        Self {
            entries: vec![
                sig("std.core", "Array", "init", 1, StdlibOp::ArrayInit),
                sig("std.core", "Array", "init", 2, StdlibOp::ArrayInit),
                sig("std.core", "Array", "slice", 2, StdlibOp::ArraySlice),
                sig("std.core", "Array", "get", 1, StdlibOp::ArrayGet),
                sig("std.core", "Array", "[]", 1, StdlibOp::ArrayIndexGet),
                sig("std.core", "Array", "[]", 2, StdlibOp::ArrayIndexSet),
                sig("std.core", "Array", "$sizeget", 0, StdlibOp::ArraySize),
                sig("std.core", "Range", "init", 3, StdlibOp::RangeInit),
            ],
        }
    }

    /// Matches a callee against the table.
    #[must_use]
    pub fn lookup(&self, callee: &CalleeInfo) -> Option<StdlibOp> {
        self.entries
            .iter()
            .find(|s| {
                s.name == callee.name
                    && s.declaring_type == callee.declaring_type
                    && s.package == callee.package
                    && s.param_count == callee.param_count
            })
            .map(|s| s.op)
    }
}
