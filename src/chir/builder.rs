//! Closure-based builder for constructing CHIR functions.
//!
//! Primarily used by tests and examples; the production compiler lowers its
//! AST through its own emission path. The builder assigns value and
//! expression ids, tracks per-expression locations (one synthetic line per
//! expression so diagnostics are distinguishable), and checks that every
//! block is terminated.
//!
//! # Example
//!
//! ```rust
//! use chir_dataflow::chir::{BinaryOp, ChirType, FuncBuilder, IntKind};
//!
//! let mut fb = FuncBuilder::new("mul_by_zero");
//! let x = fb.param(ChirType::Int(IntKind::I32));
//! let func = fb.build_with(|f| {
//!     f.block(0, |b| {
//!         let zero = b.const_int(0, IntKind::I32);
//!         b.binary(BinaryOp::Mul, x, zero, ChirType::Int(IntKind::I32));
//!         b.exit();
//!     });
//! });
//! assert_eq!(func.block_count(), 1);
//! ```

use crate::chir::{
    block::{BasicBlock, Terminator},
    expr::{BinaryOp, CalleeInfo, ExprId, ExprKind, Expression, IntrinsicKind, UnaryOp},
    function::{Func, FuncId},
    types::{ChirType, FloatKind, IntKind, Location, OverflowStrategy},
    value::{Literal, Value, ValueId, ValueKind},
};

/// Builds a [`Func`] incrementally.
pub struct FuncBuilder {
    id: FuncId,
    name: String,
    params: Vec<ValueId>,
    values: Vec<Value>,
    blocks: Vec<BasicBlock>,
    next_expr: u32,
    next_line: u32,
}

impl FuncBuilder {
    /// Creates a builder for a function with the given name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: FuncId(0),
            name: name.to_string(),
            params: Vec::new(),
            values: Vec::new(),
            blocks: Vec::new(),
            next_expr: 0,
            next_line: 0,
        }
    }

    /// Overrides the function id (defaults to 0).
    #[must_use]
    pub fn with_id(mut self, id: FuncId) -> Self {
        self.id = id;
        self
    }

    /// Declares a parameter and returns its value id.
    pub fn param(&mut self, ty: ChirType) -> ValueId {
        let id = self.fresh_value(ty, ValueKind::Param(self.params.len()));
        self.params.push(id);
        id
    }

    /// Declares a package-level global, optionally with its resolved literal
    /// initializer, and returns its value id.
    pub fn global(&mut self, ty: ChirType, init: Option<Literal>) -> ValueId {
        self.fresh_value(ty, ValueKind::Global(init))
    }

    /// Runs `body` against the builder and finishes the function.
    ///
    /// Blocks must be added with contiguous indices starting at 0; block 0 is
    /// the entry.
    #[must_use]
    pub fn build_with(mut self, body: impl FnOnce(&mut Self)) -> Func {
        body(&mut self);
        Func::new(
            self.id,
            self.name,
            self.params,
            self.values,
            self.blocks,
            0,
        )
    }

    /// Adds block `id`, populated by `body`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not the next block index or the closure leaves the
    /// block unterminated.
    pub fn block(&mut self, id: usize, body: impl FnOnce(&mut BlockBuilder<'_>)) {
        assert_eq!(id, self.blocks.len(), "blocks must be added in order");
        let mut bb = BlockBuilder {
            func: self,
            id,
            exprs: Vec::new(),
            terminator: None,
        };
        body(&mut bb);
        let terminator = bb
            .terminator
            .take()
            .unwrap_or_else(|| panic!("block {id} has no terminator"));
        let exprs = std::mem::take(&mut bb.exprs);
        self.blocks.push(BasicBlock::new(id, exprs, terminator));
    }

    fn fresh_value(&mut self, ty: ChirType, kind: ValueKind) -> ValueId {
        let id = ValueId(u32::try_from(self.values.len()).expect("value table overflow"));
        self.values.push(Value::new(id, ty, kind));
        id
    }

    fn fresh_expr(&mut self) -> (ExprId, Location) {
        let id = ExprId(self.next_expr);
        self.next_expr += 1;
        self.next_line += 1;
        (id, Location::new(0, self.next_line, 1))
    }
}

/// Builds one basic block inside [`FuncBuilder::block`].
pub struct BlockBuilder<'a> {
    func: &'a mut FuncBuilder,
    id: usize,
    exprs: Vec<Expression>,
    terminator: Option<Terminator>,
}

impl BlockBuilder<'_> {
    fn push(
        &mut self,
        kind: ExprKind,
        operands: Vec<ValueId>,
        ty: ChirType,
        vkind: ValueKind,
        overflow: OverflowStrategy,
    ) -> ValueId {
        let result = self.func.fresh_value(ty, vkind);
        let (id, loc) = self.func.fresh_expr();
        self.exprs
            .push(Expression::new(id, kind, operands, result, overflow, loc));
        result
    }

    /// Returns the id of the most recently added expression.
    ///
    /// # Panics
    ///
    /// Panics if the block has no expressions yet.
    #[must_use]
    pub fn last_expr_id(&self) -> ExprId {
        self.exprs.last().expect("no expressions in block").id()
    }

    /// Emits a signed integer constant.
    pub fn const_int(&mut self, v: i64, kind: IntKind) -> ValueId {
        let lit = Literal::Int(v);
        self.push(
            ExprKind::Constant(lit.clone()),
            vec![],
            ChirType::Int(kind),
            ValueKind::Literal(lit),
            OverflowStrategy::Throwing,
        )
    }

    /// Emits an unsigned integer constant.
    pub fn const_uint(&mut self, v: u64, kind: IntKind) -> ValueId {
        let lit = Literal::UInt(v);
        self.push(
            ExprKind::Constant(lit.clone()),
            vec![],
            ChirType::Int(kind),
            ValueKind::Literal(lit),
            OverflowStrategy::Throwing,
        )
    }

    /// Emits a boolean constant.
    pub fn const_bool(&mut self, v: bool) -> ValueId {
        let lit = Literal::Bool(v);
        self.push(
            ExprKind::Constant(lit.clone()),
            vec![],
            ChirType::Bool,
            ValueKind::Literal(lit),
            OverflowStrategy::Throwing,
        )
    }

    /// Emits a float constant.
    pub fn const_float(&mut self, v: f64, kind: FloatKind) -> ValueId {
        let lit = Literal::Float(v);
        self.push(
            ExprKind::Constant(lit.clone()),
            vec![],
            ChirType::Float(kind),
            ValueKind::Literal(lit),
            OverflowStrategy::Throwing,
        )
    }

    /// Emits a string constant.
    pub fn const_str(&mut self, v: &str) -> ValueId {
        let lit = Literal::Str(v.to_string());
        self.push(
            ExprKind::Constant(lit.clone()),
            vec![],
            ChirType::Str,
            ValueKind::Literal(lit),
            OverflowStrategy::Throwing,
        )
    }

    /// Emits a rune constant.
    pub fn const_rune(&mut self, v: char) -> ValueId {
        let lit = Literal::Rune(v);
        self.push(
            ExprKind::Constant(lit.clone()),
            vec![],
            ChirType::Rune,
            ValueKind::Literal(lit),
            OverflowStrategy::Throwing,
        )
    }

    /// Emits a unary operation.
    pub fn unary(&mut self, op: UnaryOp, v: ValueId, ty: ChirType) -> ValueId {
        self.push(
            ExprKind::Unary(op),
            vec![v],
            ty,
            ValueKind::Local,
            OverflowStrategy::Throwing,
        )
    }

    /// Emits a binary operation with the default (throwing) overflow
    /// strategy.
    pub fn binary(&mut self, op: BinaryOp, l: ValueId, r: ValueId, ty: ChirType) -> ValueId {
        self.binary_with(op, l, r, ty, OverflowStrategy::Throwing)
    }

    /// Emits a binary operation with an explicit overflow strategy.
    pub fn binary_with(
        &mut self,
        op: BinaryOp,
        l: ValueId,
        r: ValueId,
        ty: ChirType,
        overflow: OverflowStrategy,
    ) -> ValueId {
        self.push(ExprKind::Binary(op), vec![l, r], ty, ValueKind::Local, overflow)
    }

    /// Emits a numeric cast to `ty`.
    pub fn cast(&mut self, v: ValueId, ty: ChirType, overflow: OverflowStrategy) -> ValueId {
        self.push(ExprKind::TypeCast, vec![v], ty, ValueKind::Local, overflow)
    }

    /// Emits an allocation of `ty`; the result is a reference to it.
    pub fn allocate(&mut self, ty: ChirType) -> ValueId {
        let result_ty = ChirType::Ref(Box::new(ty.clone()));
        self.push(
            ExprKind::Allocate(ty),
            vec![],
            result_ty,
            ValueKind::Local,
            OverflowStrategy::Throwing,
        )
    }

    /// Emits a field read.
    pub fn field(&mut self, base: ValueId, index: usize, ty: ChirType) -> ValueId {
        self.push(
            ExprKind::Field(index),
            vec![base],
            ty,
            ValueKind::Local,
            OverflowStrategy::Throwing,
        )
    }

    /// Emits a field write; the result is unit.
    pub fn store_field(&mut self, base: ValueId, index: usize, value: ValueId) -> ValueId {
        self.push(
            ExprKind::StoreField(index),
            vec![base, value],
            ChirType::Unit,
            ValueKind::Local,
            OverflowStrategy::Throwing,
        )
    }

    /// Emits a load through a reference.
    pub fn load(&mut self, r: ValueId, ty: ChirType) -> ValueId {
        self.push(
            ExprKind::Load,
            vec![r],
            ty,
            ValueKind::Local,
            OverflowStrategy::Throwing,
        )
    }

    /// Emits a store through a reference; the result is unit.
    pub fn store(&mut self, r: ValueId, value: ValueId) -> ValueId {
        self.push(
            ExprKind::Store,
            vec![r, value],
            ChirType::Unit,
            ValueKind::Local,
            OverflowStrategy::Throwing,
        )
    }

    /// Emits a call.
    pub fn apply(&mut self, callee: CalleeInfo, operands: Vec<ValueId>, ty: ChirType) -> ValueId {
        self.push(
            ExprKind::Apply(callee),
            operands,
            ty,
            ValueKind::Local,
            OverflowStrategy::Throwing,
        )
    }

    /// Emits an intrinsic.
    pub fn intrinsic(
        &mut self,
        kind: IntrinsicKind,
        operands: Vec<ValueId>,
        ty: ChirType,
    ) -> ValueId {
        self.push(
            ExprKind::Intrinsic(kind),
            operands,
            ty,
            ValueKind::Local,
            OverflowStrategy::Throwing,
        )
    }

    /// Emits a debug/trace marker for `v`.
    pub fn debug(&mut self, v: ValueId) -> ValueId {
        self.push(
            ExprKind::Debug,
            vec![v],
            ChirType::Unit,
            ValueKind::Local,
            OverflowStrategy::Throwing,
        )
    }

    /// Terminates with an unconditional jump.
    pub fn goto(&mut self, target: usize) {
        self.set_terminator(Terminator::Goto(target));
    }

    /// Terminates with a two-way branch.
    pub fn branch(&mut self, cond: ValueId, true_block: usize, false_block: usize) {
        self.set_terminator(Terminator::Branch {
            cond,
            true_block,
            false_block,
        });
    }

    /// Terminates with a multi-way branch.
    pub fn multibranch(&mut self, value: ValueId, cases: Vec<(u64, usize)>, default: usize) {
        self.set_terminator(Terminator::MultiBranch {
            value,
            cases,
            default,
        });
    }

    /// Terminates with a function exit.
    pub fn exit(&mut self) {
        self.set_terminator(Terminator::Exit);
    }

    /// Terminates by raising an exception.
    pub fn raise(&mut self, error_block: Option<usize>) {
        self.set_terminator(Terminator::Raise { error_block });
    }

    fn set_terminator(&mut self, t: Terminator) {
        assert!(
            self.terminator.is_none(),
            "block {} already terminated",
            self.id
        );
        self.terminator = Some(t);
    }
}
