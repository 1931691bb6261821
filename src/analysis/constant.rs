//! Exact constant-value analysis.
//!
//! Instantiates the fixpoint engine with the [`ConstValue`] payload and the
//! folding rules of the language's checked arithmetic:
//!
//! - algebraic identities fold without knowing both operands (`x * 0`,
//!   `x - x`, `x % 1`, short-circuit `false && x`)
//! - fully constant expressions evaluate exactly and are checked against the
//!   result type's overflow strategy
//! - division/modulo by a provably zero divisor, invalid shift amounts,
//!   provably out-of-bounds array accesses and zero-step ranges are definite
//!   errors, diagnosed once during the stable pass
//! - checked operations that provably pass record their [`ExprId`] so
//!   codegen can elide the runtime check
//!
//! The analysis never mutates the IR; everything it learns is published in
//! [`ConstantResults`].

use std::collections::{HashMap, HashSet};

use crate::analysis::domain::{AbstractDomain, ConstValue};
use crate::analysis::engine::{
    self, EngineResults, TransferFunctions, OVERHEAD_BLOCK_SIZE, USE_ACTIVE_BLOCK_SIZE,
};
use crate::analysis::object::{FieldKey, ObjectGraph};
use crate::analysis::pool::{ActiveStatePool, DefaultStatePool, StatePool};
use crate::analysis::signature::{SignatureTable, StdlibOp};
use crate::analysis::state::State;
use crate::analysis::ExceptionKind;
use crate::chir::{
    BinaryOp, CalleeInfo, ChirType, ExprId, ExprKind, Expression, Func, IntKind, IntrinsicKind,
    Literal, OverflowStrategy, Terminator, UnaryOp, ValueId,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLog};
use crate::Result;

type Domain = AbstractDomain<ConstValue>;

/// Everything the constant analysis learned about one function.
#[derive(Debug, Default)]
pub struct ConstantResults {
    /// Folded constants visible at each reachable block's entry.
    pub constants: HashMap<usize, HashMap<ValueId, ConstValue>>,
    /// Overflow-checked expressions that provably never overflow.
    pub never_overflow: HashSet<ExprId>,
    /// Array/varray accesses that are provably in bounds.
    pub in_bounds: HashSet<ExprId>,
    /// Per-expression outcome of checked operations.
    pub exceptions: HashMap<ExprId, ExceptionKind>,
    /// Definite-error findings.
    pub diagnostics: Vec<Diagnostic>,
    /// Rendered fold trace, when tracing was requested.
    pub trace: Vec<String>,
    /// True when the function exceeded the block-count limit and was not
    /// analyzed.
    pub skipped: bool,
}

impl ConstantResults {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Folded constant of `value` at the entry of `block`.
    #[must_use]
    pub fn constant_at(&self, block: usize, value: ValueId) -> Option<&ConstValue> {
        self.constants.get(&block)?.get(&value)
    }
}

/// Runs the constant analysis on one function, picking the state-pool
/// strategy from the block count.
pub fn check_func(func: &Func, table: &SignatureTable, trace: bool) -> Result<ConstantResults> {
    let blocks = func.block_count();
    if blocks > OVERHEAD_BLOCK_SIZE {
        return Ok(ConstantResults::skipped());
    }

    let mut analysis = ConstAnalysis::new(func, table).with_trace(trace);
    if blocks > USE_ACTIVE_BLOCK_SIZE {
        let results: EngineResults<ConstValue, ActiveStatePool<Domain>> =
            engine::analyze(func, &mut analysis)?;
        Ok(analysis.into_results(&results))
    } else {
        let results: EngineResults<ConstValue, DefaultStatePool<Domain>> =
            engine::analyze(func, &mut analysis)?;
        Ok(analysis.into_results(&results))
    }
}

/// Transfer functions of the constant-value analysis.
pub struct ConstAnalysis<'a> {
    func: &'a Func,
    table: &'a SignatureTable,
    graph: ObjectGraph,
    diagnostics: DiagnosticLog,
    never_overflow: HashSet<ExprId>,
    in_bounds: HashSet<ExprId>,
    exceptions: HashMap<ExprId, ExceptionKind>,
    trace: bool,
    trace_lines: Vec<String>,
}

impl<'a> ConstAnalysis<'a> {
    /// Creates the analysis for one function.
    #[must_use]
    pub fn new(func: &'a Func, table: &'a SignatureTable) -> Self {
        Self {
            func,
            table,
            graph: ObjectGraph::new(),
            diagnostics: DiagnosticLog::new(),
            never_overflow: HashSet::new(),
            in_bounds: HashSet::new(),
            exceptions: HashMap::new(),
            trace: false,
            trace_lines: Vec::new(),
        }
    }

    /// Enables the fold trace.
    #[must_use]
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Packs the converged engine states and the collected side channels
    /// into a [`ConstantResults`].
    pub fn into_results<S: StatePool<Domain>>(
        self,
        results: &EngineResults<ConstValue, S>,
    ) -> ConstantResults {
        let mut constants = HashMap::new();
        for (block, state) in results.iter() {
            let folded: HashMap<ValueId, ConstValue> = state
                .iter()
                .filter_map(|(id, v)| v.value().map(|p| (id, p.clone())))
                .collect();
            constants.insert(block, folded);
        }
        ConstantResults {
            constants,
            never_overflow: self.never_overflow,
            in_bounds: self.in_bounds,
            exceptions: self.exceptions,
            diagnostics: self.diagnostics.drain(),
            trace: self.trace_lines,
            skipped: false,
        }
    }

    fn int_kind(&self, id: ValueId) -> Option<IntKind> {
        self.func.value_ty(id).and_then(ChirType::int_kind)
    }

    fn value_ty(&self, id: ValueId) -> Option<&ChirType> {
        self.func.value_ty(id)
    }

    /// Abstract value of `id`: tracked state first, literal fallback.
    fn resolve<S: StatePool<Domain>>(&self, state: &State<ConstValue, S>, id: ValueId) -> Domain {
        let tracked = state.get(id);
        if !tracked.is_top() {
            return tracked;
        }
        self.func
            .value(id)
            .and_then(|v| v.literal())
            .map_or(AbstractDomain::Top, lift_literal)
    }

    fn resolved_math<S: StatePool<Domain>>(
        &self,
        state: &State<ConstValue, S>,
        id: ValueId,
    ) -> Option<i128> {
        self.resolve(state, id).value().and_then(math_value)
    }

    fn note_exception(&mut self, id: ExprId, kind: ExceptionKind, is_stable: bool) {
        if is_stable {
            self.exceptions.insert(id, kind);
        }
    }

    /// A fold whose checked semantics provably pass.
    fn success_fold(&mut self, expr: &Expression, value: ConstValue, is_stable: bool) -> Domain {
        self.note_exception(expr.id(), ExceptionKind::Success, is_stable);
        if is_stable {
            self.never_overflow.insert(expr.id());
        }
        AbstractDomain::Val(value)
    }

    fn fail(
        &mut self,
        expr: &Expression,
        kind: DiagnosticKind,
        message: String,
        note: Option<String>,
        is_stable: bool,
    ) -> Domain {
        self.note_exception(expr.id(), ExceptionKind::Fail, is_stable);
        if is_stable {
            let builder = self
                .diagnostics
                .report(kind)
                .at(expr.location())
                .message(message);
            if let Some(note) = note {
                let _ = builder.note(note);
            }
        }
        AbstractDomain::Top
    }

    /// Checks an exactly computed arithmetic result against the destination
    /// kind and the expression's overflow strategy.
    fn finish_arith(
        &mut self,
        expr: &Expression,
        math: i128,
        kind: IntKind,
        is_stable: bool,
        render: impl FnOnce() -> String,
    ) -> Domain {
        if kind.contains(math) {
            if expr.overflow() == OverflowStrategy::Throwing {
                return self.success_fold(expr, const_from_math(math, kind), is_stable);
            }
            self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
            return AbstractDomain::Val(const_from_math(math, kind));
        }
        match expr.overflow() {
            OverflowStrategy::Throwing => self.fail(
                expr,
                DiagnosticKind::ArithmeticOverflow,
                format!("the result of '{}' overflows {kind}", render()),
                Some(format!("{kind} represents {}", kind.range_hint())),
                is_stable,
            ),
            OverflowStrategy::Wrapping => {
                self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                let span = 1i128 << kind.width();
                let bits = math.rem_euclid(span) as u64;
                AbstractDomain::Val(const_from_bits(bits, kind))
            }
            OverflowStrategy::Saturating => {
                self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                let clamped = math.clamp(kind.min_value(), kind.max_value());
                AbstractDomain::Val(const_from_math(clamped, kind))
            }
        }
    }

    fn eval_unary<S: StatePool<Domain>>(
        &mut self,
        state: &State<ConstValue, S>,
        expr: &Expression,
        op: UnaryOp,
        is_stable: bool,
    ) -> Domain {
        let operand = self.resolve(state, expr.operand(0));
        match op {
            UnaryOp::Neg => {
                if let Some(kind) = self.int_kind(expr.result()) {
                    let Some(m) = operand.value().and_then(math_value) else {
                        self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                        return AbstractDomain::Top;
                    };
                    self.finish_arith(expr, -m, kind, is_stable, || format!("-{m}"))
                } else if let Some(f) = operand.value().and_then(ConstValue::as_f64) {
                    AbstractDomain::Val(ConstValue::Float(-f))
                } else {
                    AbstractDomain::Top
                }
            }
            UnaryOp::Not => match operand.value().and_then(ConstValue::as_bool) {
                Some(b) => AbstractDomain::Val(ConstValue::Bool(!b)),
                None => AbstractDomain::Top,
            },
            UnaryOp::BitNot => {
                let Some(kind) = self.int_kind(expr.result()) else {
                    return AbstractDomain::Top;
                };
                match operand.value().map(|v| const_to_bits(v, kind)) {
                    Some(Some(bits)) => {
                        let mask = mask_of(kind);
                        AbstractDomain::Val(const_from_bits(!bits & mask, kind))
                    }
                    _ => AbstractDomain::Top,
                }
            }
        }
    }

    fn eval_binary<S: StatePool<Domain>>(
        &mut self,
        state: &State<ConstValue, S>,
        expr: &Expression,
        op: BinaryOp,
        is_stable: bool,
    ) -> Domain {
        if op.is_arithmetic() {
            return self.eval_arithmetic(state, expr, op, is_stable);
        }
        if op.is_shift() {
            return self.eval_shift(state, expr, op, is_stable);
        }
        if op.is_relational() {
            return self.eval_relational(state, expr, op);
        }
        if op.is_logical() {
            return self.eval_logical(state, expr, op);
        }
        self.eval_bitwise(state, expr, op)
    }

    fn eval_arithmetic<S: StatePool<Domain>>(
        &mut self,
        state: &State<ConstValue, S>,
        expr: &Expression,
        op: BinaryOp,
        is_stable: bool,
    ) -> Domain {
        let (lhs, rhs) = (expr.operand(0), expr.operand(1));
        let lv = self.resolve(state, lhs);
        let rv = self.resolve(state, rhs);
        let Some(kind) = self.int_kind(expr.result()) else {
            return eval_float_arith(&lv, &rv, op);
        };
        let lm = lv.value().and_then(math_value);
        let rm = rv.value().and_then(math_value);

        // Identities that fold without both operands.
        match op {
            BinaryOp::Mul if lm == Some(0) || rm == Some(0) => {
                return self.success_fold(expr, const_from_math(0, kind), is_stable);
            }
            BinaryOp::Div if rm == Some(0) => {
                return self.fail(
                    expr,
                    DiagnosticKind::DivisionByZero,
                    "the divisor of '/' is provably zero".to_string(),
                    None,
                    is_stable,
                );
            }
            BinaryOp::Mod if rm == Some(0) => {
                return self.fail(
                    expr,
                    DiagnosticKind::ModuloByZero,
                    "the divisor of '%' is provably zero".to_string(),
                    None,
                    is_stable,
                );
            }
            BinaryOp::Mod if rm == Some(1) => {
                return self.success_fold(expr, const_from_math(0, kind), is_stable);
            }
            BinaryOp::Sub if lhs == rhs => {
                return self.success_fold(expr, const_from_math(0, kind), is_stable);
            }
            // `a ** 0` folds before `0 ** a`, so `0 ** 0` is one.
            BinaryOp::Exp if rm == Some(0) => {
                return self.success_fold(expr, const_from_math(1, kind), is_stable);
            }
            BinaryOp::Exp if lm == Some(1) => {
                return self.success_fold(expr, const_from_math(1, kind), is_stable);
            }
            BinaryOp::Exp if lm == Some(0) && rm.is_some_and(|e| e > 0) => {
                return self.success_fold(expr, const_from_math(0, kind), is_stable);
            }
            _ => {}
        }

        let (Some(a), Some(b)) = (lm, rm) else {
            self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
            return AbstractDomain::Top;
        };
        let render = || format!("{a} {op} {b}");
        match op {
            BinaryOp::Add => self.finish_arith(expr, a + b, kind, is_stable, render),
            BinaryOp::Sub => self.finish_arith(expr, a - b, kind, is_stable, render),
            BinaryOp::Mul => self.finish_arith(expr, a * b, kind, is_stable, render),
            BinaryOp::Div => self.finish_arith(expr, a / b, kind, is_stable, render),
            BinaryOp::Mod => self.finish_arith(expr, a % b, kind, is_stable, render),
            BinaryOp::Exp => self.eval_exp(expr, a, b, kind, is_stable),
            _ => unreachable!("non-arithmetic op in arithmetic evaluation"),
        }
    }

    fn eval_exp(
        &mut self,
        expr: &Expression,
        base: i128,
        exp: i128,
        kind: IntKind,
        is_stable: bool,
    ) -> Domain {
        if exp < 0 {
            // Negative integer exponents are rejected upstream; nothing to
            // fold here.
            self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
            return AbstractDomain::Top;
        }
        // -1 cycles; never overflows.
        if base == -1 {
            let v = if exp % 2 == 0 { 1 } else { -1 };
            return self.finish_arith(expr, v, kind, is_stable, || format!("{base} ** {exp}"));
        }
        let exact = u32::try_from(exp)
            .ok()
            .and_then(|e| base.checked_pow(e));
        match exact {
            Some(v) => self.finish_arith(expr, v, kind, is_stable, || format!("{base} ** {exp}")),
            // Beyond i128: out of range for every integer kind.
            None => match expr.overflow() {
                OverflowStrategy::Throwing => self.fail(
                    expr,
                    DiagnosticKind::ArithmeticOverflow,
                    format!("the result of '{base} ** {exp}' overflows {kind}"),
                    Some(format!("{kind} represents {}", kind.range_hint())),
                    is_stable,
                ),
                OverflowStrategy::Wrapping => {
                    self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                    let span = 1u128 << kind.width();
                    let mut acc: u128 = 1;
                    let mut b = (base.rem_euclid(span as i128)) as u128;
                    let mut e = exp as u128;
                    while e > 0 {
                        if e & 1 == 1 {
                            acc = acc.wrapping_mul(b) % span;
                        }
                        b = b.wrapping_mul(b) % span;
                        e >>= 1;
                    }
                    AbstractDomain::Val(const_from_bits(acc as u64, kind))
                }
                OverflowStrategy::Saturating => {
                    self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                    let negative = base < 0 && exp % 2 == 1;
                    let v = if negative {
                        kind.min_value()
                    } else {
                        kind.max_value()
                    };
                    AbstractDomain::Val(const_from_math(v, kind))
                }
            },
        }
    }

    fn eval_shift<S: StatePool<Domain>>(
        &mut self,
        state: &State<ConstValue, S>,
        expr: &Expression,
        op: BinaryOp,
        is_stable: bool,
    ) -> Domain {
        let Some(kind) = self.int_kind(expr.result()) else {
            return AbstractDomain::Top;
        };
        let lhs_kind = self.int_kind(expr.operand(0)).unwrap_or(kind);
        let Some(amount) = self.resolved_math(state, expr.operand(1)) else {
            self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
            return AbstractDomain::Top;
        };
        if amount < 0 {
            return self.fail(
                expr,
                DiagnosticKind::InvalidShiftAmount,
                format!("shift amount is provably negative ({amount})"),
                None,
                is_stable,
            );
        }
        if amount >= i128::from(lhs_kind.width()) {
            return self.fail(
                expr,
                DiagnosticKind::InvalidShiftAmount,
                format!(
                    "shift amount {amount} reaches the {}-bit width of {lhs_kind}",
                    lhs_kind.width()
                ),
                None,
                is_stable,
            );
        }

        // A provably valid amount means the shift check always passes, even
        // when the shifted value is unknown.
        self.note_exception(expr.id(), ExceptionKind::Success, is_stable);
        let lv = self.resolve(state, expr.operand(0));
        let Some(cv) = lv.value() else {
            return AbstractDomain::Top;
        };
        let Some(bits) = const_to_bits(cv, lhs_kind) else {
            return AbstractDomain::Top;
        };
        let amount = amount as u32;
        let out = match op {
            BinaryOp::Shl => bits.wrapping_shl(amount) & mask_of(kind),
            BinaryOp::Shr if lhs_kind.is_signed() => {
                let v = sign_extend(bits, lhs_kind) >> amount;
                (v as u64) & mask_of(kind)
            }
            BinaryOp::Shr => (bits >> amount) & mask_of(kind),
            _ => unreachable!("non-shift op in shift evaluation"),
        };
        AbstractDomain::Val(const_from_bits(out, kind))
    }

    fn eval_relational<S: StatePool<Domain>>(
        &mut self,
        state: &State<ConstValue, S>,
        expr: &Expression,
        op: BinaryOp,
    ) -> Domain {
        let (lhs, rhs) = (expr.operand(0), expr.operand(1));
        let ty = self.value_ty(lhs);

        // `x op x` decides for every non-float type.
        let reflexive_ok = ty.is_some_and(|t| !t.is_float());
        if lhs == rhs && reflexive_ok {
            let b = matches!(op, BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq);
            return AbstractDomain::Val(ConstValue::Bool(b));
        }
        if ty.is_some_and(ChirType::is_unit) {
            let b = matches!(op, BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq);
            return AbstractDomain::Val(ConstValue::Bool(b));
        }

        let lv = self.resolve(state, lhs);
        let rv = self.resolve(state, rhs);
        let (Some(a), Some(b)) = (lv.value(), rv.value()) else {
            return AbstractDomain::Top;
        };
        match compare_consts(a, b, op) {
            Some(result) => AbstractDomain::Val(ConstValue::Bool(result)),
            None => AbstractDomain::Top,
        }
    }

    fn eval_logical<S: StatePool<Domain>>(
        &mut self,
        state: &State<ConstValue, S>,
        expr: &Expression,
        op: BinaryOp,
    ) -> Domain {
        let lv = self.resolve(state, expr.operand(0));
        let lb = lv.value().and_then(ConstValue::as_bool);
        match (op, lb) {
            (BinaryOp::And, Some(false)) => AbstractDomain::Val(ConstValue::Bool(false)),
            (BinaryOp::Or, Some(true)) => AbstractDomain::Val(ConstValue::Bool(true)),
            (_, Some(_)) => {
                // `true && x` / `false || x` take the right operand's value.
                let rv = self.resolve(state, expr.operand(1));
                match rv.value().and_then(ConstValue::as_bool) {
                    Some(b) => AbstractDomain::Val(ConstValue::Bool(b)),
                    None => AbstractDomain::Top,
                }
            }
            (_, None) => AbstractDomain::Top,
        }
    }

    fn eval_bitwise<S: StatePool<Domain>>(
        &mut self,
        state: &State<ConstValue, S>,
        expr: &Expression,
        op: BinaryOp,
    ) -> Domain {
        let Some(kind) = self.int_kind(expr.result()) else {
            return AbstractDomain::Top;
        };
        let lv = self.resolve(state, expr.operand(0));
        let rv = self.resolve(state, expr.operand(1));
        let (Some(a), Some(b)) = (
            lv.value().and_then(|v| const_to_bits(v, kind)),
            rv.value().and_then(|v| const_to_bits(v, kind)),
        ) else {
            return AbstractDomain::Top;
        };
        let out = match op {
            BinaryOp::BitAnd => a & b,
            BinaryOp::BitOr => a | b,
            BinaryOp::BitXor => a ^ b,
            _ => return AbstractDomain::Top,
        };
        AbstractDomain::Val(const_from_bits(out & mask_of(kind), kind))
    }

    fn eval_cast<S: StatePool<Domain>>(
        &mut self,
        state: &mut State<ConstValue, S>,
        expr: &Expression,
        is_stable: bool,
    ) -> Domain {
        let src_ty = self.value_ty(expr.operand(0)).cloned();
        let dst_kind = self.int_kind(expr.result());

        // Reference casts keep the field tree alive through aliasing.
        if src_ty.as_ref().is_some_and(ChirType::is_composite) {
            self.graph.alias(expr.result(), expr.operand(0));
            return AbstractDomain::Top;
        }

        let (Some(src), Some(dst)) = (src_ty.as_ref().and_then(ChirType::int_kind), dst_kind)
        else {
            // Float and other non-integer casts are not folded.
            return AbstractDomain::Top;
        };
        let Some(m) = self.resolved_math(state, expr.operand(0)) else {
            self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
            return AbstractDomain::Top;
        };
        debug_assert!(src.contains(m), "operand outside its own kind");
        self.finish_arith(expr, m, dst, is_stable, || format!("{m} as {dst}"))
    }

    fn eval_apply<S: StatePool<Domain>>(
        &mut self,
        state: &mut State<ConstValue, S>,
        expr: &Expression,
        callee: &CalleeInfo,
        is_stable: bool,
    ) -> Domain {
        match self.table.lookup(callee) {
            Some(StdlibOp::ArrayInit) => {
                let size = self.resolve(state, expr.operand(1));
                let slot = self.graph.slot(expr.operand(0), FieldKey::Length);
                state.update(slot, size);
                AbstractDomain::Top
            }
            Some(StdlibOp::ArraySlice) => {
                let len = self.resolve(state, expr.operand(2));
                let slot = self.graph.slot(expr.result(), FieldKey::Length);
                state.update(slot, len);
                AbstractDomain::Top
            }
            Some(StdlibOp::ArrayGet | StdlibOp::ArrayIndexGet) => {
                self.check_bounds(state, expr, expr.operand(0), expr.operand(1), is_stable);
                AbstractDomain::Top
            }
            Some(StdlibOp::ArrayIndexSet) => {
                self.check_bounds(state, expr, expr.operand(0), expr.operand(1), is_stable);
                AbstractDomain::Top
            }
            Some(StdlibOp::ArraySize) => self
                .graph
                .lookup_slot(expr.operand(0), FieldKey::Length)
                .map_or(AbstractDomain::Top, |slot| state.get(slot)),
            Some(StdlibOp::RangeInit) => {
                match self.resolved_math(state, expr.operand(3)) {
                    Some(0) => self.fail(
                        expr,
                        DiagnosticKind::RangeStepZero,
                        "the range step is provably zero".to_string(),
                        None,
                        is_stable,
                    ),
                    Some(_) => {
                        self.note_exception(expr.id(), ExceptionKind::Success, is_stable);
                        AbstractDomain::Top
                    }
                    None => {
                        self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                        AbstractDomain::Top
                    }
                }
            }
            None => {
                // The callee may retain and mutate anything reachable from
                // its reference arguments.
                for &op in expr.operands() {
                    if self.value_ty(op).is_some_and(ChirType::is_composite) {
                        state.set_to_top_or_top_ref(op, &self.graph);
                    }
                }
                AbstractDomain::Top
            }
        }
    }

    fn eval_intrinsic<S: StatePool<Domain>>(
        &mut self,
        state: &State<ConstValue, S>,
        expr: &Expression,
        kind: IntrinsicKind,
        is_stable: bool,
    ) -> Domain {
        let varray_len = self
            .value_ty(expr.operand(0))
            .map(ChirType::deref_once)
            .and_then(|t| match t {
                ChirType::VArray(_, n) => Some(*n as i128),
                _ => None,
            });
        match kind {
            IntrinsicKind::VArraySize => match varray_len {
                Some(n) => AbstractDomain::Val(ConstValue::Int(n as i64)),
                None => AbstractDomain::Top,
            },
            IntrinsicKind::VArrayGet | IntrinsicKind::VArraySet => {
                self.check_static_bounds(state, expr, expr.operand(1), varray_len, is_stable);
                AbstractDomain::Top
            }
        }
    }

    fn check_bounds<S: StatePool<Domain>>(
        &mut self,
        state: &State<ConstValue, S>,
        expr: &Expression,
        array: ValueId,
        index: ValueId,
        is_stable: bool,
    ) {
        let len = self
            .graph
            .lookup_slot(array, FieldKey::Length)
            .and_then(|slot| state.check_abstract_value(slot).and_then(math_value));
        self.check_static_bounds(state, expr, index, len, is_stable);
    }

    fn check_static_bounds<S: StatePool<Domain>>(
        &mut self,
        state: &State<ConstValue, S>,
        expr: &Expression,
        index: ValueId,
        len: Option<i128>,
        is_stable: bool,
    ) {
        let Some(idx) = self.resolved_math(state, index) else {
            self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
            return;
        };
        if idx < 0 {
            let _ = self.fail(
                expr,
                DiagnosticKind::IndexOutOfBounds,
                format!("index {idx} is provably negative"),
                None,
                is_stable,
            );
            return;
        }
        match len {
            Some(n) if idx >= n => {
                let _ = self.fail(
                    expr,
                    DiagnosticKind::IndexOutOfBounds,
                    format!("index {idx} is out of bounds for array of length {n}"),
                    None,
                    is_stable,
                );
            }
            Some(_) => {
                self.note_exception(expr.id(), ExceptionKind::Success, is_stable);
                if is_stable {
                    self.in_bounds.insert(expr.id());
                }
            }
            None => self.note_exception(expr.id(), ExceptionKind::NA, is_stable),
        }
    }
}

impl<'a, S: StatePool<Domain>> TransferFunctions<ConstValue, S> for ConstAnalysis<'a> {
    fn initial_state(&mut self, func: &Func) -> State<ConstValue, S> {
        let mut state = State::new();
        // Literal-initialized globals are entry facts.
        for value in func.values() {
            if let crate::chir::ValueKind::Global(Some(lit)) = value.kind() {
                state.update(value.id(), lift_literal(lit));
            }
        }
        state
    }

    fn transfer_expr(
        &mut self,
        state: &mut State<ConstValue, S>,
        expr: &Expression,
        is_stable: bool,
    ) {
        let value = match expr.kind() {
            ExprKind::Constant(lit) => lift_literal(lit),
            ExprKind::Unary(op) => self.eval_unary(state, expr, *op, is_stable),
            ExprKind::Binary(op) => self.eval_binary(state, expr, *op, is_stable),
            ExprKind::TypeCast => self.eval_cast(state, expr, is_stable),
            ExprKind::Allocate(_) => {
                self.graph.object_for(expr.result());
                AbstractDomain::Top
            }
            ExprKind::Field(idx) => {
                let slot = self.graph.slot(expr.operand(0), FieldKey::Field(*idx));
                state.get(slot)
            }
            ExprKind::StoreField(idx) => {
                let v = self.resolve(state, expr.operand(1));
                let slot = self.graph.slot(expr.operand(0), FieldKey::Field(*idx));
                state.update(slot, v);
                AbstractDomain::Top
            }
            ExprKind::Load => {
                let slot = self.graph.slot(expr.operand(0), FieldKey::Deref);
                state.get(slot)
            }
            ExprKind::Store => {
                let v = self.resolve(state, expr.operand(1));
                let slot = self.graph.slot(expr.operand(0), FieldKey::Deref);
                state.update(slot, v);
                AbstractDomain::Top
            }
            ExprKind::Apply(callee) => self.eval_apply(state, expr, callee, is_stable),
            ExprKind::Intrinsic(kind) => self.eval_intrinsic(state, expr, *kind, is_stable),
            ExprKind::Debug => {
                if self.trace && is_stable {
                    let rendered = self.resolve(state, expr.operand(0));
                    self.trace_lines
                        .push(format!("{} = {rendered}", expr.operand(0)));
                }
                AbstractDomain::Top
            }
        };
        if self.trace && is_stable {
            if let Some(folded) = value.value() {
                self.trace_lines
                    .push(format!("{} = {folded}", expr.result()));
            }
        }
        state.update(expr.result(), value);
    }

    fn transfer_terminator(
        &mut self,
        state: &State<ConstValue, S>,
        terminator: &Terminator,
        _is_stable: bool,
    ) -> Vec<usize> {
        match terminator {
            Terminator::Branch {
                cond,
                true_block,
                false_block,
            } => match self.resolve(state, *cond).value().and_then(ConstValue::as_bool) {
                Some(true) => vec![*true_block],
                Some(false) => vec![*false_block],
                None => terminator.successors(),
            },
            Terminator::MultiBranch {
                value,
                cases,
                default,
            } => match self.resolve(state, *value).value().and_then(ConstValue::as_bits) {
                Some(bits) => {
                    let target = cases
                        .iter()
                        .find(|(case, _)| *case == bits)
                        .map_or(*default, |(_, b)| *b);
                    vec![target]
                }
                None => terminator.successors(),
            },
            _ => terminator.successors(),
        }
    }
}

/// Lifts an IR literal into the abstract domain.
fn lift_literal(lit: &Literal) -> Domain {
    match lit {
        Literal::Int(v) => AbstractDomain::Val(ConstValue::Int(*v)),
        Literal::UInt(v) => AbstractDomain::Val(ConstValue::UInt(*v)),
        Literal::Float(v) => AbstractDomain::Val(ConstValue::Float(*v)),
        Literal::Bool(v) => AbstractDomain::Val(ConstValue::Bool(*v)),
        Literal::Rune(v) => AbstractDomain::Val(ConstValue::Rune(*v)),
        Literal::Str(v) => AbstractDomain::Val(ConstValue::Str(v.clone())),
        Literal::Unit => AbstractDomain::Top,
    }
}

/// Mathematical value of an integer constant.
fn math_value(cv: &ConstValue) -> Option<i128> {
    match cv {
        ConstValue::Int(v) => Some(i128::from(*v)),
        ConstValue::UInt(v) => Some(i128::from(*v)),
        _ => None,
    }
}

fn mask_of(kind: IntKind) -> u64 {
    if kind.width() == 64 {
        u64::MAX
    } else {
        (1u64 << kind.width()) - 1
    }
}

fn sign_extend(bits: u64, kind: IntKind) -> i64 {
    let shift = 64 - kind.width();
    ((bits << shift) as i64) >> shift
}

/// Constant from an in-range mathematical value.
fn const_from_math(math: i128, kind: IntKind) -> ConstValue {
    debug_assert!(kind.contains(math), "{math} outside {kind}");
    if kind.is_signed() {
        ConstValue::Int(math as i64)
    } else {
        ConstValue::UInt(math as u64)
    }
}

/// Constant from a raw bit pattern of the kind's width.
fn const_from_bits(bits: u64, kind: IntKind) -> ConstValue {
    if kind.is_signed() {
        ConstValue::Int(sign_extend(bits & mask_of(kind), kind))
    } else {
        ConstValue::UInt(bits & mask_of(kind))
    }
}

fn const_to_bits(cv: &ConstValue, kind: IntKind) -> Option<u64> {
    cv.as_bits().map(|b| b & mask_of(kind))
}

fn eval_float_arith(lv: &Domain, rv: &Domain, op: BinaryOp) -> Domain {
    let (Some(a), Some(b)) = (
        lv.value().and_then(ConstValue::as_f64),
        rv.value().and_then(ConstValue::as_f64),
    ) else {
        return AbstractDomain::Top;
    };
    let out = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        BinaryOp::Exp => a.powf(b),
        _ => return AbstractDomain::Top,
    };
    AbstractDomain::Val(ConstValue::Float(out))
}

fn compare_consts(a: &ConstValue, b: &ConstValue, op: BinaryOp) -> Option<bool> {
    use std::cmp::Ordering;
    let ord = match (a, b) {
        _ if a.is_integer() && b.is_integer() => math_value(a)?.cmp(&math_value(b)?),
        (ConstValue::Float(x), ConstValue::Float(y)) => x.partial_cmp(y)?,
        (ConstValue::Rune(x), ConstValue::Rune(y)) => x.cmp(y),
        (ConstValue::Bool(x), ConstValue::Bool(y)) => match op {
            BinaryOp::Eq => return Some(x == y),
            BinaryOp::Ne => return Some(x != y),
            _ => return None,
        },
        (ConstValue::Str(x), ConstValue::Str(y)) => match op {
            BinaryOp::Eq => return Some(x == y),
            BinaryOp::Ne => return Some(x != y),
            _ => return None,
        },
        _ => return None,
    };
    Some(match op {
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::Le => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::Ge => ord != Ordering::Less,
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::Ne => ord != Ordering::Equal,
        _ => return None,
    })
}
