//! Integer and boolean range analysis.
//!
//! Instantiates the fixpoint engine with [`RangeValue`], pairing a
//! [`ConstantRange`]-backed integer domain with a three-valued boolean
//! domain. Where the constant analysis needs both operands pinned to fold,
//! this one works from bounds: it narrows comparisons that can never flip,
//! proves overflow and bounds checks from intervals, and refines operand
//! ranges along taken branch edges.
//!
//! Definite errors (a divisor whose range is exactly `{0}`, an arithmetic
//! result provably outside the destination under the throwing strategy, a
//! shift amount whose whole range is invalid) are diagnosed in the stable
//! pass, mirroring the constant analysis.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::analysis::domain::{
    AbstractDomain, BoolDomain, ConstantRange, DomainPayload, SIntDomain,
};
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

type Domain = AbstractDomain<RangeValue>;

/// Payload of the range analysis: an interval for integers, a three-valued
/// lattice for booleans. Values of any other type stay untracked.
#[derive(Debug, Clone, PartialEq)]
pub enum RangeValue {
    /// Integer value with its possible bit patterns.
    Int(SIntDomain),
    /// Boolean value.
    Bool(BoolDomain),
}

impl RangeValue {
    /// Returns the integer domain, if this is an integer.
    #[must_use]
    pub fn as_int(&self) -> Option<&SIntDomain> {
        match self {
            Self::Int(d) => Some(d),
            Self::Bool(_) => None,
        }
    }

    /// Returns the boolean domain, if this is a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<BoolDomain> {
        match self {
            Self::Bool(d) => Some(*d),
            Self::Int(_) => None,
        }
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(d) => write!(f, "{d}"),
            Self::Bool(d) => write!(f, "{d}"),
        }
    }
}

impl DomainPayload for RangeValue {
    fn join(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.join(b).map(Self::Int),
            (Self::Bool(a), Self::Bool(b)) => a.join(b).map(Self::Bool),
            _ => None,
        }
    }
}

/// Everything the range analysis learned about one function.
#[derive(Debug, Default)]
pub struct RangeResults {
    /// Ranges visible at each reachable block's entry.
    pub ranges: HashMap<usize, HashMap<ValueId, RangeValue>>,
    /// Overflow-checked expressions that provably never overflow.
    pub never_overflow: HashSet<ExprId>,
    /// Array accesses that are provably in bounds.
    pub in_bounds: HashSet<ExprId>,
    /// Per-expression outcome of checked operations.
    pub exceptions: HashMap<ExprId, ExceptionKind>,
    /// Definite-error findings.
    pub diagnostics: Vec<Diagnostic>,
    /// True when the function exceeded the block-count limit.
    pub skipped: bool,
}

impl RangeResults {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// Range of `value` at the entry of `block`.
    #[must_use]
    pub fn range_at(&self, block: usize, value: ValueId) -> Option<&RangeValue> {
        self.ranges.get(&block)?.get(&value)
    }
}

/// Runs the range analysis on one function, picking the state-pool strategy
/// from the block count.
pub fn check_func(func: &Func, table: &SignatureTable) -> Result<RangeResults> {
    let blocks = func.block_count();
    if blocks > OVERHEAD_BLOCK_SIZE {
        return Ok(RangeResults::skipped());
    }
    let mut analysis = RangeAnalysis::new(func, table);
    if blocks > USE_ACTIVE_BLOCK_SIZE {
        let results: EngineResults<RangeValue, ActiveStatePool<Domain>> =
            engine::analyze(func, &mut analysis)?;
        Ok(analysis.into_results(&results))
    } else {
        let results: EngineResults<RangeValue, DefaultStatePool<Domain>> =
            engine::analyze(func, &mut analysis)?;
        Ok(analysis.into_results(&results))
    }
}

/// A relational comparison whose result value may later steer a branch.
#[derive(Debug, Clone, Copy)]
struct Relation {
    op: BinaryOp,
    lhs: ValueId,
    rhs: ValueId,
}

/// Transfer functions of the range analysis.
pub struct RangeAnalysis<'a> {
    func: &'a Func,
    table: &'a SignatureTable,
    graph: ObjectGraph,
    diagnostics: DiagnosticLog,
    never_overflow: HashSet<ExprId>,
    in_bounds: HashSet<ExprId>,
    exceptions: HashMap<ExprId, ExceptionKind>,
    // Values are single-assignment, so both maps are valid function-wide.
    relations: HashMap<ValueId, Relation>,
    size_values: HashMap<ValueId, ValueId>,
}

impl<'a> RangeAnalysis<'a> {
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
            relations: HashMap::new(),
            size_values: HashMap::new(),
        }
    }

    /// Packs the converged states and side channels into [`RangeResults`].
    pub fn into_results<S: StatePool<Domain>>(
        self,
        results: &EngineResults<RangeValue, S>,
    ) -> RangeResults {
        let mut ranges = HashMap::new();
        for (block, state) in results.iter() {
            let tracked: HashMap<ValueId, RangeValue> = state
                .iter()
                .filter_map(|(id, v)| v.value().map(|p| (id, p.clone())))
                .collect();
            ranges.insert(block, tracked);
        }
        RangeResults {
            ranges,
            never_overflow: self.never_overflow,
            in_bounds: self.in_bounds,
            exceptions: self.exceptions,
            diagnostics: self.diagnostics.drain(),
            skipped: false,
        }
    }

    fn int_kind(&self, id: ValueId) -> Option<IntKind> {
        self.func.value_ty(id).and_then(ChirType::int_kind)
    }

    fn value_ty(&self, id: ValueId) -> Option<&ChirType> {
        self.func.value_ty(id)
    }

    /// Integer domain of `id`: tracked state, literal fallback, or the full
    /// range of its kind.
    fn resolve_int<S: StatePool<Domain>>(
        &self,
        state: &State<RangeValue, S>,
        id: ValueId,
    ) -> Option<SIntDomain> {
        let kind = self.int_kind(id)?;
        match state.get(id) {
            AbstractDomain::Val(RangeValue::Int(d)) => Some(d),
            AbstractDomain::Bottom => Some(SIntDomain::new(
                ConstantRange::empty(kind.width()),
                kind.is_signed(),
            )),
            _ => {
                let lit = self.func.value(id).and_then(|v| v.literal());
                let range = match lit {
                    Some(Literal::Int(v)) => ConstantRange::single(kind.width(), *v as u64),
                    Some(Literal::UInt(v)) => ConstantRange::single(kind.width(), *v),
                    _ => ConstantRange::full(kind.width()),
                };
                Some(SIntDomain::new(range, kind.is_signed()))
            }
        }
    }

    fn resolve_bool<S: StatePool<Domain>>(
        &self,
        state: &State<RangeValue, S>,
        id: ValueId,
    ) -> BoolDomain {
        match state.get(id) {
            AbstractDomain::Val(RangeValue::Bool(d)) => d,
            AbstractDomain::Bottom => BoolDomain::BOTTOM,
            _ => match self.func.value(id).and_then(|v| v.literal()) {
                Some(Literal::Bool(b)) => BoolDomain::from_bool(*b),
                _ => BoolDomain::TOP,
            },
        }
    }

    fn note_exception(&mut self, id: ExprId, kind: ExceptionKind, is_stable: bool) {
        if is_stable {
            self.exceptions.insert(id, kind);
        }
    }

    fn note_success(&mut self, expr: &Expression, elide_overflow: bool, is_stable: bool) {
        self.note_exception(expr.id(), ExceptionKind::Success, is_stable);
        if is_stable && elide_overflow {
            self.never_overflow.insert(expr.id());
        }
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

    fn eval_unary<S: StatePool<Domain>>(
        &mut self,
        state: &State<RangeValue, S>,
        expr: &Expression,
        op: UnaryOp,
        is_stable: bool,
    ) -> Domain {
        match op {
            UnaryOp::Neg => {
                let Some(kind) = self.int_kind(expr.result()) else {
                    return AbstractDomain::Top;
                };
                let Some(d) = self.resolve_int(state, expr.operand(0)) else {
                    return AbstractDomain::Top;
                };
                // 0 - x, under the expression's strategy.
                let zero = SIntDomain::singleton(kind.width(), kind.is_signed(), 0);
                self.arith_result(expr, &zero, &d, BinaryOp::Sub, kind, is_stable)
            }
            UnaryOp::Not => {
                let d = self.resolve_bool(state, expr.operand(0));
                AbstractDomain::Val(RangeValue::Bool(d.logical_not()))
            }
            UnaryOp::BitNot => AbstractDomain::Top,
        }
    }

    fn eval_binary<S: StatePool<Domain>>(
        &mut self,
        state: &State<RangeValue, S>,
        expr: &Expression,
        op: BinaryOp,
        is_stable: bool,
    ) -> Domain {
        if op.is_arithmetic() {
            let Some(kind) = self.int_kind(expr.result()) else {
                return AbstractDomain::Top;
            };
            let (Some(a), Some(b)) = (
                self.resolve_int(state, expr.operand(0)),
                self.resolve_int(state, expr.operand(1)),
            ) else {
                return AbstractDomain::Top;
            };
            return self.arith_result(expr, &a, &b, op, kind, is_stable);
        }
        if op.is_shift() {
            return self.eval_shift(state, expr, op, is_stable);
        }
        if op.is_relational() {
            return self.eval_relational(state, expr, op);
        }
        if op.is_logical() {
            let a = self.resolve_bool(state, expr.operand(0));
            let b = self.resolve_bool(state, expr.operand(1));
            let out = match op {
                BinaryOp::And => a.logical_and(&b),
                _ => a.logical_or(&b),
            };
            return AbstractDomain::Val(RangeValue::Bool(out));
        }
        // Bitwise operators are not tracked by intervals.
        AbstractDomain::Top
    }

    fn arith_result(
        &mut self,
        expr: &Expression,
        a: &SIntDomain,
        b: &SIntDomain,
        op: BinaryOp,
        kind: IntKind,
        is_stable: bool,
    ) -> Domain {
        if a.range().is_empty() || b.range().is_empty() {
            return AbstractDomain::Bottom;
        }
        if matches!(op, BinaryOp::Div | BinaryOp::Mod) {
            if b.range().single_element() == Some(0) {
                let (diag, sym) = if op == BinaryOp::Div {
                    (DiagnosticKind::DivisionByZero, "/")
                } else {
                    (DiagnosticKind::ModuloByZero, "%")
                };
                return self.fail(
                    expr,
                    diag,
                    format!("the divisor of '{sym}' is provably zero"),
                    None,
                    is_stable,
                );
            }
            self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
            let out = match (op, kind.is_signed()) {
                (BinaryOp::Div, true) => a.range().sdiv(b.range()),
                (BinaryOp::Div, false) => a.range().udiv(b.range()),
                (_, true) => a.range().srem(b.range()),
                (_, false) => a.range().urem(b.range()),
            };
            return AbstractDomain::Val(RangeValue::Int(a.with_range(out)));
        }
        if op == BinaryOp::Exp {
            self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
            return AbstractDomain::Top;
        }

        match expr.overflow() {
            OverflowStrategy::Wrapping => {
                self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                // umul is modular-exact over bit patterns, so it covers
                // wrapping multiplication for both signednesses.
                let out = match op {
                    BinaryOp::Add => a.range().add(b.range()),
                    BinaryOp::Sub => a.range().sub(b.range()),
                    _ => a.range().umul(b.range()),
                };
                AbstractDomain::Val(RangeValue::Int(a.with_range(out)))
            }
            OverflowStrategy::Saturating => {
                self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                let out = match (op, kind.is_signed()) {
                    (BinaryOp::Add, true) => a.range().sadd_sat(b.range()),
                    (BinaryOp::Add, false) => a.range().uadd_sat(b.range()),
                    (BinaryOp::Sub, true) => a.range().ssub_sat(b.range()),
                    (BinaryOp::Sub, false) => a.range().usub_sat(b.range()),
                    (_, true) => a.range().smul_sat(b.range()),
                    (_, false) => a.range().umul_sat(b.range()),
                };
                AbstractDomain::Val(RangeValue::Int(a.with_range(out)))
            }
            OverflowStrategy::Throwing => {
                let (alo, ahi) = math_bounds(a);
                let (blo, bhi) = math_bounds(b);
                let (lo, hi) = match op {
                    BinaryOp::Add => (alo + blo, ahi + bhi),
                    BinaryOp::Sub => (alo - bhi, ahi - blo),
                    _ => corner_products(alo, ahi, blo, bhi),
                };
                if hi < kind.min_value() || lo > kind.max_value() {
                    return self.fail(
                        expr,
                        DiagnosticKind::ArithmeticOverflow,
                        format!("the result of '{op}' is always outside {kind}"),
                        Some(format!("{kind} represents {}", kind.range_hint())),
                        is_stable,
                    );
                }
                let elidable = lo >= kind.min_value() && hi <= kind.max_value();
                if elidable {
                    self.note_success(expr, true, is_stable);
                } else {
                    self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                }
                // Executions that survive a throwing check stayed in range.
                let lo = lo.max(kind.min_value());
                let hi = hi.min(kind.max_value());
                AbstractDomain::Val(RangeValue::Int(a.with_range(closed_range(kind, lo, hi))))
            }
        }
    }

    fn eval_shift<S: StatePool<Domain>>(
        &mut self,
        state: &State<RangeValue, S>,
        expr: &Expression,
        op: BinaryOp,
        is_stable: bool,
    ) -> Domain {
        let Some(kind) = self.int_kind(expr.result()) else {
            return AbstractDomain::Top;
        };
        let lhs_kind = self.int_kind(expr.operand(0)).unwrap_or(kind);
        let (Some(value), Some(amount)) = (
            self.resolve_int(state, expr.operand(0)),
            self.resolve_int(state, expr.operand(1)),
        ) else {
            return AbstractDomain::Top;
        };
        if amount.range().is_empty() || value.range().is_empty() {
            return AbstractDomain::Bottom;
        }
        let (amin, amax) = math_bounds(&amount);
        let width = i128::from(lhs_kind.width());
        if amax < 0 || amin >= width {
            return self.fail(
                expr,
                DiagnosticKind::InvalidShiftAmount,
                format!(
                    "every possible shift amount ({amin} ~ {amax}) is invalid for {lhs_kind}"
                ),
                None,
                is_stable,
            );
        }
        if amin < 0 || amax >= width {
            self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
            return AbstractDomain::Top;
        }
        self.note_exception(expr.id(), ExceptionKind::Success, is_stable);
        let out = match op {
            BinaryOp::Shl => value.range().shl(amount.range()),
            _ if lhs_kind.is_signed() => value.range().ashr(amount.range()),
            _ => value.range().lshr(amount.range()),
        };
        AbstractDomain::Val(RangeValue::Int(SIntDomain::new(out, kind.is_signed())))
    }

    fn eval_relational<S: StatePool<Domain>>(
        &mut self,
        state: &State<RangeValue, S>,
        expr: &Expression,
        op: BinaryOp,
    ) -> Domain {
        let (lhs, rhs) = (expr.operand(0), expr.operand(1));
        if lhs == rhs && self.value_ty(lhs).is_some_and(|t| !t.is_float()) {
            let b = matches!(op, BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq);
            return AbstractDomain::Val(RangeValue::Bool(BoolDomain::from_bool(b)));
        }
        let (Some(a), Some(b)) = (
            self.resolve_int(state, lhs),
            self.resolve_int(state, rhs),
        ) else {
            return AbstractDomain::Top;
        };
        // Remember the comparison so branches on its result can narrow.
        self.relations.insert(expr.result(), Relation { op, lhs, rhs });
        let out = compute_rel(&a, &b, op);
        AbstractDomain::Val(RangeValue::Bool(out))
    }

    fn eval_cast<S: StatePool<Domain>>(
        &mut self,
        state: &State<RangeValue, S>,
        expr: &Expression,
        is_stable: bool,
    ) -> Domain {
        if self
            .value_ty(expr.operand(0))
            .is_some_and(ChirType::is_composite)
        {
            self.graph.alias(expr.result(), expr.operand(0));
            return AbstractDomain::Top;
        }
        let (Some(src), Some(dst)) = (
            self.int_kind(expr.operand(0)),
            self.int_kind(expr.result()),
        ) else {
            return AbstractDomain::Top;
        };
        let Some(d) = self.resolve_int(state, expr.operand(0)) else {
            return AbstractDomain::Top;
        };
        if d.range().is_empty() {
            return AbstractDomain::Bottom;
        }
        let (lo, hi) = math_bounds(&d);
        let modular = || {
            let r = d.range();
            if dst.width() < src.width() {
                r.trunc(dst.width())
            } else if dst.width() > src.width() {
                if src.is_signed() {
                    r.sext(dst.width())
                } else {
                    r.zext(dst.width())
                }
            } else if r.is_full() {
                // Same width: only the signedness changes. `new` would read
                // lower == upper as empty, so the full set needs its own arm.
                ConstantRange::full(dst.width())
            } else {
                ConstantRange::new(dst.width(), r.lower(), r.upper())
            }
        };
        match expr.overflow() {
            OverflowStrategy::Wrapping => {
                self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                AbstractDomain::Val(RangeValue::Int(SIntDomain::new(
                    modular(),
                    dst.is_signed(),
                )))
            }
            OverflowStrategy::Saturating => {
                self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                let lo = lo.clamp(dst.min_value(), dst.max_value());
                let hi = hi.clamp(dst.min_value(), dst.max_value());
                AbstractDomain::Val(RangeValue::Int(SIntDomain::new(
                    closed_range(dst, lo, hi),
                    dst.is_signed(),
                )))
            }
            OverflowStrategy::Throwing => {
                if hi < dst.min_value() || lo > dst.max_value() {
                    return self.fail(
                        expr,
                        DiagnosticKind::ArithmeticOverflow,
                        format!("the cast operand ({lo} ~ {hi}) is always outside {dst}"),
                        Some(format!("{dst} represents {}", dst.range_hint())),
                        is_stable,
                    );
                }
                if lo >= dst.min_value() && hi <= dst.max_value() {
                    self.note_success(expr, true, is_stable);
                } else {
                    self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                }
                let lo = lo.max(dst.min_value());
                let hi = hi.min(dst.max_value());
                AbstractDomain::Val(RangeValue::Int(SIntDomain::new(
                    closed_range(dst, lo, hi),
                    dst.is_signed(),
                )))
            }
        }
    }

    fn eval_apply<S: StatePool<Domain>>(
        &mut self,
        state: &mut State<RangeValue, S>,
        expr: &Expression,
        callee: &CalleeInfo,
        is_stable: bool,
    ) -> Domain {
        match self.table.lookup(callee) {
            Some(StdlibOp::ArrayInit) => {
                if let Some(size) = self.resolve_int(state, expr.operand(1)) {
                    let kind = self.int_kind(expr.operand(1)).unwrap_or(IntKind::I64);
                    // Lengths are never negative.
                    let nonneg = closed_range(kind, 0, kind.max_value());
                    let slot = self.graph.slot(expr.operand(0), FieldKey::Length);
                    state.update(
                        slot,
                        AbstractDomain::Val(RangeValue::Int(size.narrowed(&nonneg))),
                    );
                }
                AbstractDomain::Top
            }
            Some(StdlibOp::ArraySlice) => {
                if let Some(len) = self.resolve_int(state, expr.operand(2)) {
                    let slot = self.graph.slot(expr.result(), FieldKey::Length);
                    state.update(slot, AbstractDomain::Val(RangeValue::Int(len)));
                }
                AbstractDomain::Top
            }
            Some(StdlibOp::ArrayGet | StdlibOp::ArrayIndexGet | StdlibOp::ArrayIndexSet) => {
                self.check_bounds(state, expr, expr.operand(0), expr.operand(1), is_stable);
                AbstractDomain::Top
            }
            Some(StdlibOp::ArraySize) => {
                let slot = self.graph.slot(expr.operand(0), FieldKey::Length);
                self.size_values.insert(expr.result(), slot);
                let kind = self.int_kind(expr.result()).unwrap_or(IntKind::I64);
                let len = match state.get(slot) {
                    AbstractDomain::Val(RangeValue::Int(d)) => d,
                    _ => SIntDomain::new(
                        closed_range(kind, 0, kind.max_value()),
                        kind.is_signed(),
                    ),
                };
                AbstractDomain::Val(RangeValue::Int(len))
            }
            Some(StdlibOp::RangeInit) => {
                let step = self.resolve_int(state, expr.operand(3));
                match step {
                    Some(d) if d.range().single_element() == Some(0) => self.fail(
                        expr,
                        DiagnosticKind::RangeStepZero,
                        "the range step is provably zero".to_string(),
                        None,
                        is_stable,
                    ),
                    Some(d) if !d.range().contains(0) => {
                        self.note_exception(expr.id(), ExceptionKind::Success, is_stable);
                        AbstractDomain::Top
                    }
                    _ => {
                        self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                        AbstractDomain::Top
                    }
                }
            }
            None => {
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
        state: &State<RangeValue, S>,
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
                Some(n) => {
                    let k = self.int_kind(expr.result()).unwrap_or(IntKind::I64);
                    AbstractDomain::Val(RangeValue::Int(SIntDomain::new(
                        closed_range(k, n, n),
                        k.is_signed(),
                    )))
                }
                None => AbstractDomain::Top,
            },
            IntrinsicKind::VArrayGet | IntrinsicKind::VArraySet => {
                self.check_index(state, expr, expr.operand(1), varray_len, None, is_stable);
                AbstractDomain::Top
            }
        }
    }

    fn check_bounds<S: StatePool<Domain>>(
        &mut self,
        state: &State<RangeValue, S>,
        expr: &Expression,
        array: ValueId,
        index: ValueId,
        is_stable: bool,
    ) {
        let slot = self.graph.lookup_slot(array, FieldKey::Length);
        let len = slot.and_then(|s| match state.get(s) {
            AbstractDomain::Val(RangeValue::Int(d)) => Some(d),
            _ => None,
        });
        self.check_index(state, expr, index, None, len.map(|d| (slot, d)), is_stable);
    }

    /// Bounds check against a static length, a tracked length range, or a
    /// symbolic distance to the length slot, whichever decides first.
    fn check_index<S: StatePool<Domain>>(
        &mut self,
        state: &State<RangeValue, S>,
        expr: &Expression,
        index: ValueId,
        static_len: Option<i128>,
        tracked_len: Option<(Option<ValueId>, SIntDomain)>,
        is_stable: bool,
    ) {
        let Some(idx) = self.resolve_int(state, index) else {
            self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
            return;
        };
        if idx.range().is_empty() {
            return;
        }
        let (imin, imax) = math_bounds(&idx);
        if imax < 0 {
            let _ = self.fail(
                expr,
                DiagnosticKind::IndexOutOfBounds,
                format!("the index ({imin} ~ {imax}) is always negative"),
                None,
                is_stable,
            );
            return;
        }
        let (lmin, lmax) = match (&tracked_len, static_len) {
            (Some((_, len)), _) => math_bounds(len),
            (None, Some(n)) => (n, n),
            (None, None) => {
                // No tracked length; a symbolic `i < arr.size` fact can still
                // decide.
                self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
                return;
            }
        };
        if imin >= lmax {
            let _ = self.fail(
                expr,
                DiagnosticKind::IndexOutOfBounds,
                format!("the index ({imin} ~ {imax}) never falls below the array length ({lmin} ~ {lmax})"),
                None,
                is_stable,
            );
            return;
        }
        let symbolic_ok = tracked_len
            .as_ref()
            .and_then(|(slot, _)| *slot)
            .and_then(|s| idx.symbolic_bound(s))
            .is_some_and(|dist| dist.signed_min() >= 1);
        if imin >= 0 && (imax < lmin || symbolic_ok) {
            self.note_exception(expr.id(), ExceptionKind::Success, is_stable);
            if is_stable {
                self.in_bounds.insert(expr.id());
            }
            return;
        }
        self.note_exception(expr.id(), ExceptionKind::NA, is_stable);
    }

    /// Intersects `id`'s range on a branch edge with the closed interval
    /// `[lo, hi]` of its own kind.
    fn narrow_value<S: StatePool<Domain>>(
        &self,
        state: &mut State<RangeValue, S>,
        id: ValueId,
        lo: i128,
        hi: i128,
    ) {
        let Some(kind) = self.int_kind(id) else {
            return;
        };
        let lo = lo.max(kind.min_value());
        let hi = hi.min(kind.max_value());
        let Some(d) = self.resolve_int(state, id) else {
            return;
        };
        if lo > hi {
            state.update(
                id,
                AbstractDomain::Val(RangeValue::Int(
                    d.with_range(ConstantRange::empty(kind.width())),
                )),
            );
            return;
        }
        let bound = closed_range(kind, lo, hi);
        state.update(id, AbstractDomain::Val(RangeValue::Int(d.narrowed(&bound))));
    }

    /// Applies a taken relational condition to both operands on the edge.
    fn apply_relation<S: StatePool<Domain>>(
        &mut self,
        state: &mut State<RangeValue, S>,
        relation: Relation,
        taken: bool,
    ) {
        let op = if taken {
            relation.op
        } else {
            negate_rel(relation.op)
        };
        let (lhs, rhs) = (relation.lhs, relation.rhs);
        let (Some(a), Some(b)) = (
            self.resolve_int(state, lhs),
            self.resolve_int(state, rhs),
        ) else {
            return;
        };
        let (amin, amax) = math_bounds(&a);
        let (bmin, bmax) = math_bounds(&b);
        match op {
            BinaryOp::Lt => {
                self.narrow_value(state, lhs, i128::MIN, bmax - 1);
                self.narrow_value(state, rhs, amin + 1, i128::MAX);
                self.record_symbolic(state, lhs, rhs, 1);
            }
            BinaryOp::Le => {
                self.narrow_value(state, lhs, i128::MIN, bmax);
                self.narrow_value(state, rhs, amin, i128::MAX);
                self.record_symbolic(state, lhs, rhs, 0);
            }
            BinaryOp::Gt => {
                self.narrow_value(state, lhs, bmin + 1, i128::MAX);
                self.narrow_value(state, rhs, i128::MIN, amax - 1);
                self.record_symbolic(state, rhs, lhs, 1);
            }
            BinaryOp::Ge => {
                self.narrow_value(state, lhs, bmin, i128::MAX);
                self.narrow_value(state, rhs, i128::MIN, amax);
                self.record_symbolic(state, rhs, lhs, 0);
            }
            BinaryOp::Eq => {
                self.narrow_value(state, lhs, bmin, bmax);
                self.narrow_value(state, rhs, amin, amax);
            }
            BinaryOp::Ne => {
                if let (Some(kind), Some(single)) = (self.int_kind(lhs), b.single_element()) {
                    if let Some(d) = self.resolve_int(state, lhs) {
                        let out = d.range().difference(&ConstantRange::single(
                            kind.width(),
                            single,
                        ));
                        state.update(
                            lhs,
                            AbstractDomain::Val(RangeValue::Int(d.with_range(out))),
                        );
                    }
                }
                if let (Some(kind), Some(single)) = (self.int_kind(rhs), a.single_element()) {
                    if let Some(d) = self.resolve_int(state, rhs) {
                        let out = d.range().difference(&ConstantRange::single(
                            kind.width(),
                            single,
                        ));
                        state.update(
                            rhs,
                            AbstractDomain::Val(RangeValue::Int(d.with_range(out))),
                        );
                    }
                }
            }
            _ => {}
        }
    }

    /// Records `small + distance <= large` when `large` is a tracked array
    /// size, keyed by the length slot so the fact survives numeric widening.
    fn record_symbolic<S: StatePool<Domain>>(
        &mut self,
        state: &mut State<RangeValue, S>,
        small: ValueId,
        large: ValueId,
        min_distance: i64,
    ) {
        let Some(&slot) = self.size_values.get(&large) else {
            return;
        };
        let Some(kind) = self.int_kind(small) else {
            return;
        };
        let Some(mut d) = self.resolve_int(state, small) else {
            return;
        };
        d.add_symbolic_bound(
            slot,
            closed_range(kind, i128::from(min_distance), kind.max_value()),
        );
        state.update(small, AbstractDomain::Val(RangeValue::Int(d)));
    }
}

impl<'a, S: StatePool<Domain>> TransferFunctions<RangeValue, S> for RangeAnalysis<'a> {
    fn initial_state(&mut self, func: &Func) -> State<RangeValue, S> {
        let mut state = State::new();
        for value in func.values() {
            if let crate::chir::ValueKind::Global(Some(lit)) = value.kind() {
                let Some(kind) = value.ty().int_kind() else {
                    if let Literal::Bool(b) = lit {
                        state.update(
                            value.id(),
                            AbstractDomain::Val(RangeValue::Bool(BoolDomain::from_bool(*b))),
                        );
                    }
                    continue;
                };
                let bits = match lit {
                    Literal::Int(v) => *v as u64,
                    Literal::UInt(v) => *v,
                    _ => continue,
                };
                state.update(
                    value.id(),
                    AbstractDomain::Val(RangeValue::Int(SIntDomain::singleton(
                        kind.width(),
                        kind.is_signed(),
                        bits,
                    ))),
                );
            }
        }
        state
    }

    fn transfer_expr(
        &mut self,
        state: &mut State<RangeValue, S>,
        expr: &Expression,
        is_stable: bool,
    ) {
        let value = match expr.kind() {
            ExprKind::Constant(lit) => match lit {
                Literal::Int(v) => self.int_kind(expr.result()).map_or(
                    AbstractDomain::Top,
                    |k| {
                        AbstractDomain::Val(RangeValue::Int(SIntDomain::singleton(
                            k.width(),
                            k.is_signed(),
                            *v as u64,
                        )))
                    },
                ),
                Literal::UInt(v) => self.int_kind(expr.result()).map_or(
                    AbstractDomain::Top,
                    |k| {
                        AbstractDomain::Val(RangeValue::Int(SIntDomain::singleton(
                            k.width(),
                            k.is_signed(),
                            *v,
                        )))
                    },
                ),
                Literal::Bool(b) => {
                    AbstractDomain::Val(RangeValue::Bool(BoolDomain::from_bool(*b)))
                }
                _ => AbstractDomain::Top,
            },
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
                let v = self
                    .resolve_int(state, expr.operand(1))
                    .map_or(AbstractDomain::Top, |d| {
                        AbstractDomain::Val(RangeValue::Int(d))
                    });
                let slot = self.graph.slot(expr.operand(0), FieldKey::Field(*idx));
                state.update(slot, v);
                AbstractDomain::Top
            }
            ExprKind::Load => {
                let slot = self.graph.slot(expr.operand(0), FieldKey::Deref);
                state.get(slot)
            }
            ExprKind::Store => {
                let v = self
                    .resolve_int(state, expr.operand(1))
                    .map_or(AbstractDomain::Top, |d| {
                        AbstractDomain::Val(RangeValue::Int(d))
                    });
                let slot = self.graph.slot(expr.operand(0), FieldKey::Deref);
                state.update(slot, v);
                AbstractDomain::Top
            }
            ExprKind::Apply(callee) => self.eval_apply(state, expr, callee, is_stable),
            ExprKind::Intrinsic(kind) => self.eval_intrinsic(state, expr, *kind, is_stable),
            ExprKind::Debug => AbstractDomain::Top,
        };
        state.update(expr.result(), value);
    }

    fn transfer_terminator(
        &mut self,
        state: &State<RangeValue, S>,
        terminator: &Terminator,
        _is_stable: bool,
    ) -> Vec<usize> {
        match terminator {
            Terminator::Branch {
                cond,
                true_block,
                false_block,
            } => match self.resolve_bool(state, *cond).as_bool() {
                Some(true) => vec![*true_block],
                Some(false) => vec![*false_block],
                None => terminator.successors(),
            },
            Terminator::MultiBranch {
                value,
                cases,
                default,
            } => {
                let Some(d) = self.resolve_int(state, *value) else {
                    return terminator.successors();
                };
                if let Some(bits) = d.single_element() {
                    let target = cases
                        .iter()
                        .find(|(case, _)| *case == bits)
                        .map_or(*default, |(_, b)| *b);
                    return vec![target];
                }
                terminator.successors()
            }
            _ => terminator.successors(),
        }
    }

    fn transfer_edge(
        &mut self,
        state: &State<RangeValue, S>,
        terminator: &Terminator,
        succ: usize,
    ) -> State<RangeValue, S> {
        let mut edge = state.clone();
        if let Terminator::Branch {
            cond,
            true_block,
            false_block,
        } = terminator
        {
            // Same target on both arms carries no information.
            if true_block == false_block {
                return edge;
            }
            let taken = succ == *true_block;
            edge.update(
                *cond,
                AbstractDomain::Val(RangeValue::Bool(BoolDomain::from_bool(taken))),
            );
            if let Some(relation) = self.relations.get(cond).copied() {
                self.apply_relation(&mut edge, relation, taken);
            }
        }
        if let Terminator::MultiBranch { value, cases, .. } = terminator {
            let constants: Vec<u64> = cases
                .iter()
                .filter(|(_, b)| *b == succ)
                .map(|(c, _)| *c)
                .collect();
            if let (Some(kind), false) = (self.int_kind(*value), constants.is_empty()) {
                if let Some(d) = self.resolve_int(&edge, *value) {
                    let mut allowed = ConstantRange::empty(kind.width());
                    for c in constants {
                        allowed = allowed.union(&ConstantRange::single(kind.width(), c));
                    }
                    edge.update(
                        *value,
                        AbstractDomain::Val(RangeValue::Int(d.narrowed(&allowed))),
                    );
                }
            }
        }
        edge
    }
}

/// Signed or unsigned interpretation bounds of a domain's range.
fn math_bounds(d: &SIntDomain) -> (i128, i128) {
    if d.is_signed() {
        (
            i128::from(d.range().signed_min()),
            i128::from(d.range().signed_max()),
        )
    } else {
        (
            i128::from(d.range().unsigned_min()),
            i128::from(d.range().unsigned_max()),
        )
    }
}

fn corner_products(alo: i128, ahi: i128, blo: i128, bhi: i128) -> (i128, i128) {
    let corners = [alo * blo, alo * bhi, ahi * blo, ahi * bhi];
    (
        corners.iter().copied().min().unwrap_or(0),
        corners.iter().copied().max().unwrap_or(0),
    )
}

/// Closed interval `[lo, hi]` interpreted in `kind`.
fn closed_range(kind: IntKind, lo: i128, hi: i128) -> ConstantRange {
    debug_assert!(lo <= hi, "inverted bounds {lo} > {hi}");
    if kind.is_signed() {
        ConstantRange::from_signed_closed(kind.width(), lo, hi)
    } else {
        ConstantRange::from_unsigned_closed(kind.width(), lo as u64, hi as u64)
    }
}

/// Comparison outcome from interval containment and disjointness.
fn compute_rel(a: &SIntDomain, b: &SIntDomain, op: BinaryOp) -> BoolDomain {
    if a.range().is_empty() || b.range().is_empty() {
        return BoolDomain::BOTTOM;
    }
    let (amin, amax) = math_bounds(a);
    let (bmin, bmax) = math_bounds(b);
    match op {
        BinaryOp::Lt => decide(amax < bmin, amin >= bmax),
        BinaryOp::Le => decide(amax <= bmin, amin > bmax),
        BinaryOp::Gt => decide(amin > bmax, amax <= bmin),
        BinaryOp::Ge => decide(amin >= bmax, amax < bmin),
        BinaryOp::Eq => {
            if a.range().intersect(b.range()).is_empty() {
                BoolDomain::FALSE
            } else if a.single_element().is_some() && a.range() == b.range() {
                BoolDomain::TRUE
            } else {
                BoolDomain::TOP
            }
        }
        BinaryOp::Ne => compute_rel(a, b, BinaryOp::Eq).logical_not(),
        _ => BoolDomain::TOP,
    }
}

fn decide(always: bool, never: bool) -> BoolDomain {
    if always {
        BoolDomain::TRUE
    } else if never {
        BoolDomain::FALSE
    } else {
        BoolDomain::TOP
    }
}

fn negate_rel(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Ge,
        BinaryOp::Le => BinaryOp::Gt,
        BinaryOp::Gt => BinaryOp::Le,
        BinaryOp::Ge => BinaryOp::Lt,
        BinaryOp::Eq => BinaryOp::Ne,
        BinaryOp::Ne => BinaryOp::Eq,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chir::FuncBuilder;

    fn table() -> SignatureTable {
        SignatureTable::standard()
    }

    fn int64() -> ChirType {
        ChirType::Int(IntKind::I64)
    }

    fn int8() -> ChirType {
        ChirType::Int(IntKind::I8)
    }

    fn int_range(r: &RangeResults, block: usize, v: ValueId) -> Option<(i128, i128)> {
        r.range_at(block, v)
            .and_then(RangeValue::as_int)
            .map(math_bounds)
    }

    #[test]
    fn addition_propagates_bounds() {
        let mut sum = ValueId(0);
        let func = FuncBuilder::new("addbounds").build_with(|f| {
            f.block(0, |b| {
                let a = b.const_int(10, IntKind::I64);
                let c = b.const_int(32, IntKind::I64);
                sum = b.binary(BinaryOp::Add, a, c, int64());
                b.goto(1);
            });
            f.block(1, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        assert_eq!(int_range(&r, 1, sum), Some((42, 42)));
    }

    #[test]
    fn guaranteed_overflow_is_diagnosed() {
        let func = FuncBuilder::new("alwaysover").build_with(|f| {
            f.block(0, |b| {
                let a = b.const_int(120, IntKind::I8);
                let c = b.const_int(100, IntKind::I8);
                b.binary(BinaryOp::Add, a, c, int8());
                b.exit();
            });
        });
        let r = check_func(&func, &table()).unwrap();
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].kind, DiagnosticKind::ArithmeticOverflow);
    }

    #[test]
    fn in_range_arithmetic_elides_the_check() {
        let mut id = ExprId(0);
        let func = FuncBuilder::new("elide").build_with(|f| {
            f.block(0, |b| {
                let a = b.const_int(3, IntKind::I8);
                let c = b.const_int(4, IntKind::I8);
                b.binary(BinaryOp::Add, a, c, int8());
                id = b.last_expr_id();
                b.exit();
            });
        });
        let r = check_func(&func, &table()).unwrap();
        assert!(r.never_overflow.contains(&id));
        assert_eq!(r.exceptions.get(&id), Some(&ExceptionKind::Success));
    }

    #[test]
    fn divisor_range_of_exactly_zero_fails() {
        let func = FuncBuilder::new("zerodiv").build_with(|f| {
            let x = f.param(int64());
            f.block(0, |b| {
                let z = b.const_int(0, IntKind::I64);
                b.binary(BinaryOp::Div, x, z, int64());
                b.exit();
            });
        });
        let r = check_func(&func, &table()).unwrap();
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].kind, DiagnosticKind::DivisionByZero);
    }

    #[test]
    fn disjoint_ranges_decide_equality() {
        let mut eq = ValueId(0);
        let mut lt = ValueId(0);
        let func = FuncBuilder::new("disjoint").build_with(|f| {
            f.block(0, |b| {
                let a = b.const_int(3, IntKind::I64);
                let c = b.const_int(7, IntKind::I64);
                eq = b.binary(BinaryOp::Eq, a, c, ChirType::Bool);
                lt = b.binary(BinaryOp::Lt, a, c, ChirType::Bool);
                b.goto(1);
            });
            f.block(1, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        let eq_v = r.range_at(1, eq).and_then(RangeValue::as_bool);
        let lt_v = r.range_at(1, lt).and_then(RangeValue::as_bool);
        assert_eq!(eq_v, Some(BoolDomain::FALSE));
        assert_eq!(lt_v, Some(BoolDomain::TRUE));
    }

    #[test]
    fn branch_narrows_the_taken_side() {
        let mut x = ValueId(0);
        let func = FuncBuilder::new("narrow").build_with(|f| {
            x = f.param(int64());
            f.block(0, |b| {
                let ten = b.const_int(10, IntKind::I64);
                let c = b.binary(BinaryOp::Lt, x, ten, ChirType::Bool);
                b.branch(c, 1, 2);
            });
            f.block(1, |b| b.exit());
            f.block(2, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        let (_, hi_true) = int_range(&r, 1, x).unwrap();
        let (lo_false, _) = int_range(&r, 2, x).unwrap();
        assert_eq!(hi_true, 9);
        assert_eq!(lo_false, 10);
    }

    #[test]
    fn nested_guards_prove_bounds() {
        let mut id = ExprId(0);
        let mut arr = ValueId(0);
        let func = FuncBuilder::new("nested").build_with(|f| {
            let idx = f.param(int64());
            f.block(0, |b| {
                arr = b.allocate(ChirType::RawArray(Box::new(int64())));
                let n = b.const_int(10, IntKind::I64);
                let zero = b.const_int(0, IntKind::I64);
                b.apply(
                    CalleeInfo::new("init", "Array", "std.core", 2),
                    vec![arr, n, zero],
                    ChirType::Unit,
                );
                let nonneg = b.binary(BinaryOp::Ge, idx, zero, ChirType::Bool);
                b.branch(nonneg, 1, 3);
            });
            f.block(1, |b| {
                let ten = b.const_int(10, IntKind::I64);
                let below = b.binary(BinaryOp::Lt, idx, ten, ChirType::Bool);
                b.branch(below, 2, 3);
            });
            f.block(2, |b| {
                b.apply(
                    CalleeInfo::new("[]", "Array", "std.core", 1),
                    vec![arr, idx],
                    int64(),
                );
                id = b.last_expr_id();
                b.goto(3);
            });
            f.block(3, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        assert!(r.diagnostics.is_empty());
        assert!(r.in_bounds.contains(&id), "{:?}", r.exceptions.get(&id));
    }

    #[test]
    fn symbolic_size_bound_survives_unknown_length() {
        let mut id = ExprId(0);
        let mut arr = ValueId(0);
        let func = FuncBuilder::new("symbolic").build_with(|f| {
            let idx = f.param(int64());
            let n = f.param(int64());
            f.block(0, |b| {
                arr = b.allocate(ChirType::RawArray(Box::new(int64())));
                let zero = b.const_int(0, IntKind::I64);
                b.apply(
                    CalleeInfo::new("init", "Array", "std.core", 2),
                    vec![arr, n, zero],
                    ChirType::Unit,
                );
                let nonneg = b.binary(BinaryOp::Ge, idx, zero, ChirType::Bool);
                b.branch(nonneg, 1, 4);
            });
            f.block(1, |b| {
                let size = b.apply(
                    CalleeInfo::new("$sizeget", "Array", "std.core", 0),
                    vec![arr],
                    int64(),
                );
                let below = b.binary(BinaryOp::Lt, idx, size, ChirType::Bool);
                b.branch(below, 2, 4);
            });
            f.block(2, |b| {
                // The length is an unknown parameter; only the symbolic
                // `idx < arr.size` fact can prove this access.
                b.apply(
                    CalleeInfo::new("[]", "Array", "std.core", 1),
                    vec![arr, idx],
                    int64(),
                );
                id = b.last_expr_id();
                b.goto(3);
            });
            f.block(3, |b| b.exit());
            f.block(4, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        assert!(r.diagnostics.is_empty());
        assert!(r.in_bounds.contains(&id), "{:?}", r.exceptions.get(&id));
    }

    #[test]
    fn multibranch_narrows_case_edges() {
        let mut x = ValueId(0);
        let func = FuncBuilder::new("switch").build_with(|f| {
            x = f.param(int64());
            f.block(0, |b| {
                b.multibranch(x, vec![(1, 1), (5, 2)], 3);
            });
            f.block(1, |b| b.exit());
            f.block(2, |b| b.exit());
            f.block(3, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        assert_eq!(int_range(&r, 1, x), Some((1, 1)));
        assert_eq!(int_range(&r, 2, x), Some((5, 5)));
    }

    #[test]
    fn known_condition_prunes_dead_arm() {
        let func = FuncBuilder::new("deadarm").build_with(|f| {
            f.block(0, |b| {
                let a = b.const_int(3, IntKind::I64);
                let c = b.const_int(7, IntKind::I64);
                let lt = b.binary(BinaryOp::Lt, a, c, ChirType::Bool);
                b.branch(lt, 1, 2);
            });
            f.block(1, |b| b.exit());
            f.block(2, |b| {
                // Dead: would otherwise diagnose.
                let z = b.const_int(0, IntKind::I64);
                let x = b.const_int(1, IntKind::I64);
                b.binary(BinaryOp::Div, x, z, int64());
                b.exit();
            });
        });
        let r = check_func(&func, &table()).unwrap();
        assert!(r.diagnostics.is_empty());
        assert!(!r.ranges.contains_key(&2));
    }

    #[test]
    fn loop_counter_converges_with_widening() {
        // while (i < n) { i = i + 1 }, i starting at 0.
        let mut obj = ValueId(0);
        let func = FuncBuilder::new("count").build_with(|f| {
            let n = f.param(int64());
            f.block(0, |b| {
                obj = b.allocate(ChirType::Class("Box".into()));
                let zero = b.const_int(0, IntKind::I64);
                b.store_field(obj, 0, zero);
                b.goto(1);
            });
            f.block(1, |b| {
                let i = b.field(obj, 0, int64());
                let c = b.binary(BinaryOp::Lt, i, n, ChirType::Bool);
                b.branch(c, 2, 3);
            });
            f.block(2, |b| {
                let i = b.field(obj, 0, int64());
                let one = b.const_int(1, IntKind::I64);
                let next = b.binary_with(BinaryOp::Add, i, one, int64(), OverflowStrategy::Wrapping);
                b.store_field(obj, 0, next);
                b.goto(1);
            });
            f.block(3, |b| b.exit());
        });
        // Termination is the property under test.
        let r = check_func(&func, &table()).unwrap();
        assert!(r.ranges.contains_key(&3));
    }

    #[test]
    fn wrapping_add_is_modular_exact() {
        let mut out = ValueId(0);
        let func = FuncBuilder::new("wrap").build_with(|f| {
            f.block(0, |b| {
                let a = b.const_int(127, IntKind::I8);
                let one = b.const_int(1, IntKind::I8);
                out = b.binary_with(BinaryOp::Add, a, one, int8(), OverflowStrategy::Wrapping);
                b.goto(1);
            });
            f.block(1, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        assert_eq!(int_range(&r, 1, out), Some((-128, -128)));
    }

    #[test]
    fn saturating_add_clamps() {
        let mut out = ValueId(0);
        let func = FuncBuilder::new("sat").build_with(|f| {
            f.block(0, |b| {
                let a = b.const_int(120, IntKind::I8);
                let c = b.const_int(100, IntKind::I8);
                out = b.binary_with(BinaryOp::Add, a, c, int8(), OverflowStrategy::Saturating);
                b.goto(1);
            });
            f.block(1, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        assert_eq!(int_range(&r, 1, out), Some((127, 127)));
    }

    #[test]
    fn wrapping_mul_covers_the_wrapped_product() {
        // i8 100 * 2 wraps to -56 (bit pattern 200); the result range must
        // contain it.
        let mut out = ValueId(0);
        let func = FuncBuilder::new("wrapmul").build_with(|f| {
            f.block(0, |b| {
                let a = b.const_int(100, IntKind::I8);
                let two = b.const_int(2, IntKind::I8);
                out = b.binary_with(BinaryOp::Mul, a, two, int8(), OverflowStrategy::Wrapping);
                b.goto(1);
            });
            f.block(1, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        let d = r.range_at(1, out).and_then(RangeValue::as_int).unwrap();
        assert!(d.range().contains(200), "{:?}", d.range());
    }

    #[test]
    fn wrapping_mul_is_exact_without_overflow() {
        let mut out = ValueId(0);
        let func = FuncBuilder::new("wrapmulexact").build_with(|f| {
            f.block(0, |b| {
                let a = b.const_int(3, IntKind::I8);
                let c = b.const_int(4, IntKind::I8);
                out = b.binary_with(BinaryOp::Mul, a, c, int8(), OverflowStrategy::Wrapping);
                b.goto(1);
            });
            f.block(1, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        assert_eq!(int_range(&r, 1, out), Some((12, 12)));
    }

    #[test]
    fn saturating_unsigned_mul_clamps() {
        // u8 200 * 2 saturates to 255.
        let mut out = ValueId(0);
        let func = FuncBuilder::new("satmul").build_with(|f| {
            f.block(0, |b| {
                let a = b.const_uint(200, IntKind::U8);
                let two = b.const_uint(2, IntKind::U8);
                out = b.binary_with(
                    BinaryOp::Mul,
                    a,
                    two,
                    ChirType::Int(IntKind::U8),
                    OverflowStrategy::Saturating,
                );
                b.goto(1);
            });
            f.block(1, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        assert_eq!(int_range(&r, 1, out), Some((255, 255)));
    }

    #[test]
    fn shift_range_fully_invalid_fails() {
        let func = FuncBuilder::new("shiftrange").build_with(|f| {
            let x = f.param(int8());
            f.block(0, |b| {
                let amt = b.const_int(9, IntKind::I8);
                b.binary(BinaryOp::Shl, x, amt, int8());
                b.exit();
            });
        });
        let r = check_func(&func, &table()).unwrap();
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].kind, DiagnosticKind::InvalidShiftAmount);
    }

    #[test]
    fn cast_with_provably_out_of_range_operand_fails() {
        let func = FuncBuilder::new("badcast").build_with(|f| {
            f.block(0, |b| {
                let v = b.const_int(300, IntKind::I64);
                b.cast(v, int8(), OverflowStrategy::Throwing);
                b.exit();
            });
        });
        let r = check_func(&func, &table()).unwrap();
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].kind, DiagnosticKind::ArithmeticOverflow);
    }

    #[test]
    fn same_width_cast_keeps_an_unconstrained_operand_full() {
        let mut out = ValueId(0);
        let func = FuncBuilder::new("signcast").build_with(|f| {
            let x = f.param(int64());
            f.block(0, |b| {
                out = b.cast(x, ChirType::Int(IntKind::U64), OverflowStrategy::Wrapping);
                b.goto(1);
            });
            f.block(1, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        let d = r.range_at(1, out).and_then(RangeValue::as_int).unwrap();
        assert!(d.range().is_full(), "{:?}", d.range());
    }

    #[test]
    fn widening_cast_keeps_bounds() {
        let mut out = ValueId(0);
        let func = FuncBuilder::new("widen").build_with(|f| {
            f.block(0, |b| {
                let v = b.const_int(-5, IntKind::I8);
                out = b.cast(v, int64(), OverflowStrategy::Throwing);
                b.goto(1);
            });
            f.block(1, |b| b.exit());
        });
        let r = check_func(&func, &table()).unwrap();
        assert_eq!(int_range(&r, 1, out), Some((-5, -5)));
    }
}
