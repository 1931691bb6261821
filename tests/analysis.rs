//! End-to-end analysis tests through the public API.
//!
//! Each test builds a CHIR function with [`FuncBuilder`], runs it through
//! [`PackageChecker`], and asserts on the published results: folded
//! constants, check-elision sets, per-operation outcomes and diagnostics.

use chir_dataflow::chir::CalleeInfo;
use chir_dataflow::prelude::*;

fn int64() -> ChirType {
    ChirType::Int(IntKind::I64)
}

fn int8() -> ChirType {
    ChirType::Int(IntKind::I8)
}

fn run_one(func: Func) -> PackageChecker {
    let checker = PackageChecker::new(CheckerConfig::default());
    checker.run(std::slice::from_ref(&func)).expect("valid function");
    checker
}

fn run_one_with_ranges(func: Func) -> PackageChecker {
    let checker = PackageChecker::new(CheckerConfig {
        ranges: true,
        ..CheckerConfig::default()
    });
    checker.run(std::slice::from_ref(&func)).expect("valid function");
    checker
}

#[test]
fn multiplication_by_zero_folds_and_elides_the_check() {
    let mut fb = FuncBuilder::new("mul_by_zero");
    let x = fb.param(int64());
    let mut prod = ValueId(0);
    let mut id = ExprId(0);
    let func = fb.build_with(|f| {
        f.block(0, |b| {
            let zero = b.const_int(0, IntKind::I64);
            prod = b.binary(BinaryOp::Mul, x, zero, int64());
            id = b.last_expr_id();
            b.goto(1);
        });
        f.block(1, |b| b.exit());
    });

    let checker = run_one(func);
    let result = checker.check_func_result(FuncId(0)).unwrap();
    assert_eq!(
        result.constants.constant_at(1, prod),
        Some(&ConstValue::Int(0))
    );
    assert!(result.constants.never_overflow.contains(&id));
    assert!(result.constants.diagnostics.is_empty());
}

#[test]
fn out_of_bounds_access_cites_index_and_length() {
    let func = FuncBuilder::new("oob").build_with(|f| {
        f.block(0, |b| {
            let arr = b.allocate(ChirType::RawArray(Box::new(int64())));
            let three = b.const_int(3, IntKind::I64);
            let zero = b.const_int(0, IntKind::I64);
            b.apply(
                CalleeInfo::new("init", "Array", "std.core", 2),
                vec![arr, three, zero],
                ChirType::Unit,
            );
            let five = b.const_int(5, IntKind::I64);
            b.apply(
                CalleeInfo::new("[]", "Array", "std.core", 1),
                vec![arr, five],
                int64(),
            );
            b.exit();
        });
    });

    let checker = run_one(func);
    let result = checker.check_func_result(FuncId(0)).unwrap();
    assert_eq!(result.constants.diagnostics.len(), 1);
    let d = &result.constants.diagnostics[0];
    assert_eq!(d.kind, DiagnosticKind::IndexOutOfBounds);
    assert!(d.message.contains('5'), "{}", d.message);
    assert!(d.message.contains('3'), "{}", d.message);
    assert!(d.location.is_some());
}

#[test]
fn in_bounds_access_is_marked_elidable() {
    let mut id = ExprId(0);
    let func = FuncBuilder::new("inb").build_with(|f| {
        f.block(0, |b| {
            let arr = b.allocate(ChirType::RawArray(Box::new(int64())));
            let five = b.const_int(5, IntKind::I64);
            let zero = b.const_int(0, IntKind::I64);
            b.apply(
                CalleeInfo::new("init", "Array", "std.core", 2),
                vec![arr, five, zero],
                ChirType::Unit,
            );
            let four = b.const_int(4, IntKind::I64);
            b.apply(
                CalleeInfo::new("get", "Array", "std.core", 1),
                vec![arr, four],
                int64(),
            );
            id = b.last_expr_id();
            b.exit();
        });
    });

    let checker = run_one(func);
    let result = checker.check_func_result(FuncId(0)).unwrap();
    assert!(result.constants.diagnostics.is_empty());
    assert!(result.constants.in_bounds.contains(&id));
    assert_eq!(
        result.constants.exceptions.get(&id),
        Some(&ExceptionKind::Success)
    );
}

#[test]
fn overflow_outcome_follows_the_declared_strategy() {
    let cases = [
        (OverflowStrategy::Throwing, None, ExceptionKind::Fail, 1),
        (
            OverflowStrategy::Wrapping,
            Some(ConstValue::Int(-126)),
            ExceptionKind::NA,
            0,
        ),
        (
            OverflowStrategy::Saturating,
            Some(ConstValue::Int(127)),
            ExceptionKind::NA,
            0,
        ),
    ];
    for (strategy, folded, outcome, diags) in cases {
        let mut out = ValueId(0);
        let mut id = ExprId(0);
        let func = FuncBuilder::new("overflow").build_with(|f| {
            f.block(0, |b| {
                let a = b.const_int(100, IntKind::I8);
                let c = b.const_int(30, IntKind::I8);
                out = b.binary_with(BinaryOp::Add, a, c, int8(), strategy);
                id = b.last_expr_id();
                b.goto(1);
            });
            f.block(1, |b| b.exit());
        });

        let checker = run_one(func);
        let result = checker.check_func_result(FuncId(0)).unwrap();
        assert_eq!(
            result.constants.constant_at(1, out),
            folded.as_ref(),
            "{strategy:?}"
        );
        assert_eq!(
            result.constants.exceptions.get(&id),
            Some(&outcome),
            "{strategy:?}"
        );
        assert_eq!(result.constants.diagnostics.len(), diags, "{strategy:?}");
    }
}

#[test]
fn division_and_modulo_by_zero_are_definite_errors() {
    let mut fb = FuncBuilder::new("divmod");
    let x = fb.param(int64());
    let func = fb.build_with(|f| {
        f.block(0, |b| {
            let zero = b.const_int(0, IntKind::I64);
            b.binary(BinaryOp::Div, x, zero, int64());
            b.binary(BinaryOp::Mod, x, zero, int64());
            b.exit();
        });
    });

    let checker = run_one(func);
    let result = checker.check_func_result(FuncId(0)).unwrap();
    let kinds: Vec<_> = result
        .constants
        .diagnostics
        .iter()
        .map(|d| d.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::DivisionByZero,
            DiagnosticKind::ModuloByZero
        ]
    );
}

#[test]
fn modulo_by_one_folds_to_zero_without_knowing_the_dividend() {
    let mut fb = FuncBuilder::new("modone");
    let x = fb.param(int64());
    let mut out = ValueId(0);
    let func = fb.build_with(|f| {
        f.block(0, |b| {
            let one = b.const_int(1, IntKind::I64);
            out = b.binary(BinaryOp::Mod, x, one, int64());
            b.goto(1);
        });
        f.block(1, |b| b.exit());
    });

    let checker = run_one(func);
    let result = checker.check_func_result(FuncId(0)).unwrap();
    assert_eq!(
        result.constants.constant_at(1, out),
        Some(&ConstValue::Int(0))
    );
}

#[test]
fn invalid_shift_amount_fails_regardless_of_the_shifted_value() {
    let mut fb = FuncBuilder::new("shift");
    let x = fb.param(int8());
    let func = fb.build_with(|f| {
        f.block(0, |b| {
            let amt = b.const_int(8, IntKind::I8);
            b.binary(BinaryOp::Shl, x, amt, int8());
            b.exit();
        });
    });

    let checker = run_one(func);
    let result = checker.check_func_result(FuncId(0)).unwrap();
    assert_eq!(result.constants.diagnostics.len(), 1);
    assert_eq!(
        result.constants.diagnostics[0].kind,
        DiagnosticKind::InvalidShiftAmount
    );
}

#[test]
fn unknown_operands_stay_undecided() {
    let mut fb = FuncBuilder::new("unknown");
    let x = fb.param(int64());
    let y = fb.param(int64());
    let mut id = ExprId(0);
    let func = fb.build_with(|f| {
        f.block(0, |b| {
            b.binary(BinaryOp::Add, x, y, int64());
            id = b.last_expr_id();
            b.exit();
        });
    });

    let checker = run_one(func);
    let result = checker.check_func_result(FuncId(0)).unwrap();
    assert_eq!(
        result.constants.exceptions.get(&id),
        Some(&ExceptionKind::NA)
    );
    assert!(result.constants.diagnostics.is_empty());
    assert!(result.constants.never_overflow.is_empty());
}

#[test]
fn large_functions_switch_pools_without_losing_facts() {
    // Past the active-pool threshold but below the skip limit.
    let blocks = 400;
    let mut out = ValueId(0);
    let func = FuncBuilder::new("long_chain").build_with(|f| {
        f.block(0, |b| {
            let a = b.const_int(20, IntKind::I64);
            let c = b.const_int(22, IntKind::I64);
            out = b.binary(BinaryOp::Add, a, c, int64());
            b.goto(1);
        });
        for i in 1..blocks {
            f.block(i, |b| {
                if i + 1 < blocks {
                    b.goto(i + 1);
                } else {
                    b.exit();
                }
            });
        }
    });

    let checker = run_one(func);
    let result = checker.check_func_result(FuncId(0)).unwrap();
    assert!(!result.constants.skipped);
    assert_eq!(
        result.constants.constant_at(blocks - 1, out),
        Some(&ConstValue::Int(42))
    );
}

#[test]
fn range_analysis_proves_guarded_bounds_checks() {
    let mut fb = FuncBuilder::new("guarded");
    let idx = fb.param(int64());
    let mut arr = ValueId(0);
    let mut id = ExprId(0);
    let func = fb.build_with(|f| {
        f.block(0, |b| {
            arr = b.allocate(ChirType::RawArray(Box::new(int64())));
            let ten = b.const_int(10, IntKind::I64);
            let zero = b.const_int(0, IntKind::I64);
            b.apply(
                CalleeInfo::new("init", "Array", "std.core", 2),
                vec![arr, ten, zero],
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

    let checker = run_one_with_ranges(func);
    let result = checker.check_func_result(FuncId(0)).unwrap();
    // The constant analysis cannot decide this; the range analysis can.
    assert_eq!(
        result.constants.exceptions.get(&id),
        Some(&ExceptionKind::NA)
    );
    let ranges = result.ranges.as_ref().unwrap();
    assert!(ranges.in_bounds.contains(&id));
    assert!(ranges.diagnostics.is_empty());
}

#[test]
fn trace_renders_folded_values() {
    let func = FuncBuilder::new("traced").build_with(|f| {
        f.block(0, |b| {
            let a = b.const_int(6, IntKind::I64);
            let c = b.const_int(7, IntKind::I64);
            let prod = b.binary(BinaryOp::Mul, a, c, int64());
            b.debug(prod);
            b.exit();
        });
    });

    let checker = PackageChecker::new(CheckerConfig {
        trace: true,
        ..CheckerConfig::default()
    });
    checker.run(std::slice::from_ref(&func)).unwrap();
    let result = checker.check_func_result(FuncId(0)).unwrap();
    assert!(
        result.constants.trace.iter().any(|l| l.ends_with("= 42")),
        "{:?}",
        result.constants.trace
    );
}

#[test]
fn dead_branches_suppress_their_diagnostics() {
    let func = FuncBuilder::new("dead").build_with(|f| {
        f.block(0, |b| {
            let t = b.const_bool(true);
            b.branch(t, 1, 2);
        });
        f.block(1, |b| b.exit());
        f.block(2, |b| {
            let one = b.const_int(1, IntKind::I64);
            let zero = b.const_int(0, IntKind::I64);
            b.binary(BinaryOp::Div, one, zero, int64());
            b.exit();
        });
    });

    let checker = run_one(func);
    let result = checker.check_func_result(FuncId(0)).unwrap();
    assert!(result.constants.diagnostics.is_empty());
}

#[test]
fn empty_function_is_rejected() {
    let func = FuncBuilder::new("empty").build_with(|_| {});
    let checker = PackageChecker::new(CheckerConfig::default());
    let err = checker.run(std::slice::from_ref(&func)).unwrap_err();
    assert!(matches!(err, Error::EmptyFunction(_)));
}
