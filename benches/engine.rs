//! Benchmarks for the dataflow analyses.
//!
//! Measures fixpoint convergence on representative control-flow shapes:
//! - Straight-line code (single pass, no joins)
//! - Diamond chains (repeated joins)
//! - Loops (widening and stable replay)
//! - Whole-package analysis through the parallel driver

extern crate chir_dataflow;

use chir_dataflow::analysis::{constant, ranges, SignatureTable};
use chir_dataflow::prelude::*;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// A single block with `n` chained additions.
fn straight_line(id: FuncId, n: usize) -> Func {
    FuncBuilder::new("straight").with_id(id).build_with(|f| {
        f.block(0, |b| {
            let mut acc = b.const_int(1, IntKind::I64);
            for i in 0..n {
                let step = b.const_int(i as i64, IntKind::I64);
                acc = b.binary(BinaryOp::Add, acc, step, ChirType::Int(IntKind::I64));
            }
            b.debug(acc);
            b.exit();
        });
    })
}

/// `n` stacked if/else diamonds, each joining two constant definitions.
fn diamond_chain(id: FuncId, n: usize) -> Func {
    let mut fb = FuncBuilder::new("diamonds").with_id(id);
    let cond = fb.param(ChirType::Bool);
    fb.build_with(|f| {
        for i in 0..n {
            let base = i * 4;
            f.block(base, |b| b.branch(cond, base + 1, base + 2));
            f.block(base + 1, |b| {
                b.const_int(1, IntKind::I64);
                b.goto(base + 3);
            });
            f.block(base + 2, |b| {
                b.const_int(2, IntKind::I64);
                b.goto(base + 3);
            });
            f.block(base + 3, |b| {
                if i + 1 < n {
                    b.goto(base + 4);
                } else {
                    b.exit();
                }
            });
        }
    })
}

/// A counting loop whose bound is an unknown parameter, forcing widening.
fn counting_loop() -> Func {
    let mut fb = FuncBuilder::new("loop");
    let bound = fb.param(ChirType::Int(IntKind::I64));
    let mut obj = ValueId(0);
    fb.build_with(|f| {
        f.block(0, |b| {
            obj = b.allocate(ChirType::Class("Counter".into()));
            let zero = b.const_int(0, IntKind::I64);
            b.store_field(obj, 0, zero);
            b.goto(1);
        });
        f.block(1, |b| {
            let i = b.field(obj, 0, ChirType::Int(IntKind::I64));
            let cont = b.binary(BinaryOp::Lt, i, bound, ChirType::Bool);
            b.branch(cont, 2, 3);
        });
        f.block(2, |b| {
            let i = b.field(obj, 0, ChirType::Int(IntKind::I64));
            let one = b.const_int(1, IntKind::I64);
            let next = b.binary(BinaryOp::Add, i, one, ChirType::Int(IntKind::I64));
            b.store_field(obj, 0, next);
            b.goto(1);
        });
        f.block(3, |b| b.exit());
    })
}

/// Benchmark the constant analysis on straight-line code.
fn bench_constants_straight_line(c: &mut Criterion) {
    let func = straight_line(FuncId(0), 200);
    let table = SignatureTable::standard();

    c.bench_function("constants_straight_line_200", |b| {
        b.iter(|| {
            let r = constant::check_func(black_box(&func), &table, false).unwrap();
            black_box(r)
        });
    });
}

/// Benchmark the constant analysis across repeated joins.
fn bench_constants_diamond_chain(c: &mut Criterion) {
    let func = diamond_chain(FuncId(0), 50);
    let table = SignatureTable::standard();

    c.bench_function("constants_diamond_chain_50", |b| {
        b.iter(|| {
            let r = constant::check_func(black_box(&func), &table, false).unwrap();
            black_box(r)
        });
    });
}

/// Benchmark widening convergence on an unbounded counting loop.
fn bench_ranges_counting_loop(c: &mut Criterion) {
    let func = counting_loop();
    let table = SignatureTable::standard();

    c.bench_function("ranges_counting_loop", |b| {
        b.iter(|| {
            let r = ranges::check_func(black_box(&func), &table).unwrap();
            black_box(r)
        });
    });
}

/// Benchmark the parallel driver over a small package of mixed functions.
fn bench_package_driver(c: &mut Criterion) {
    let funcs: Vec<Func> = (0..32)
        .map(|i| {
            if i % 2 == 0 {
                straight_line(FuncId(i), 50)
            } else {
                diamond_chain(FuncId(i), 10)
            }
        })
        .collect();

    c.bench_function("package_driver_32_funcs", |b| {
        b.iter(|| {
            let checker = PackageChecker::new(CheckerConfig {
                ranges: true,
                ..CheckerConfig::default()
            });
            checker.run(black_box(&funcs)).unwrap();
            black_box(checker)
        });
    });
}

criterion_group!(
    benches,
    bench_constants_straight_line,
    bench_constants_diamond_chain,
    bench_ranges_counting_loop,
    bench_package_driver
);
criterion_main!(benches);
