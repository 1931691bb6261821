//! Whole-package analysis driver.
//!
//! Functions of a package are independent analysis tasks: the IR is
//! read-only during a run and every per-function fact lands in that
//! function's own [`CheckFuncResult`], so the driver fans the work out on
//! the rayon pool with no shared mutable state beyond the concurrent result
//! cache. Tasks are ordered by descending block count so the most expensive
//! functions start first and stragglers do not serialize the tail of the
//! run.
//!
//! Results are cached per [`FuncId`] across calls; an edited function is
//! re-analyzed after [`PackageChecker::invalidate`]. Functions above the
//! engine's block-count limit are skipped and deliberately left out of the
//! cache.

use dashmap::mapref::one::Ref;
use dashmap::DashMap;
use rayon::prelude::*;

use crate::analysis::constant::{self, ConstantResults};
use crate::analysis::engine::OVERHEAD_BLOCK_SIZE;
use crate::analysis::ranges::{self, RangeResults};
use crate::analysis::signature::SignatureTable;
use crate::chir::{Func, FuncId};
use crate::diagnostics::Diagnostic;
use crate::Result;

/// Knobs for a package run.
#[derive(Debug, Clone, Default)]
pub struct CheckerConfig {
    /// Record the constant-fold trace of every analyzed function.
    pub trace: bool,
    /// Also run the range analysis after constant folding.
    pub ranges: bool,
}

/// Combined per-function analysis output.
#[derive(Debug)]
pub struct CheckFuncResult {
    /// Constant analysis output.
    pub constants: ConstantResults,
    /// Range analysis output, when enabled.
    pub ranges: Option<RangeResults>,
}

impl CheckFuncResult {
    /// All diagnostics of both analyses, in emission order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.constants
            .diagnostics
            .iter()
            .chain(self.ranges.iter().flat_map(|r| r.diagnostics.iter()))
    }
}

/// Runs the analyses across a package and caches per-function results.
pub struct PackageChecker {
    config: CheckerConfig,
    table: SignatureTable,
    cache: DashMap<FuncId, CheckFuncResult>,
}

impl PackageChecker {
    /// Creates a checker with the given configuration.
    #[must_use]
    pub fn new(config: CheckerConfig) -> Self {
        Self {
            config,
            table: SignatureTable::standard(),
            cache: DashMap::new(),
        }
    }

    /// Analyzes every function not already cached.
    ///
    /// Tasks run in parallel; the call returns once the whole package is
    /// done or the first invalid function is hit.
    pub fn run(&self, funcs: &[Func]) -> Result<()> {
        let mut pending: Vec<&Func> = funcs
            .iter()
            .filter(|f| {
                f.block_count() <= OVERHEAD_BLOCK_SIZE && !self.cache.contains_key(&f.id())
            })
            .collect();
        pending.sort_by(|a, b| b.block_count().cmp(&a.block_count()));

        pending.into_par_iter().try_for_each(|func| -> Result<()> {
            let constants = constant::check_func(func, &self.table, self.config.trace)?;
            let range_results = if self.config.ranges {
                Some(ranges::check_func(func, &self.table)?)
            } else {
                None
            };
            self.cache.insert(
                func.id(),
                CheckFuncResult {
                    constants,
                    ranges: range_results,
                },
            );
            Ok(())
        })
    }

    /// Cached result of one function, if it was analyzed.
    #[must_use]
    pub fn check_func_result(&self, id: FuncId) -> Option<Ref<'_, FuncId, CheckFuncResult>> {
        self.cache.get(&id)
    }

    /// Drops one function's cached result so the next run re-analyzes it.
    pub fn invalidate(&self, id: FuncId) {
        self.cache.remove(&id);
    }

    /// Drops every cached result.
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    /// Number of cached function results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Snapshot of every diagnostic across the package, sorted by location.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut all: Vec<Diagnostic> = self
            .cache
            .iter()
            .flat_map(|entry| entry.value().diagnostics().cloned().collect::<Vec<_>>())
            .collect();
        all.sort_by_key(|d| d.location.map(|l| (l.file, l.line, l.column)));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chir::{BinaryOp, ChirType, FuncBuilder, IntKind};
    use crate::diagnostics::DiagnosticKind;

    fn int64() -> ChirType {
        ChirType::Int(IntKind::I64)
    }

    fn div_by_zero_func(id: u32) -> Func {
        let mut fb = FuncBuilder::new("buggy").with_id(FuncId(id));
        let x = fb.param(int64());
        fb.build_with(|f| {
            f.block(0, |b| {
                let z = b.const_int(0, IntKind::I64);
                b.binary(BinaryOp::Div, x, z, int64());
                b.exit();
            });
        })
    }

    fn clean_func(id: u32) -> Func {
        FuncBuilder::new("clean")
            .with_id(FuncId(id))
            .build_with(|f| {
                f.block(0, |b| {
                    let a = b.const_int(2, IntKind::I64);
                    let c = b.const_int(3, IntKind::I64);
                    b.binary(BinaryOp::Add, a, c, int64());
                    b.exit();
                });
            })
    }

    #[test]
    fn analyzes_every_function_and_caches() {
        let funcs = vec![clean_func(0), div_by_zero_func(1), clean_func(2)];
        let checker = PackageChecker::new(CheckerConfig::default());
        checker.run(&funcs).unwrap();
        assert_eq!(checker.len(), 3);
        let buggy = checker.check_func_result(FuncId(1)).unwrap();
        assert_eq!(buggy.constants.diagnostics.len(), 1);
        assert_eq!(
            buggy.constants.diagnostics[0].kind,
            DiagnosticKind::DivisionByZero
        );
        drop(buggy);
        assert!(checker
            .check_func_result(FuncId(0))
            .unwrap()
            .constants
            .diagnostics
            .is_empty());
    }

    #[test]
    fn second_run_reuses_the_cache() {
        let funcs = vec![clean_func(0)];
        let checker = PackageChecker::new(CheckerConfig::default());
        checker.run(&funcs).unwrap();
        checker.run(&funcs).unwrap();
        assert_eq!(checker.len(), 1);
    }

    #[test]
    fn invalidation_forces_reanalysis() {
        let funcs = vec![clean_func(0), clean_func(1)];
        let checker = PackageChecker::new(CheckerConfig::default());
        checker.run(&funcs).unwrap();
        checker.invalidate(FuncId(0));
        assert_eq!(checker.len(), 1);
        checker.run(&funcs).unwrap();
        assert_eq!(checker.len(), 2);
        checker.invalidate_all();
        assert!(checker.is_empty());
    }

    #[test]
    fn range_analysis_is_opt_in() {
        let funcs = vec![clean_func(0)];
        let without = PackageChecker::new(CheckerConfig::default());
        without.run(&funcs).unwrap();
        assert!(without
            .check_func_result(FuncId(0))
            .unwrap()
            .ranges
            .is_none());

        let with = PackageChecker::new(CheckerConfig {
            ranges: true,
            ..CheckerConfig::default()
        });
        with.run(&funcs).unwrap();
        assert!(with.check_func_result(FuncId(0)).unwrap().ranges.is_some());
    }

    #[test]
    fn oversized_functions_stay_uncached() {
        let huge = FuncBuilder::new("huge").build_with(|f| {
            for i in 0..=OVERHEAD_BLOCK_SIZE {
                f.block(i, |b| {
                    if i < OVERHEAD_BLOCK_SIZE {
                        b.goto(i + 1);
                    } else {
                        b.exit();
                    }
                });
            }
        });
        let checker = PackageChecker::new(CheckerConfig::default());
        checker.run(&[huge]).unwrap();
        assert!(checker.is_empty());
        assert!(checker.check_func_result(FuncId(0)).is_none());
    }

    #[test]
    fn package_diagnostics_are_sorted_by_location() {
        let funcs = vec![div_by_zero_func(0), div_by_zero_func(1)];
        let checker = PackageChecker::new(CheckerConfig::default());
        checker.run(&funcs).unwrap();
        let all = checker.diagnostics();
        assert_eq!(all.len(), 2);
        let locs: Vec<_> = all.iter().map(|d| d.location.unwrap()).collect();
        assert!(locs[0].line <= locs[1].line);
    }
}
