// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]

//! # chir-dataflow
//!
//! Constant-folding and integer-range dataflow analysis for the CHIR
//! mid-level compiler IR.
//!
//! The crate takes already-checked CHIR functions and runs forward abstract
//! interpretation over their control-flow graphs. Two analyses share one
//! fixpoint engine:
//!
//! - **Constant analysis** folds expressions to exact values, decides the
//!   outcome of checked operations (overflow, division by zero, shift
//!   validation, array bounds, range construction), and records which
//!   runtime checks codegen can elide.
//! - **Range analysis** propagates integer intervals and three-valued
//!   booleans, proving the same properties from bounds where exact values
//!   are unavailable, including refinement along taken branch edges.
//!
//! Provable runtime failures surface as [`diagnostics::Diagnostic`]s;
//! everything an analysis learns is published in per-function result
//! structures without mutating the IR. [`analysis::PackageChecker`] fans a
//! whole package out across the rayon thread pool and caches results per
//! function.
//!
//! ## Quick Start
//!
//! ```rust
//! use chir_dataflow::prelude::*;
//!
//! let mut fb = FuncBuilder::new("always_fails");
//! let x = fb.param(ChirType::Int(IntKind::I64));
//! let func = fb.build_with(|f| {
//!     f.block(0, |b| {
//!         let zero = b.const_int(0, IntKind::I64);
//!         b.binary(BinaryOp::Div, x, zero, ChirType::Int(IntKind::I64));
//!         b.exit();
//!     });
//! });
//!
//! let checker = PackageChecker::new(CheckerConfig::default());
//! checker.run(std::slice::from_ref(&func))?;
//! let result = checker.check_func_result(func.id()).expect("analyzed");
//! assert_eq!(result.constants.diagnostics.len(), 1);
//! # Ok::<(), chir_dataflow::Error>(())
//! ```

pub mod analysis;
pub mod chir;
pub mod diagnostics;

mod error;

pub use error::Error;

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

pub mod prelude {
    //! Convenient access to the most commonly used types.

    pub use crate::analysis::{
        AbstractDomain, BoolDomain, CheckFuncResult, CheckerConfig, ConstValue, ConstantRange,
        ConstantResults, ExceptionKind, PackageChecker, RangeResults, RangeValue, SIntDomain,
        SignatureTable,
    };
    pub use crate::chir::{
        BinaryOp, ChirType, ExprId, Func, FuncBuilder, FuncId, IntKind, Literal,
        OverflowStrategy, UnaryOp, ValueId,
    };
    pub use crate::diagnostics::{Diagnostic, DiagnosticKind};
    pub use crate::{Error, Result};
}
