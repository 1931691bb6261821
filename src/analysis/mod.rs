//! Dataflow analyses over CHIR functions.
//!
//! The crate ships one engine and two instantiations:
//!
//! - [`constant`] - exact constant folding with overflow/bounds checking
//! - [`ranges`] - integer/boolean range propagation
//!
//! Both run forward to a fixpoint via [`engine::analyze`] and share the
//! state, pool and object-graph machinery. [`driver::PackageChecker`] runs
//! them across a whole package in parallel and caches per-function results.

pub mod constant;
pub mod domain;
pub mod driver;
pub mod engine;
pub mod object;
pub mod pool;
pub mod ranges;
pub mod signature;
pub mod state;

/// Outcome of a checked operation at one program point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    /// The check provably passes; the runtime check can be elided.
    Success,
    /// The check provably fails on every execution reaching it.
    Fail,
    /// Not enough information to decide.
    NA,
}

pub use constant::{ConstAnalysis, ConstantResults};
pub use domain::{AbstractDomain, BoolDomain, ConstValue, ConstantRange, DomainPayload, SIntDomain};
pub use driver::{CheckFuncResult, CheckerConfig, PackageChecker};
pub use engine::{analyze, EngineResults, TransferFunctions};
pub use object::{FieldKey, ObjectGraph};
pub use pool::{ActiveStatePool, DefaultStatePool, StatePool};
pub use ranges::{RangeAnalysis, RangeResults, RangeValue};
pub use signature::{SignatureTable, StdlibOp};
pub use state::{ActiveState, DefaultState, State};
