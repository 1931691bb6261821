//! Diagnostic reporting for the analysis engine.
//!
//! Analyses discover definite errors (division by zero, guaranteed overflow,
//! invalid shifts, out-of-bounds accesses) while folding expressions. Rather
//! than aborting, they record a [`Diagnostic`] describing the finding and keep
//! going, so a single run over a function surfaces every provable error.
//!
//! # Architecture
//!
//! The module is built around three types:
//!
//! - [`Diagnostic`] - a single finding with kind, source location, message and
//!   optional notes
//! - [`DiagnosticLog`] - append-only collection with query helpers; safe to
//!   share across analysis threads
//! - [`DiagnosticBuilder`] - fluent API for recording a finding; the
//!   diagnostic is committed when the builder drops
//!
//! # Example
//!
//! ```rust,ignore
//! log.report(DiagnosticKind::DivisionByZero)
//!     .at(expr.location())
//!     .message("expression divides by a provably zero value");
//! ```

use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use strum::{Display, EnumIter};

use crate::chir::Location;

/// Categories of definite errors the analyses can prove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DiagnosticKind {
    /// The right operand of `/` is provably zero.
    DivisionByZero,
    /// The right operand of `%` is provably zero.
    ModuloByZero,
    /// An overflow-checked arithmetic expression provably overflows.
    ArithmeticOverflow,
    /// A shift amount is negative or at least the operand's bit width.
    InvalidShiftAmount,
    /// An array or varray index is provably outside the tracked bounds.
    IndexOutOfBounds,
    /// A `Range` is constructed with a provably zero step.
    RangeStepZero,
}

impl DiagnosticKind {
    /// Returns a short human-readable description of this kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticKind::DivisionByZero => "division by zero",
            DiagnosticKind::ModuloByZero => "modulo by zero",
            DiagnosticKind::ArithmeticOverflow => "arithmetic overflow",
            DiagnosticKind::InvalidShiftAmount => "invalid shift amount",
            DiagnosticKind::IndexOutOfBounds => "index out of bounds",
            DiagnosticKind::RangeStepZero => "range step is zero",
        }
    }
}

/// A single finding produced by an analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// What was proven.
    pub kind: DiagnosticKind,
    /// Source location of the offending expression, when known.
    pub location: Option<Location>,
    /// Primary message, e.g. `the result of this computation may overflow`.
    pub message: String,
    /// Supplementary notes, e.g. the representable range of the result type.
    pub notes: Vec<String>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = &self.location {
            write!(f, "{loc}: ")?;
        }
        write!(f, "{}", self.message)?;
        for note in &self.notes {
            write!(f, "\n  note: {note}")?;
        }
        Ok(())
    }
}

/// Fluent builder for a [`Diagnostic`].
///
/// Created by [`DiagnosticLog::report`]; the diagnostic is appended to the log
/// when the builder is dropped. A missing message falls back to the kind's
/// description.
pub struct DiagnosticBuilder<'a> {
    log: &'a DiagnosticLog,
    kind: DiagnosticKind,
    location: Option<Location>,
    message: Option<String>,
    notes: Vec<String>,
}

impl<'a> DiagnosticBuilder<'a> {
    fn new(log: &'a DiagnosticLog, kind: DiagnosticKind) -> Self {
        Self {
            log,
            kind,
            location: None,
            message: None,
            notes: Vec::new(),
        }
    }

    /// Sets the source location of the finding.
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets the primary message.
    #[must_use]
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Appends a supplementary note.
    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl Drop for DiagnosticBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        self.log.push(Diagnostic {
            kind: self.kind,
            location: self.location.take(),
            message,
            notes: std::mem::take(&mut self.notes),
        });
    }
}

/// Append-only collection of diagnostics.
///
/// Thread-safe: findings can be recorded through shared references, so
/// per-function analyses running on worker threads can all report into one
/// log, and a per-function log can be merged into a package-wide one.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Clone for DiagnosticLog {
    fn clone(&self) -> Self {
        Self {
            entries: Mutex::new(self.entries()),
        }
    }
}

impl DiagnosticLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts recording a finding of the given kind.
    ///
    /// The diagnostic is appended when the returned builder drops.
    pub fn report(&self, kind: DiagnosticKind) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder::new(self, kind)
    }

    fn push(&self, diag: Diagnostic) {
        self.lock().push(diag);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if nothing has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the number of recorded diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if a finding of the given kind was recorded.
    #[must_use]
    pub fn has(&self, kind: DiagnosticKind) -> bool {
        self.lock().iter().any(|d| d.kind == kind)
    }

    /// Counts findings of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: DiagnosticKind) -> usize {
        self.lock().iter().filter(|d| d.kind == kind).count()
    }

    /// Returns a snapshot of all recorded diagnostics.
    #[must_use]
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    /// Removes and returns all recorded diagnostics.
    #[must_use]
    pub fn drain(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    /// Appends all diagnostics from `other` into this log.
    pub fn merge(&self, other: &DiagnosticLog) {
        let mut moved = other.drain();
        self.lock().append(&mut moved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn builder_commits_on_drop() {
        let log = DiagnosticLog::new();
        log.report(DiagnosticKind::DivisionByZero)
            .at(Location::new(1, 10, 4))
            .message("right operand of `/` is always 0");
        assert_eq!(log.len(), 1);

        let entries = log.entries();
        assert_eq!(entries[0].kind, DiagnosticKind::DivisionByZero);
        assert_eq!(entries[0].location, Some(Location::new(1, 10, 4)));
        assert_eq!(entries[0].message, "right operand of `/` is always 0");
    }

    #[test]
    fn missing_message_uses_description() {
        let log = DiagnosticLog::new();
        log.report(DiagnosticKind::RangeStepZero);
        assert_eq!(log.entries()[0].message, "range step is zero");
    }

    #[test]
    fn notes_render_after_message() {
        let log = DiagnosticLog::new();
        log.report(DiagnosticKind::ArithmeticOverflow)
            .message("the result of this computation may overflow")
            .note("Int8 represents -128 ~ 127");
        let rendered = log.entries()[0].to_string();
        assert!(rendered.contains("may overflow"));
        assert!(rendered.contains("note: Int8 represents -128 ~ 127"));
    }

    #[test]
    fn merge_moves_entries() {
        let local = DiagnosticLog::new();
        local.report(DiagnosticKind::IndexOutOfBounds);
        local.report(DiagnosticKind::ModuloByZero);

        let global = DiagnosticLog::new();
        global.merge(&local);
        assert!(local.is_empty());
        assert_eq!(global.len(), 2);
        assert!(global.has(DiagnosticKind::IndexOutOfBounds));
        assert_eq!(global.count_kind(DiagnosticKind::ModuloByZero), 1);
    }

    #[test]
    fn every_kind_has_a_description() {
        for kind in DiagnosticKind::iter() {
            assert!(!kind.description().is_empty());
        }
    }
}
