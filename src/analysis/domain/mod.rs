//! Abstract value lattices used by the analyses.
//!
//! Every analysis in this crate works over the same three-level shape: a
//! payload type carrying the actual facts (an exact constant, an integer
//! range, a boolean truth value) wrapped in [`AbstractDomain`], which adds the
//! two lattice bounds.
//!
//! # Lattice Theory Background
//!
//! - **Top (⊤)**: no information; the value could be anything
//! - **Bottom (⊥)**: unreachable; no execution produces this value
//! - **Val(p)**: the payload `p` describes every value that can occur
//!
//! Join is the least upper bound and must be idempotent, commutative and
//! associative; transfer functions must be monotone over it so the fixpoint
//! engine terminates. Payloads signal whether a join actually widened the
//! value, which is what drives the engine's worklist.

use std::fmt::{self, Debug, Display};

mod const_value;
mod range;
mod sint;

pub use const_value::ConstValue;
pub use range::ConstantRange;
pub use sint::{BoolDomain, SIntDomain};

/// A payload type usable inside [`AbstractDomain`].
///
/// `join` combines the facts of two payloads of the same static type:
///
/// - `Some(p)` - the combined payload, when it is still expressible
/// - `None` - the combination is not expressible; the caller widens to Top
///
/// `join(x, x)` must return `Some(x)` (idempotence), and the result must be
/// at least as general as both inputs (soundness).
pub trait DomainPayload: Clone + Debug + Display + PartialEq + Sized {
    /// Least upper bound of two payloads, or `None` when only Top covers both.
    #[must_use]
    fn join(&self, other: &Self) -> Option<Self>;
}

/// An abstract value: a payload bracketed by the lattice bounds.
///
/// Access to the payload is by pattern matching or the checked
/// [`value`](Self::value) accessor; there is deliberately no unchecked
/// downcast.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AbstractDomain<P: DomainPayload> {
    /// Unreachable / not yet computed.
    Bottom,
    /// The payload describes every possible runtime value.
    Val(P),
    /// Any value at all.
    #[default]
    Top,
}

impl<P: DomainPayload> AbstractDomain<P> {
    /// Returns the payload when this is `Val`, otherwise `None`.
    #[must_use]
    pub fn value(&self) -> Option<&P> {
        match self {
            Self::Val(p) => Some(p),
            _ => None,
        }
    }

    /// Returns `true` for the Top element.
    #[must_use]
    pub fn is_top(&self) -> bool {
        matches!(self, Self::Top)
    }

    /// Returns `true` for the Bottom element.
    #[must_use]
    pub fn is_bottom(&self) -> bool {
        matches!(self, Self::Bottom)
    }

    /// Least upper bound.
    ///
    /// Returns the joined value together with a flag telling whether the
    /// result differs from `self`; the engine requeues successors only when
    /// a join changed something.
    #[must_use]
    pub fn join(&self, other: &Self) -> (Self, bool) {
        match (self, other) {
            (Self::Top, _) => (Self::Top, false),
            (_, Self::Bottom) => (self.clone(), false),
            (Self::Bottom, v) => (v.clone(), !matches!(v, Self::Bottom)),
            (Self::Val(_), Self::Top) => (Self::Top, true),
            (Self::Val(a), Self::Val(b)) => match a.join(b) {
                Some(joined) => {
                    let changed = joined != *a;
                    (Self::Val(joined), changed)
                }
                None => (Self::Top, true),
            },
        }
    }
}

impl<P: DomainPayload> Display for AbstractDomain<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bottom => write!(f, "⊥"),
            Self::Val(p) => write!(f, "{p}"),
            Self::Top => write!(f, "⊤"),
        }
    }
}
