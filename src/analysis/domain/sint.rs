//! Payloads for the range analysis.
//!
//! [`SIntDomain`] tracks an integer value as a [`ConstantRange`] plus the
//! signedness of its static type, optionally augmented with symbolic bounds
//! inherited from comparisons against other tracked values. [`BoolDomain`] is
//! the four-valued boolean lattice, encoded in two bits so that bit-or is
//! join and bit-and is meet.

use std::collections::BTreeMap;
use std::fmt;

use bitflags::bitflags;

use crate::chir::ValueId;

use super::{ConstantRange, DomainPayload};

bitflags! {
    /// Four-valued boolean: each bit records whether that truth value can
    /// occur. Empty = Bottom (unreachable), both bits = Top.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BoolDomain: u8 {
        /// The value may be `false`.
        const FALSE = 0b01;
        /// The value may be `true`.
        const TRUE = 0b10;
    }
}

impl BoolDomain {
    /// The unreachable boolean.
    pub const BOTTOM: Self = Self::empty();
    /// The unknown boolean.
    pub const TOP: Self = Self::FALSE.union(Self::TRUE);

    /// Lifts a concrete boolean.
    #[must_use]
    pub fn from_bool(value: bool) -> Self {
        if value {
            Self::TRUE
        } else {
            Self::FALSE
        }
    }

    /// Returns the concrete value when exactly one truth value can occur.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        if *self == Self::TRUE {
            Some(true)
        } else if *self == Self::FALSE {
            Some(false)
        } else {
            None
        }
    }

    /// Lattice join (bit-or).
    #[must_use]
    pub fn lattice_join(&self, other: &Self) -> Self {
        *self | *other
    }

    /// Lattice meet (bit-and).
    #[must_use]
    pub fn lattice_meet(&self, other: &Self) -> Self {
        *self & *other
    }

    /// Kleene conjunction: false wins over unknown.
    #[must_use]
    pub fn logical_and(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::BOTTOM;
        }
        if *self == Self::FALSE || *other == Self::FALSE {
            return Self::FALSE;
        }
        if *self == Self::TRUE && *other == Self::TRUE {
            return Self::TRUE;
        }
        Self::TOP
    }

    /// Kleene disjunction: true wins over unknown.
    #[must_use]
    pub fn logical_or(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::BOTTOM;
        }
        if *self == Self::TRUE || *other == Self::TRUE {
            return Self::TRUE;
        }
        if *self == Self::FALSE && *other == Self::FALSE {
            return Self::FALSE;
        }
        Self::TOP
    }

    /// Negation swaps the truth bits.
    #[must_use]
    pub fn logical_not(&self) -> Self {
        let mut out = Self::BOTTOM;
        if self.contains(Self::FALSE) {
            out |= Self::TRUE;
        }
        if self.contains(Self::TRUE) {
            out |= Self::FALSE;
        }
        out
    }
}

impl DomainPayload for BoolDomain {
    fn join(&self, other: &Self) -> Option<Self> {
        Some(self.lattice_join(other))
    }
}

impl fmt::Display for BoolDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "⊥")
        } else if *self == Self::FALSE {
            write!(f, "false")
        } else if *self == Self::TRUE {
            write!(f, "true")
        } else {
            write!(f, "⊤")
        }
    }
}

/// Range-tracked integer: interval plus signedness plus symbolic bounds.
///
/// The symbolic map records ranges inherited from other values at comparison
/// points (e.g. an index compared against a tracked length slot). A join
/// keeps only the entries both sides agree on.
#[derive(Debug, Clone, PartialEq)]
pub struct SIntDomain {
    range: ConstantRange,
    signed: bool,
    symbolic: BTreeMap<ValueId, ConstantRange>,
}

impl SIntDomain {
    /// Wraps a range with the given signedness.
    #[must_use]
    pub fn new(range: ConstantRange, signed: bool) -> Self {
        Self {
            range,
            signed,
            symbolic: BTreeMap::new(),
        }
    }

    /// The full range of a `width`-bit integer.
    #[must_use]
    pub fn top(width: u32, signed: bool) -> Self {
        Self::new(ConstantRange::full(width), signed)
    }

    /// A singleton range from a concrete bit pattern.
    #[must_use]
    pub fn singleton(width: u32, signed: bool, bits: u64) -> Self {
        Self::new(ConstantRange::single(width, bits), signed)
    }

    /// The tracked interval.
    #[must_use]
    pub fn range(&self) -> &ConstantRange {
        &self.range
    }

    /// Whether the static type is signed.
    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// The sole concrete value, when the interval is a singleton.
    #[must_use]
    pub fn single_element(&self) -> Option<u64> {
        self.range.single_element()
    }

    /// Replaces the interval, keeping signedness and symbolic bounds.
    #[must_use]
    pub fn with_range(&self, range: ConstantRange) -> Self {
        Self {
            range,
            signed: self.signed,
            symbolic: self.symbolic.clone(),
        }
    }

    /// Narrows the interval by intersection.
    #[must_use]
    pub fn narrowed(&self, bound: &ConstantRange) -> Self {
        self.with_range(self.range.intersect(bound))
    }

    /// Records a bound inherited from the value `source`.
    pub fn add_symbolic_bound(&mut self, source: ValueId, bound: ConstantRange) {
        self.symbolic.insert(source, bound);
    }

    /// Looks up an inherited bound.
    #[must_use]
    pub fn symbolic_bound(&self, source: ValueId) -> Option<&ConstantRange> {
        self.symbolic.get(&source)
    }
}

impl DomainPayload for SIntDomain {
    fn join(&self, other: &Self) -> Option<Self> {
        debug_assert_eq!(
            self.signed, other.signed,
            "joined ranges of differing signedness"
        );
        let range = self.range.union(&other.range);
        // Symbolic bounds survive a merge only when both paths agree.
        let symbolic = self
            .symbolic
            .iter()
            .filter(|(id, bound)| other.symbolic.get(id) == Some(bound))
            .map(|(id, bound)| (*id, *bound))
            .collect();
        Some(Self {
            range,
            signed: self.signed,
            symbolic,
        })
    }
}

impl fmt::Display for SIntDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.range.is_full() || self.range.is_empty() {
            return write!(f, "{}", self.range);
        }
        if self.signed {
            write!(f, "[{}, {}]", self.range.signed_min(), self.range.signed_max())
        } else {
            write!(
                f,
                "[{}, {}]",
                self.range.unsigned_min(),
                self.range.unsigned_max()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_lattice_encoding() {
        assert_eq!(BoolDomain::BOTTOM.bits(), 0b00);
        assert_eq!(BoolDomain::FALSE.bits(), 0b01);
        assert_eq!(BoolDomain::TRUE.bits(), 0b10);
        assert_eq!(BoolDomain::TOP.bits(), 0b11);

        // Bit-or is join, bit-and is meet.
        assert_eq!(
            BoolDomain::FALSE.lattice_join(&BoolDomain::TRUE),
            BoolDomain::TOP
        );
        assert_eq!(
            BoolDomain::TOP.lattice_meet(&BoolDomain::FALSE),
            BoolDomain::FALSE
        );
    }

    #[test]
    fn kleene_tables() {
        use BoolDomain as B;
        // False dominates AND even against unknown.
        assert_eq!(B::FALSE.logical_and(&B::TOP), B::FALSE);
        assert_eq!(B::TOP.logical_and(&B::FALSE), B::FALSE);
        assert_eq!(B::TRUE.logical_and(&B::TRUE), B::TRUE);
        assert_eq!(B::TRUE.logical_and(&B::TOP), B::TOP);
        // True dominates OR.
        assert_eq!(B::TRUE.logical_or(&B::TOP), B::TRUE);
        assert_eq!(B::FALSE.logical_or(&B::FALSE), B::FALSE);
        assert_eq!(B::FALSE.logical_or(&B::TOP), B::TOP);
        // Bottom propagates.
        assert_eq!(B::BOTTOM.logical_and(&B::FALSE), B::BOTTOM);
        assert_eq!(B::BOTTOM.logical_or(&B::TRUE), B::BOTTOM);
        // Negation.
        assert_eq!(B::TRUE.logical_not(), B::FALSE);
        assert_eq!(B::TOP.logical_not(), B::TOP);
        assert_eq!(B::BOTTOM.logical_not(), B::BOTTOM);
    }

    #[test]
    fn sint_join_hulls_ranges() {
        let a = SIntDomain::new(ConstantRange::from_unsigned_closed(32, 0, 10), false);
        let b = SIntDomain::new(ConstantRange::from_unsigned_closed(32, 20, 30), false);
        let j = a.join(&b).unwrap();
        assert_eq!(j.range().unsigned_min(), 0);
        assert_eq!(j.range().unsigned_max(), 30);
    }

    #[test]
    fn sint_join_drops_disagreeing_symbolic_bounds() {
        let len = ValueId(3);
        let bound_a = ConstantRange::from_unsigned_closed(32, 0, 9);
        let bound_b = ConstantRange::from_unsigned_closed(32, 0, 4);

        let mut a = SIntDomain::top(32, false);
        a.add_symbolic_bound(len, bound_a);
        let mut b = SIntDomain::top(32, false);
        b.add_symbolic_bound(len, bound_a);

        let j = a.join(&b).unwrap();
        assert_eq!(j.symbolic_bound(len), Some(&bound_a));

        let mut c = SIntDomain::top(32, false);
        c.add_symbolic_bound(len, bound_b);
        let j = a.join(&c).unwrap();
        assert_eq!(j.symbolic_bound(len), None);
    }

    #[test]
    fn narrowing_intersects() {
        let v = SIntDomain::new(ConstantRange::from_unsigned_closed(32, 0, 100), false);
        let n = v.narrowed(&ConstantRange::from_unsigned_closed(32, 50, 200));
        assert_eq!(n.range().unsigned_min(), 50);
        assert_eq!(n.range().unsigned_max(), 100);
    }
}
