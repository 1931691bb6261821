//! Bit-width-aware integer ranges.
//!
//! [`ConstantRange`] approximates the set of values a machine integer can
//! take as a closed-open interval `[lower, upper)` over the bit patterns of a
//! fixed width. The interval may wrap around the modular boundary, which
//! keeps plain `add`/`sub` exact even in the presence of overflow; `lower ==
//! upper` encodes either the full or the empty set, disambiguated by an
//! explicit flag.
//!
//! Every binary operation requires both operands to share the same bit
//! width; mixing widths is a programming error and asserts rather than
//! silently truncating. All arithmetic operations return sound
//! over-approximations: the result contains every value producible from any
//! pair of values in the operands.

use std::fmt;

/// A set of `width`-bit values, represented as a wrapped closed-open
/// interval over unsigned bit patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstantRange {
    width: u32,
    lower: u64,
    upper: u64,
    /// Disambiguates `lower == upper`: `true` = full set, `false` = empty.
    full: bool,
}

impl ConstantRange {
    /// Creates the set of all `width`-bit values.
    #[must_use]
    pub fn full(width: u32) -> Self {
        assert!((1..=64).contains(&width), "invalid range width {width}");
        Self {
            width,
            lower: 0,
            upper: 0,
            full: true,
        }
    }

    /// Creates the empty set of `width`-bit values.
    #[must_use]
    pub fn empty(width: u32) -> Self {
        assert!((1..=64).contains(&width), "invalid range width {width}");
        Self {
            width,
            lower: 0,
            upper: 0,
            full: false,
        }
    }

    /// Creates `[lower, upper)`; a wrapped interval when `lower > upper`.
    ///
    /// `lower == upper` yields the empty set; use [`full`](Self::full) for
    /// the full set.
    #[must_use]
    pub fn new(width: u32, lower: u64, upper: u64) -> Self {
        assert!((1..=64).contains(&width), "invalid range width {width}");
        let lower = lower & Self::mask_for(width);
        let upper = upper & Self::mask_for(width);
        Self {
            width,
            lower,
            upper,
            full: false,
        }
    }

    /// Creates the singleton set `{value}`.
    #[must_use]
    pub fn single(width: u32, value: u64) -> Self {
        let value = value & Self::mask_for(width);
        let span = Self::span_for(width);
        Self::new(width, value, ((u128::from(value) + 1) % span) as u64)
    }

    /// Creates the smallest range covering the closed unsigned interval
    /// `[lo, hi]`.
    #[must_use]
    pub fn from_unsigned_closed(width: u32, lo: u64, hi: u64) -> Self {
        assert!(lo <= hi, "inverted unsigned bounds {lo} > {hi}");
        let span = Self::span_for(width);
        assert!(u128::from(hi) < span, "bound {hi} exceeds width {width}");
        if u128::from(hi - lo) + 1 >= span {
            return Self::full(width);
        }
        Self::new(width, lo, ((u128::from(hi) + 1) % span) as u64)
    }

    /// Creates the smallest range covering the closed signed interval
    /// `[lo, hi]`.
    #[must_use]
    pub fn from_signed_closed(width: u32, lo: i128, hi: i128) -> Self {
        assert!(lo <= hi, "inverted signed bounds {lo} > {hi}");
        let span = Self::span_for(width) as i128;
        if hi - lo + 1 >= span {
            return Self::full(width);
        }
        let lower = lo.rem_euclid(span) as u64;
        let upper = (hi + 1).rem_euclid(span) as u64;
        Self::new(width, lower, upper)
    }

    fn mask_for(width: u32) -> u64 {
        if width == 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        }
    }

    fn span_for(width: u32) -> u128 {
        1u128 << width
    }

    fn span(&self) -> u128 {
        Self::span_for(self.width)
    }

    /// The bit width of the values in this set.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Inclusive lower bound bit pattern (meaningless for full/empty).
    #[must_use]
    pub fn lower(&self) -> u64 {
        self.lower
    }

    /// Exclusive upper bound bit pattern (meaningless for full/empty).
    #[must_use]
    pub fn upper(&self) -> u64 {
        self.upper
    }

    /// Returns `true` for the full set.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.lower == self.upper && self.full
    }

    /// Returns `true` for the empty set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lower == self.upper && !self.full
    }

    /// Returns `true` if the interval wraps around the modular boundary.
    #[must_use]
    pub fn is_wrapped(&self) -> bool {
        self.lower > self.upper
    }

    /// Number of values in the set.
    #[must_use]
    pub fn cardinality(&self) -> u128 {
        if self.is_full() {
            self.span()
        } else {
            (u128::from(self.upper) + self.span() - u128::from(self.lower)) % self.span()
        }
    }

    /// Returns the sole member when the set is a singleton.
    #[must_use]
    pub fn single_element(&self) -> Option<u64> {
        (self.cardinality() == 1).then_some(self.lower)
    }

    /// Membership test on the bit pattern `value`.
    #[must_use]
    pub fn contains(&self, value: u64) -> bool {
        let value = value & Self::mask_for(self.width);
        if self.is_full() {
            return true;
        }
        if self.is_empty() {
            return false;
        }
        if self.is_wrapped() {
            value >= self.lower || value < self.upper
        } else {
            value >= self.lower && value < self.upper
        }
    }

    /// Membership test on a signed value.
    #[must_use]
    pub fn contains_signed(&self, value: i64) -> bool {
        self.contains(value as u64)
    }

    /// Returns `true` if every member of `other` is a member of `self`.
    #[must_use]
    pub fn contains_range(&self, other: &Self) -> bool {
        self.assert_same_width(other);
        other.segments().iter().all(|&(lo, hi)| {
            self.segments()
                .iter()
                .any(|&(slo, shi)| slo <= lo && hi <= shi)
        })
    }

    fn assert_same_width(&self, other: &Self) {
        assert_eq!(
            self.width, other.width,
            "mixed range widths {} and {}",
            self.width, other.width
        );
    }

    /// Decomposes the set into at most two non-wrapped half-open segments in
    /// `[0, 2^width)` space.
    fn segments(&self) -> Vec<(u128, u128)> {
        if self.is_empty() {
            return Vec::new();
        }
        if self.is_full() {
            return vec![(0, self.span())];
        }
        let (lo, up) = (u128::from(self.lower), u128::from(self.upper));
        if self.is_wrapped() {
            let mut segs = vec![(lo, self.span())];
            if up > 0 {
                segs.push((0, up));
            }
            segs
        } else {
            vec![(lo, up)]
        }
    }

    /// Builds the smallest wrapped interval covering all `segments`.
    ///
    /// The minimal cover is the complement of the largest circular gap
    /// between the merged segments.
    fn from_segments(width: u32, mut segments: Vec<(u128, u128)>) -> Self {
        segments.retain(|&(lo, hi)| lo < hi);
        if segments.is_empty() {
            return Self::empty(width);
        }
        segments.sort_unstable();
        let mut merged: Vec<(u128, u128)> = Vec::with_capacity(segments.len());
        for (lo, hi) in segments {
            match merged.last_mut() {
                Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }

        let span = Self::span_for(width);
        let covered: u128 = merged.iter().map(|&(lo, hi)| hi - lo).sum();
        if covered >= span {
            return Self::full(width);
        }

        // Largest circular gap; includes the wrap gap from the last segment
        // back to the first.
        let mut best_gap = 0u128;
        let mut best_at = (0u128, 0u128);
        for i in 0..merged.len() {
            let gap_lo = merged[i].1;
            let gap_hi = if i + 1 < merged.len() {
                merged[i + 1].0
            } else {
                merged[0].0 + span
            };
            if gap_hi - gap_lo > best_gap {
                best_gap = gap_hi - gap_lo;
                best_at = (gap_lo, gap_hi);
            }
        }
        let lower = (best_at.1 % span) as u64;
        let upper = (best_at.0 % span) as u64;
        Self::new(width, lower, upper)
    }

    /// Smallest range covering both sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        let mut segs = self.segments();
        segs.extend(other.segments());
        Self::from_segments(self.width, segs)
    }

    /// Smallest range covering the set intersection.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        let mut segs = Vec::new();
        for &(alo, ahi) in &self.segments() {
            for &(blo, bhi) in &other.segments() {
                let lo = alo.max(blo);
                let hi = ahi.min(bhi);
                if lo < hi {
                    segs.push((lo, hi));
                }
            }
        }
        Self::from_segments(self.width, segs)
    }

    /// Set complement.
    #[must_use]
    pub fn inverse(&self) -> Self {
        if self.is_full() {
            return Self::empty(self.width);
        }
        if self.is_empty() {
            return Self::full(self.width);
        }
        Self::new(self.width, self.upper, self.lower)
    }

    /// Smallest range covering `self \ other`.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.intersect(&other.inverse())
    }

    /// Smallest unsigned member (panics on the empty set).
    #[must_use]
    pub fn unsigned_min(&self) -> u64 {
        debug_assert!(!self.is_empty(), "unsigned_min of empty range");
        self.segments()
            .iter()
            .map(|&(lo, _)| lo as u64)
            .min()
            .unwrap_or(0)
    }

    /// Largest unsigned member (panics on the empty set).
    #[must_use]
    pub fn unsigned_max(&self) -> u64 {
        debug_assert!(!self.is_empty(), "unsigned_max of empty range");
        self.segments()
            .iter()
            .map(|&(_, hi)| (hi - 1) as u64)
            .max()
            .unwrap_or(0)
    }

    /// Signed segments: unsigned segments split at the sign boundary and
    /// mapped to signed values.
    fn signed_segments(&self) -> Vec<(i128, i128)> {
        let sign = self.span() / 2;
        let span = self.span() as i128;
        let mut out = Vec::new();
        for (lo, hi) in self.segments() {
            // Closed-open split at the sign boundary.
            if lo < sign && hi > sign {
                out.push((lo as i128, sign as i128));
                out.push((sign as i128 - span, hi as i128 - span));
            } else if lo >= sign {
                out.push((lo as i128 - span, hi as i128 - span));
            } else {
                out.push((lo as i128, hi as i128));
            }
        }
        out
    }

    /// Smallest signed member (panics on the empty set).
    #[must_use]
    pub fn signed_min(&self) -> i64 {
        debug_assert!(!self.is_empty(), "signed_min of empty range");
        self.signed_segments()
            .iter()
            .map(|&(lo, _)| lo as i64)
            .min()
            .unwrap_or(0)
    }

    /// Largest signed member (panics on the empty set).
    #[must_use]
    pub fn signed_max(&self) -> i64 {
        debug_assert!(!self.is_empty(), "signed_max of empty range");
        self.signed_segments()
            .iter()
            .map(|&(_, hi)| (hi - 1) as i64)
            .max()
            .unwrap_or(0)
    }

    /// Modular addition; exact for wrapped intervals.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let card = self.cardinality() + other.cardinality() - 1;
        if card >= self.span() {
            return Self::full(self.width);
        }
        let span = self.span();
        let lower = (u128::from(self.lower) + u128::from(other.lower)) % span;
        let upper = (lower + card) % span;
        Self::new(self.width, lower as u64, upper as u64)
    }

    /// Modular subtraction; exact for wrapped intervals.
    #[must_use]
    pub fn sub(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let card = self.cardinality() + other.cardinality() - 1;
        if card >= self.span() {
            return Self::full(self.width);
        }
        let span = self.span() as i128;
        // Smallest difference: our lower minus their largest member.
        let lower =
            (i128::from(self.lower) - (i128::from(other.upper) - 1)).rem_euclid(span) as u128;
        let upper = (lower + card) % self.span();
        Self::new(self.width, lower as u64, upper as u64)
    }

    /// Arithmetic negation (`0 - x`).
    #[must_use]
    pub fn negate(&self) -> Self {
        Self::single(self.width, 0).sub(self)
    }

    /// Multiplication; exact corner analysis where no overflow is possible,
    /// otherwise the full set.
    #[must_use]
    pub fn umul(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }

        // Unsigned view: min/max products bound the result when the largest
        // product still fits the width.
        let hi = u128::from(self.unsigned_max()) * u128::from(other.unsigned_max());
        if hi < self.span() {
            let lo = u128::from(self.unsigned_min()) * u128::from(other.unsigned_min());
            return Self::from_unsigned_closed(self.width, lo as u64, hi as u64);
        }

        // Signed view: corner products bound the result when they all fit.
        let (amin, amax) = (i128::from(self.signed_min()), i128::from(self.signed_max()));
        let (bmin, bmax) = (
            i128::from(other.signed_min()),
            i128::from(other.signed_max()),
        );
        let corners = [amin * bmin, amin * bmax, amax * bmin, amax * bmax];
        let lo = corners.iter().copied().min().unwrap_or(0);
        let hi = corners.iter().copied().max().unwrap_or(0);
        let smin = -((self.span() / 2) as i128);
        let smax = (self.span() / 2) as i128 - 1;
        if lo >= smin && hi <= smax {
            return Self::from_signed_closed(self.width, lo, hi);
        }

        Self::full(self.width)
    }

    /// Signed saturating multiplication.
    #[must_use]
    pub fn smul_sat(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let smin = -((self.span() / 2) as i128);
        let smax = (self.span() / 2) as i128 - 1;
        let (amin, amax) = (i128::from(self.signed_min()), i128::from(self.signed_max()));
        let (bmin, bmax) = (
            i128::from(other.signed_min()),
            i128::from(other.signed_max()),
        );
        let corners = [amin * bmin, amin * bmax, amax * bmin, amax * bmax]
            .map(|p| p.clamp(smin, smax));
        let lo = corners.iter().copied().min().unwrap_or(0);
        let hi = corners.iter().copied().max().unwrap_or(0);
        Self::from_signed_closed(self.width, lo, hi)
    }

    /// Unsigned saturating multiplication.
    #[must_use]
    pub fn umul_sat(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let cap = u128::from(Self::mask_for(self.width));
        let lo = (u128::from(self.unsigned_min()) * u128::from(other.unsigned_min())).min(cap);
        let hi = (u128::from(self.unsigned_max()) * u128::from(other.unsigned_max())).min(cap);
        Self::from_unsigned_closed(self.width, lo as u64, hi as u64)
    }

    /// Unsigned division. A divisor set of exactly `{0}` yields the empty
    /// set; a divisor that may be zero is treated as its non-zero part.
    #[must_use]
    pub fn udiv(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() || other.unsigned_max() == 0 {
            return Self::empty(self.width);
        }
        let bmin = other.unsigned_min().max(1);
        let bmax = other.unsigned_max();
        let lo = self.unsigned_min() / bmax;
        let hi = self.unsigned_max() / bmin;
        Self::from_unsigned_closed(self.width, lo, hi)
    }

    /// Signed division (truncating). Divisor zero handled as in
    /// [`udiv`](Self::udiv); the `MIN / -1` overflow case widens to full.
    #[must_use]
    pub fn sdiv(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() || other.single_element() == Some(0) {
            return Self::empty(self.width);
        }
        let smin = -((self.span() / 2) as i128);
        let (amin, amax) = (i128::from(self.signed_min()), i128::from(self.signed_max()));
        let (bmin, bmax) = (
            i128::from(other.signed_min()),
            i128::from(other.signed_max()),
        );
        if amin == smin && bmin <= -1 && -1 <= bmax {
            return Self::full(self.width);
        }

        // Extreme quotients occur at the divisor bounds or at ±1 when the
        // divisor straddles zero.
        let mut divisors = Vec::with_capacity(4);
        if bmin != 0 {
            divisors.push(bmin);
        }
        if bmax != 0 {
            divisors.push(bmax);
        }
        if bmin < -1 && bmax >= -1 {
            divisors.push(-1);
        }
        if bmin <= 1 && bmax > 1 {
            divisors.push(1);
        }
        if divisors.is_empty() {
            return Self::empty(self.width);
        }
        let mut lo = i128::MAX;
        let mut hi = i128::MIN;
        for b in divisors {
            for a in [amin, amax] {
                let q = a / b;
                lo = lo.min(q);
                hi = hi.max(q);
            }
        }
        Self::from_signed_closed(self.width, lo, hi)
    }

    /// Unsigned remainder; empty for a provably zero divisor.
    #[must_use]
    pub fn urem(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() || other.unsigned_max() == 0 {
            return Self::empty(self.width);
        }
        let bmin = other.unsigned_min().max(1);
        if self.unsigned_max() < bmin {
            // Dividend always smaller than any divisor: identity.
            return *self;
        }
        let hi = self.unsigned_max().min(other.unsigned_max() - 1);
        Self::from_unsigned_closed(self.width, 0, hi)
    }

    /// Signed remainder; the result takes the dividend's sign and its
    /// magnitude stays below the largest divisor magnitude.
    #[must_use]
    pub fn srem(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() || other.single_element() == Some(0) {
            return Self::empty(self.width);
        }
        let (amin, amax) = (i128::from(self.signed_min()), i128::from(self.signed_max()));
        let (bmin, bmax) = (
            i128::from(other.signed_min()),
            i128::from(other.signed_max()),
        );
        let bound = bmin.abs().max(bmax.abs()) - 1;
        let lo = if amin >= 0 { 0 } else { (-bound).max(amin) };
        let hi = if amax <= 0 { 0 } else { bound.min(amax) };
        Self::from_signed_closed(self.width, lo, hi)
    }

    /// Unsigned saturating addition.
    #[must_use]
    pub fn uadd_sat(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let cap = u128::from(Self::mask_for(self.width));
        let lo = (u128::from(self.unsigned_min()) + u128::from(other.unsigned_min())).min(cap);
        let hi = (u128::from(self.unsigned_max()) + u128::from(other.unsigned_max())).min(cap);
        Self::from_unsigned_closed(self.width, lo as u64, hi as u64)
    }

    /// Unsigned saturating subtraction.
    #[must_use]
    pub fn usub_sat(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let lo = self.unsigned_min().saturating_sub(other.unsigned_max());
        let hi = self.unsigned_max().saturating_sub(other.unsigned_min());
        Self::from_unsigned_closed(self.width, lo, hi)
    }

    /// Signed saturating addition.
    #[must_use]
    pub fn sadd_sat(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let smin = -((self.span() / 2) as i128);
        let smax = (self.span() / 2) as i128 - 1;
        let lo = (i128::from(self.signed_min()) + i128::from(other.signed_min())).clamp(smin, smax);
        let hi = (i128::from(self.signed_max()) + i128::from(other.signed_max())).clamp(smin, smax);
        Self::from_signed_closed(self.width, lo, hi)
    }

    /// Signed saturating subtraction.
    #[must_use]
    pub fn ssub_sat(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let smin = -((self.span() / 2) as i128);
        let smax = (self.span() / 2) as i128 - 1;
        let lo = (i128::from(self.signed_min()) - i128::from(other.signed_max())).clamp(smin, smax);
        let hi = (i128::from(self.signed_max()) - i128::from(other.signed_min())).clamp(smin, smax);
        Self::from_signed_closed(self.width, lo, hi)
    }

    /// Left shift; widens to full when any shift can move bits out.
    #[must_use]
    pub fn shl(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let bmax = other.unsigned_max();
        if bmax >= u64::from(self.width) {
            return Self::full(self.width);
        }
        let lo = u128::from(self.unsigned_min()) << other.unsigned_min();
        let hi = u128::from(self.unsigned_max()) << bmax;
        if hi >= self.span() {
            return Self::full(self.width);
        }
        Self::from_unsigned_closed(self.width, lo as u64, hi as u64)
    }

    /// Logical right shift.
    #[must_use]
    pub fn lshr(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let bmin = other.unsigned_min().min(63);
        let bmax = other.unsigned_max().min(63);
        let lo = self.unsigned_min() >> bmax;
        let hi = self.unsigned_max() >> bmin;
        Self::from_unsigned_closed(self.width, lo, hi)
    }

    /// Arithmetic right shift.
    #[must_use]
    pub fn ashr(&self, other: &Self) -> Self {
        self.assert_same_width(other);
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let bmin = other.unsigned_min().min(u64::from(self.width) - 1) as u32;
        let bmax = other.unsigned_max().min(u64::from(self.width) - 1) as u32;
        let (amin, amax) = (i128::from(self.signed_min()), i128::from(self.signed_max()));
        let corners = [amin >> bmin, amin >> bmax, amax >> bmin, amax >> bmax];
        let lo = corners.iter().copied().min().unwrap_or(0);
        let hi = corners.iter().copied().max().unwrap_or(0);
        Self::from_signed_closed(self.width, lo, hi)
    }

    /// Zero-extension to a strictly wider type.
    #[must_use]
    pub fn zext(&self, new_width: u32) -> Self {
        assert!(
            new_width > self.width && new_width <= 64,
            "invalid zext {} -> {new_width}",
            self.width
        );
        if self.is_empty() {
            return Self::empty(new_width);
        }
        Self::from_unsigned_closed(new_width, self.unsigned_min(), self.unsigned_max())
    }

    /// Sign-extension to a strictly wider type.
    #[must_use]
    pub fn sext(&self, new_width: u32) -> Self {
        assert!(
            new_width > self.width && new_width <= 64,
            "invalid sext {} -> {new_width}",
            self.width
        );
        if self.is_empty() {
            return Self::empty(new_width);
        }
        Self::from_signed_closed(
            new_width,
            i128::from(self.signed_min()),
            i128::from(self.signed_max()),
        )
    }

    /// Truncation to a strictly narrower type; exact when the set still fits
    /// a contiguous stretch of the narrower space.
    #[must_use]
    pub fn trunc(&self, new_width: u32) -> Self {
        assert!(
            new_width < self.width && new_width >= 1,
            "invalid trunc {} -> {new_width}",
            self.width
        );
        if self.is_empty() {
            return Self::empty(new_width);
        }
        let new_span = Self::span_for(new_width);
        let card = self.cardinality();
        if card >= new_span {
            return Self::full(new_width);
        }
        let lower = u128::from(self.lower) % new_span;
        let upper = (lower + card) % new_span;
        Self::new(new_width, lower as u64, upper as u64)
    }
}

impl fmt::Display for ConstantRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_full() {
            write!(f, "full:i{}", self.width)
        } else if self.is_empty() {
            write!(f, "empty:i{}", self.width)
        } else {
            write!(f, "[{}, {}):i{}", self.lower, self.upper, self.width)
        }
    }
}
