//! Per-program-point abstract environment.
//!
//! A [`State`] maps value ids to [`AbstractDomain`] facts through a pluggable
//! [`StatePool`]. An untracked id reads as Top: values are single-assignment,
//! so an id missing from an incoming state is either undefined along that
//! path or was evicted by a bounded pool, and both cases are safely treated
//! as "could be anything".

use crate::analysis::domain::{AbstractDomain, DomainPayload};
use crate::analysis::object::ObjectGraph;
use crate::analysis::pool::{ActiveStatePool, DefaultStatePool, StatePool};
use crate::chir::ValueId;

/// Abstract environment over payload `P`, stored in pool `S`.
#[derive(Debug, Clone, Default)]
pub struct State<P: DomainPayload, S: StatePool<AbstractDomain<P>>> {
    pool: S,
    _payload: std::marker::PhantomData<P>,
}

/// State backed by the unbounded pool.
pub type DefaultState<P> = State<P, DefaultStatePool<AbstractDomain<P>>>;

/// State backed by the bounded, evicting pool.
pub type ActiveState<P> = State<P, ActiveStatePool<AbstractDomain<P>>>;

impl<P: DomainPayload, S: StatePool<AbstractDomain<P>>> State<P, S> {
    /// Creates an empty state (every value reads as Top).
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool: S::default(),
            _payload: std::marker::PhantomData,
        }
    }

    /// Returns the payload tracked for `id`, or `None` when the value is
    /// Top, Bottom or untracked.
    #[must_use]
    pub fn check_abstract_value(&self, id: ValueId) -> Option<&P> {
        match self.pool.get(id) {
            Some(AbstractDomain::Val(p)) => Some(p),
            _ => None,
        }
    }

    /// Returns the abstract value for `id`; untracked ids are Top.
    #[must_use]
    pub fn get(&self, id: ValueId) -> AbstractDomain<P> {
        self.pool.get(id).cloned().unwrap_or(AbstractDomain::Top)
    }

    /// Strong update. Top is stored by untracking the id, which keeps
    /// bounded pools from filling up with no-information entries.
    pub fn update(&mut self, id: ValueId, value: AbstractDomain<P>) {
        if value.is_top() {
            self.pool.remove(id);
        } else {
            self.pool.insert(id, value);
        }
    }

    /// Forces `id` to Top.
    pub fn set_to_top(&mut self, id: ValueId) {
        self.pool.remove(id);
    }

    /// Forces `id` to Bottom.
    pub fn set_to_bottom(&mut self, id: ValueId) {
        self.pool.insert(id, AbstractDomain::Bottom);
    }

    /// Forces `id` to Top and, when the value has interned field slots in
    /// `graph`, tops those out as well. Used when a reference escapes to
    /// code the analysis cannot see.
    pub fn set_to_top_or_top_ref(&mut self, id: ValueId, graph: &ObjectGraph) {
        let slots: Vec<ValueId> = graph.slots_of(id).collect();
        for slot in slots {
            self.pool.remove(slot);
        }
        self.pool.remove(id);
    }

    /// Joins `other` into `self`, returning `true` when anything changed.
    ///
    /// Ids tracked only by `other` are inserted and deliberately counted as
    /// changes, so a block whose predecessor contributes a fresh fact is
    /// always revisited.
    pub fn join(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (id, incoming) in other.pool.iter() {
            match self.pool.get(id) {
                Some(existing) => {
                    let (joined, this_changed) = existing.join(incoming);
                    if this_changed {
                        changed = true;
                        self.update(id, joined);
                    }
                }
                None => {
                    changed = true;
                    self.update(id, incoming.clone());
                }
            }
        }
        changed
    }

    /// Widening join: any id on which the two states disagree goes straight
    /// to Top instead of the payload join. Ids tracked only by `other` stay
    /// untracked (already Top), so repeated widening strictly shrinks the
    /// state and a loop cannot climb a tall lattice one step at a time.
    pub fn widen_join(&mut self, other: &Self) -> bool {
        let mut changed = false;
        let mut to_top = Vec::new();
        for (id, incoming) in other.pool.iter() {
            if let Some(existing) = self.pool.get(id) {
                let (_, this_changed) = existing.join(incoming);
                if this_changed {
                    to_top.push(id);
                    changed = true;
                }
            }
        }
        for id in to_top {
            self.pool.remove(id);
        }
        changed
    }

    /// Number of tracked ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Returns `true` when no id is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Iterates over tracked entries.
    pub fn iter(&self) -> impl Iterator<Item = (ValueId, &AbstractDomain<P>)> {
        self.pool.iter()
    }

    /// Drops all tracked entries.
    pub fn clear(&mut self) {
        self.pool.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::ConstValue;
    use crate::analysis::object::FieldKey;

    fn cv(v: i64) -> AbstractDomain<ConstValue> {
        AbstractDomain::Val(ConstValue::Int(v))
    }

    #[test]
    fn untracked_reads_as_top() {
        let s: DefaultState<ConstValue> = State::new();
        assert_eq!(s.get(ValueId(1)), AbstractDomain::Top);
        assert!(s.check_abstract_value(ValueId(1)).is_none());
    }

    #[test]
    fn update_and_read_back() {
        let mut s: DefaultState<ConstValue> = State::new();
        s.update(ValueId(1), cv(42));
        assert_eq!(s.check_abstract_value(ValueId(1)), Some(&ConstValue::Int(42)));

        // Storing Top untracks.
        s.update(ValueId(1), AbstractDomain::Top);
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn bottom_is_tracked() {
        let mut s: DefaultState<ConstValue> = State::new();
        s.set_to_bottom(ValueId(1));
        assert_eq!(s.get(ValueId(1)), AbstractDomain::Bottom);
        assert!(s.check_abstract_value(ValueId(1)).is_none());
    }

    #[test]
    fn join_agreement_is_stable() {
        let mut a: DefaultState<ConstValue> = State::new();
        a.update(ValueId(1), cv(7));
        let mut b: DefaultState<ConstValue> = State::new();
        b.update(ValueId(1), cv(7));
        assert!(!a.join(&b));
        assert_eq!(a.check_abstract_value(ValueId(1)), Some(&ConstValue::Int(7)));
    }

    #[test]
    fn join_conflict_widens_to_top() {
        let mut a: DefaultState<ConstValue> = State::new();
        a.update(ValueId(1), cv(7));
        let mut b: DefaultState<ConstValue> = State::new();
        b.update(ValueId(1), cv(8));
        assert!(a.join(&b));
        assert_eq!(a.get(ValueId(1)), AbstractDomain::Top);
    }

    #[test]
    fn join_fresh_key_counts_as_change() {
        let mut a: DefaultState<ConstValue> = State::new();
        let mut b: DefaultState<ConstValue> = State::new();
        b.update(ValueId(5), cv(1));
        assert!(a.join(&b));
        assert_eq!(a.check_abstract_value(ValueId(5)), Some(&ConstValue::Int(1)));
        // Joining again with the same fact is a no-op.
        assert!(!a.join(&b));
    }

    #[test]
    fn top_ref_clears_field_slots() {
        let mut g = ObjectGraph::new();
        let arr = ValueId(1);
        let len = g.slot(arr, FieldKey::Length);

        let mut s: DefaultState<ConstValue> = State::new();
        s.update(len, cv(5));
        s.update(arr, cv(0));
        s.set_to_top_or_top_ref(arr, &g);
        assert!(s.is_empty());
    }
}
