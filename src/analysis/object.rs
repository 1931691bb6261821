//! Aliasing model for reference values.
//!
//! Reference-typed values are mapped onto lazily created abstract objects;
//! each `(object, field)` pair is interned as a synthetic [`ValueId`] so the
//! analysis state can track field contents with the same machinery it uses
//! for ordinary values. Values are single-assignment, so the value-to-object
//! binding never needs flow-sensitive invalidation: two values bound to the
//! same object are aliases on every path where both are live.
//!
//! One graph exists per function analysis run and is confined to that run's
//! thread.

use std::collections::HashMap;

use crate::chir::ValueId;

/// Identity of an abstract heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(u32);

/// Addressable slot within an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// A declared field, by index.
    Field(usize),
    /// The pointee of a plain reference.
    Deref,
    /// The tracked element count of an array-like object.
    Length,
}

/// Per-run object graph: value bindings and interned field slots.
#[derive(Debug, Default)]
pub struct ObjectGraph {
    next_object: u32,
    next_synthetic: u32,
    bindings: HashMap<ValueId, ObjectId>,
    slots: HashMap<(ObjectId, FieldKey), ValueId>,
    slot_owners: HashMap<ValueId, (ObjectId, FieldKey)>,
}

impl ObjectGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the object bound to `value`, creating and binding a fresh one
    /// on first use.
    pub fn object_for(&mut self, value: ValueId) -> ObjectId {
        if let Some(obj) = self.bindings.get(&value) {
            return *obj;
        }
        let obj = ObjectId(self.next_object);
        self.next_object += 1;
        self.bindings.insert(value, obj);
        obj
    }

    /// Returns the object bound to `value` without creating one.
    #[must_use]
    pub fn lookup_object(&self, value: ValueId) -> Option<ObjectId> {
        self.bindings.get(&value).copied()
    }

    /// Makes `dst` an alias of `src`: both map to the same object.
    pub fn alias(&mut self, dst: ValueId, src: ValueId) {
        let obj = self.object_for(src);
        self.bindings.insert(dst, obj);
    }

    /// Interns the slot for `field` of the object bound to `value`.
    ///
    /// The returned id is synthetic and stable for the lifetime of the
    /// graph, so repeated accesses to the same field read the same state
    /// entry regardless of which alias they go through.
    pub fn slot(&mut self, value: ValueId, field: FieldKey) -> ValueId {
        let obj = self.object_for(value);
        if let Some(id) = self.slots.get(&(obj, field)) {
            return *id;
        }
        let id = ValueId(ValueId::SYNTHETIC_BASE + self.next_synthetic);
        self.next_synthetic += 1;
        self.slots.insert((obj, field), id);
        self.slot_owners.insert(id, (obj, field));
        id
    }

    /// Non-creating slot lookup.
    #[must_use]
    pub fn lookup_slot(&self, value: ValueId, field: FieldKey) -> Option<ValueId> {
        let obj = self.bindings.get(&value)?;
        self.slots.get(&(*obj, field)).copied()
    }

    /// All interned slots of the object bound to `value`.
    pub fn slots_of(&self, value: ValueId) -> impl Iterator<Item = ValueId> + '_ {
        let obj = self.bindings.get(&value).copied();
        self.slots
            .iter()
            .filter(move |((o, _), _)| Some(*o) == obj)
            .map(|(_, id)| *id)
    }

    /// Returns `true` if `id` is a synthetic slot created by this graph.
    #[must_use]
    pub fn is_slot(&self, id: ValueId) -> bool {
        self.slot_owners.contains_key(&id)
    }

    /// Clears all bindings and slots for the next run.
    pub fn reset(&mut self) {
        self.next_object = 0;
        self.next_synthetic = 0;
        self.bindings.clear();
        self.slots.clear();
        self.slot_owners.clear();
    }
}
