//! Mutable member-set payload
//!
//! An object-owned set of object references kept in ascending OID
//! order. The payload has no lock of its own; callers reach it while
//! holding the owning object's mutex. The header length counter
//! mirrors the membership count after every mutation.

use super::index::OrdIndex;
use super::object::ObjectRef;
use super::oid::Oid;
use super::value::Value;
use super::zone::{PayloadKind, ZoneHeader, ZoneKind};

#[derive(Debug)]
pub struct MutableSet {
    header: ZoneHeader,
    members: OrdIndex<Oid, ObjectRef>,
}

impl Default for MutableSet {
    fn default() -> Self {
        MutableSet::new()
    }
}

impl MutableSet {
    pub fn new() -> Self {
        let header = ZoneHeader::new(ZoneKind::Payload(PayloadKind::MutableSet), 0, 0)
            .expect("empty mutable set header");
        MutableSet {
            header,
            members: OrdIndex::new(),
        }
    }

    /// Add `ob`; true when membership actually changed. An invalid
    /// object is ignored.
    pub fn add(&mut self, ob: &ObjectRef) -> bool {
        if !ob.is_valid() {
            return false;
        }
        let changed = self.members.insert(ob.oid(), ob.clone());
        if changed {
            self.sync_length();
        }
        changed
    }

    /// Remove `ob`; true when it was a member.
    pub fn remove(&mut self, ob: &ObjectRef) -> bool {
        let changed = self.members.erase(&ob.oid()).is_some();
        if changed {
            self.sync_length();
        }
        changed
    }

    pub fn contains(&self, oid: Oid) -> bool {
        self.members.find(&oid).is_some()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members snapshotted in ascending OID order.
    pub fn elements(&self) -> Vec<ObjectRef> {
        self.members.iter().map(|(_, ob)| ob.clone()).collect()
    }

    /// Expand `value` into individual insertions: an object adds
    /// itself, a tuple adds its non-hole components, a set adds its
    /// elements. Other values add nothing. Returns how many members
    /// were actually new.
    pub fn add_value(&mut self, value: &Value) -> usize {
        let mut added = 0;
        match value {
            Value::Object(ob) => {
                if self.add(ob) {
                    added += 1;
                }
            }
            Value::Tuple(tup) => {
                for ob in tup.components().iter().flatten() {
                    if self.add(ob) {
                        added += 1;
                    }
                }
            }
            Value::Set(set) => {
                for ob in set.elements() {
                    if self.add(ob) {
                        added += 1;
                    }
                }
            }
            _ => {}
        }
        added
    }

    /// Counterpart of [`MutableSet::add_value`] for removal.
    pub fn remove_value(&mut self, value: &Value) -> usize {
        let mut removed = 0;
        match value {
            Value::Object(ob) => {
                if self.remove(ob) {
                    removed += 1;
                }
            }
            Value::Tuple(tup) => {
                for ob in tup.components().iter().flatten() {
                    if self.remove(ob) {
                        removed += 1;
                    }
                }
            }
            Value::Set(set) => {
                for ob in set.elements() {
                    if self.remove(ob) {
                        removed += 1;
                    }
                }
            }
            _ => {}
        }
        removed
    }

    pub fn header(&self) -> &ZoneHeader {
        &self.header
    }

    fn sync_length(&mut self) {
        let len = self.members.len() as u32;
        self.header.set_length(len);
    }
}
