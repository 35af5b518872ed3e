//! Attribute tables
//!
//! An attribute table maps attribute objects to values as a flexible
//! array of entries sorted ascending by attribute OID. Capacity is
//! always a shared-table prime, stored compactly as a class index in
//! the header `xtra`. Lookup narrows by binary search until the
//! bracket is within four entries, then finishes with a linear scan.
//!
//! `put` and `remove` consume the table and return the authoritative
//! one: growth and shrink reallocate, and the superseded table must
//! not be used again.

use std::cmp::Ordering;

use crate::common::fatal::Fatal;
use crate::common::prime;
use crate::fatal;

use super::object::ObjectRef;
use super::oid::Oid;
use super::value::Value;
use super::zone::{PayloadKind, ZoneHeader, ZoneKind};

/// Hard ceiling on the number of entries in one table.
pub const MAX_ATTRS: usize = 1 << 28;

#[derive(Debug)]
struct Entry {
    attr: ObjectRef,
    val: Value,
}

/// Sorted-array map from attribute object to value.
#[derive(Debug)]
pub struct AttrTable {
    header: ZoneHeader,
    entries: Vec<Entry>,
}

impl Default for AttrTable {
    fn default() -> Self {
        AttrTable::new_in_class(0)
    }
}

impl AttrTable {
    /// Empty table in the smallest size class.
    pub fn empty() -> Self {
        AttrTable::default()
    }

    /// Empty table sized for `hint` entries.
    pub fn with_capacity(hint: usize) -> Result<Self, Fatal> {
        if hint > MAX_ATTRS {
            return Err(fatal!("attribute table of {} entries exceeds ceiling", hint));
        }
        let class = prime::prime_above(hint.max(2) as u64)?;
        let ix = prime::index_of_prime(class).unwrap_or(0);
        Ok(AttrTable::new_in_class(ix))
    }

    fn new_in_class(class_ix: usize) -> Self {
        // a zero-length header never exceeds the zone ceiling
        let header = ZoneHeader::new(ZoneKind::Payload(PayloadKind::AttrTable), class_ix as u16, 0)
            .expect("empty attribute table header");
        let capacity = prime::prime_of_index(class_ix).unwrap_or(2) as usize;
        AttrTable {
            header,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current capacity: the prime of the stored class index.
    pub fn capacity(&self) -> usize {
        prime::prime_of_index(self.header.xtra() as usize).unwrap_or(2) as usize
    }

    /// Value bound to `attr`, if any. An invalid key finds nothing.
    pub fn find(&self, attr: &ObjectRef) -> Option<&Value> {
        if !attr.is_valid() {
            return None;
        }
        match self.locate(attr.oid()) {
            Ok(pos) => Some(&self.entries[pos].val),
            Err(_) => None,
        }
    }

    /// Bind `attr` to `val`, returning the authoritative table.
    ///
    /// Overwrites in place when the key exists; inserts in place when
    /// capacity remains; otherwise reallocates in a larger prime
    /// class. An invalid key is a no-op, never an error.
    pub fn put(mut self, attr: &ObjectRef, val: Value) -> Result<AttrTable, Fatal> {
        if !attr.is_valid() {
            return Ok(self);
        }
        match self.locate(attr.oid()) {
            Ok(pos) => {
                self.entries[pos].val = val;
                Ok(self)
            }
            Err(pos) => {
                if self.len() >= self.capacity() {
                    let grown = self.len() + 2 + self.capacity() / 5;
                    let mut bigger = AttrTable::with_capacity(grown)?;
                    bigger.entries = self.entries;
                    self = bigger;
                }
                self.entries.insert(
                    pos,
                    Entry {
                        attr: attr.clone(),
                        val,
                    },
                );
                let len = self.entries.len() as u32;
                self.header.set_length(len);
                Ok(self)
            }
        }
    }

    /// Unbind `attr`, returning the authoritative table.
    ///
    /// Shrinks into a smaller prime class when the table has fallen
    /// well below half its capacity; otherwise compacts in place. An
    /// absent or invalid key is a no-op.
    pub fn remove(mut self, attr: &ObjectRef) -> AttrTable {
        if !attr.is_valid() {
            return self;
        }
        let pos = match self.locate(attr.oid()) {
            Ok(pos) => pos,
            Err(_) => return self,
        };
        let len = self.entries.len();
        let cap = self.capacity();
        if cap > 6 && len - 1 < cap / 2 {
            if let Ok(class) = prime::prime_above((len - 1).max(2) as u64) {
                let class_ix = prime::index_of_prime(class).unwrap_or(0);
                if class_ix < self.header.xtra() as usize {
                    let mut smaller = AttrTable::new_in_class(class_ix);
                    smaller
                        .entries
                        .extend(self.entries.drain(..).enumerate().filter_map(|(ix, e)| {
                            if ix == pos {
                                None
                            } else {
                                Some(e)
                            }
                        }));
                    let len = smaller.entries.len() as u32;
                    smaller.header.set_length(len);
                    return smaller;
                }
            }
        }
        self.entries.remove(pos);
        let len = self.entries.len() as u32;
        self.header.set_length(len);
        self
    }

    /// Entries in ascending attribute-OID order.
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectRef, &Value)> {
        self.entries.iter().map(|e| (&e.attr, &e.val))
    }

    pub fn header(&self) -> &ZoneHeader {
        &self.header
    }

    /// Bracketed binary search: narrow until within four entries of
    /// convergence, then scan linearly. `Ok` is the entry position,
    /// `Err` the insertion point.
    fn locate(&self, key: Oid) -> Result<usize, usize> {
        let len = self.entries.len() as i64;
        let mut lo: i64 = 0;
        let mut hi: i64 = len - 1;
        while lo + 4 < hi {
            let mid = (lo + hi) / 2;
            match self.entries[mid as usize].attr.oid().cmp(&key) {
                Ordering::Equal => return Ok(mid as usize),
                Ordering::Less => lo = mid,
                Ordering::Greater => hi = mid,
            }
        }
        let mut ix = lo;
        while ix <= hi {
            match self.entries[ix as usize].attr.oid().cmp(&key) {
                Ordering::Equal => return Ok(ix as usize),
                Ordering::Greater => return Err(ix as usize),
                Ordering::Less => ix += 1,
            }
        }
        Err((hi + 1) as usize)
    }
}
