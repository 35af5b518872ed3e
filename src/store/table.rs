//! Concurrent object table
//!
//! All objects live in a table of 620 buckets, one mutex per bucket.
//! An OID maps to its bucket by `(hi ^ lo) % 620`; inside a bucket an
//! open-addressed slot array with prime capacity is probed linearly
//! from `(hi ^ lo) % capacity`, and the first empty slot terminates a
//! search. A bucket grows before an insertion would leave it nearly
//! full, so probing always terminates.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::common::fatal::Fatal;
use crate::common::prime;
use crate::fatal;

use super::object::{Object, ObjectRef};
use super::oid::{Oid, BUCKET_COUNT};

/// Slot count every bucket starts with.
const INITIAL_BUCKET_CAPACITY: usize = 7;

#[derive(Debug)]
struct Bucket {
    slots: Vec<Option<ObjectRef>>,
    card: usize,
}

impl Bucket {
    fn with_capacity(cap: usize) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(cap, || None);
        Bucket { slots, card: 0 }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Fewer than two empty slots, or less than one third empty.
    fn nearly_full(&self) -> bool {
        let cap = self.capacity();
        if cap == 0 {
            return true;
        }
        if self.card + 2 > cap {
            return true;
        }
        3 * (cap - self.card) < cap
    }

    /// Linear probe from the OID's start slot. `Ok` holds the occupied
    /// slot of the OID, `Err` the first empty slot.
    fn probe(&self, oid: Oid) -> Result<usize, usize> {
        let cap = self.capacity();
        let start = ((oid.hi() ^ oid.lo()) % cap as u64) as usize;
        for step in 0..cap {
            let ix = (start + step) % cap;
            match &self.slots[ix] {
                Some(ob) if ob.oid() == oid => return Ok(ix),
                Some(_) => continue,
                None => return Err(ix),
            }
        }
        // unreachable while growth keeps empty slots available
        Err(start)
    }

    fn find(&self, oid: Oid) -> Option<ObjectRef> {
        self.probe(oid).ok().map(|ix| {
            self.slots[ix]
                .clone()
                .expect("probe returned an occupied slot")
        })
    }

    /// Rebuild the slot array at `cap`, reinserting every member.
    fn grow(&mut self, cap: usize) {
        let mut bigger = Bucket::with_capacity(cap);
        for ob in self.slots.drain(..).flatten() {
            if let Err(empty) = bigger.probe(ob.oid()) {
                bigger.slots[empty] = Some(ob);
                bigger.card += 1;
            }
        }
        *self = bigger;
    }

    /// Insert `ob`, growing first when the bucket is nearly full.
    /// False when its OID is already present.
    fn add(&mut self, ob: ObjectRef) -> Result<bool, Fatal> {
        if self.find(ob.oid()).is_some() {
            return Ok(false);
        }
        if self.nearly_full() {
            let cap = prime::prime_above((3 * self.card / 2 + self.capacity() / 8 + 5) as u64)?;
            tracing::debug!(
                from = self.capacity(),
                to = cap,
                card = self.card,
                "growing object bucket"
            );
            self.grow(cap as usize);
        }
        match self.probe(ob.oid()) {
            Err(empty) => {
                self.slots[empty] = Some(ob);
                self.card += 1;
                Ok(true)
            }
            Ok(_) => Ok(false),
        }
    }

    /// Presize to at least `cap` slots ahead of a bulk insertion.
    fn reserve(&mut self, cap: usize) {
        if cap > self.capacity() {
            self.grow(cap);
        }
    }

    fn check(&self, bucket_ix: usize) -> Result<(), Fatal> {
        if prime::index_of_prime(self.capacity() as u64).is_none() {
            return Err(fatal!(
                "bucket {} capacity {} is not a table prime",
                bucket_ix,
                self.capacity()
            ));
        }
        let mut seen = 0;
        for ob in self.slots.iter().flatten() {
            if !ob.is_valid() {
                return Err(fatal!("bucket {} holds object with invalid oid", bucket_ix));
            }
            if ob.oid().bucket_number() != bucket_ix {
                return Err(fatal!(
                    "object {} misfiled in bucket {}",
                    ob.oid(),
                    bucket_ix
                ));
            }
            if self.find(ob.oid()).is_none() {
                return Err(fatal!("object {} unreachable by probing", ob.oid()));
            }
            seen += 1;
        }
        if seen != self.card {
            return Err(fatal!(
                "bucket {} cardinality {} disagrees with {} occupied slots",
                bucket_ix,
                self.card,
                seen
            ));
        }
        Ok(())
    }
}

/// The table of every live object, sharded over 620 locked buckets.
#[derive(Debug)]
pub struct ObjectTable {
    buckets: Vec<Mutex<Bucket>>,
}

impl Default for ObjectTable {
    fn default() -> Self {
        ObjectTable::new()
    }
}

impl ObjectTable {
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(BUCKET_COUNT);
        buckets.resize_with(BUCKET_COUNT, || {
            Mutex::new(Bucket::with_capacity(INITIAL_BUCKET_CAPACITY))
        });
        ObjectTable { buckets }
    }

    fn bucket(&self, oid: Oid) -> MutexGuard<'_, Bucket> {
        self.buckets[oid.bucket_number()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Object registered under `oid`, if any. A null or invalid OID
    /// finds nothing.
    pub fn find(&self, oid: Oid) -> Option<ObjectRef> {
        if !oid.is_valid() {
            return None;
        }
        self.bucket(oid).find(oid)
    }

    /// Register a fresh object under `oid`. An already-registered OID
    /// is unrecoverable.
    pub fn create(&self, oid: Oid) -> Result<ObjectRef, Fatal> {
        let ob = Object::new(oid)?;
        let mut bucket = self.bucket(oid);
        if !bucket.add(ob.clone())? {
            return Err(fatal!("object {} already registered", oid));
        }
        Ok(ob)
    }

    /// Fetch the existing object under `oid`; its absence is
    /// unrecoverable.
    pub fn fill(&self, oid: Oid) -> Result<ObjectRef, Fatal> {
        self.find(oid)
            .ok_or_else(|| fatal!("object {} not registered", oid))
    }

    /// Register a fresh object under a random unused OID.
    pub fn allocate(&self) -> Result<ObjectRef, Fatal> {
        loop {
            let oid = Oid::random();
            let mut bucket = self.bucket(oid);
            if bucket.find(oid).is_some() {
                continue;
            }
            let ob = Object::new(oid)?;
            bucket.add(ob.clone())?;
            return Ok(ob);
        }
    }

    /// Presize every bucket for `total` forthcoming insertions.
    pub fn reserve_for_load(&self, total: usize) -> Result<(), Fatal> {
        let per_bucket =
            prime::prime_above(5 + ((2 * total + total / 4) / BUCKET_COUNT) as u64)? as usize;
        tracing::debug!(total, per_bucket, "presizing object table");
        for bucket in &self.buckets {
            bucket
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .reserve(per_bucket);
        }
        Ok(())
    }

    /// Whole-table invariant check: prime capacities, correct bucket
    /// filing, reachable members, consistent cardinalities.
    pub fn check_buckets(&self) -> Result<(), Fatal> {
        for (ix, bucket) in self.buckets.iter().enumerate() {
            bucket
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .check(ix)?;
        }
        Ok(())
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.buckets
            .iter()
            .map(|b| b.lock().unwrap_or_else(PoisonError::into_inner).card)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

lazy_static! {
    static ref OBJECTS: ObjectTable = ObjectTable::new();
}

/// The process-wide object table.
pub fn objects() -> &'static ObjectTable {
    &OBJECTS
}
