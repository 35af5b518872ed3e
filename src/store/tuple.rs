//! Tuple-of-objects values
//!
//! A tuple freezes an ordered sequence of object references into an
//! immutable zone. Null entries are tolerated as holes and still
//! count towards arity. The hash folds each present element's hash
//! into two accumulators using distinct odd multipliers chosen by
//! even/odd position, then XOR-combines them; a zero result is
//! replaced by a prime-derived fallback so no tuple ever hashes to
//! zero.

use std::sync::Arc;

use crate::common::fatal::Fatal;
use crate::common::prime;

use super::object::ObjectRef;
use super::zone::{ValueKind, ZoneHeader, ZoneKind};

/// Fold an ordered sequence of component hashes (holes as `None`)
/// into a non-zero 32-bit aggregate hash. Pure in the component
/// hashes and the arity.
pub(crate) fn fold_component_hashes(
    arity: usize,
    components: impl Iterator<Item = Option<u32>>,
) -> Result<u32, Fatal> {
    let mut h1: u32 = 0;
    let mut h2: u32 = prime::prime_above(3 * arity as u64 + 5)? as u32;
    for (ix, component) in components.enumerate() {
        let ch = match component {
            Some(h) => h,
            None => continue,
        };
        if ix % 2 == 0 {
            let oldh1 = h1;
            h1 = (h1.wrapping_mul(32059) ^ ch.wrapping_mul(32083)).wrapping_add(ix as u32);
            h2 = ((oldh1 << 11) ^ ch).wrapping_add((h2 >> 17).wrapping_mul(321_073));
        } else {
            let oldh2 = h2;
            h1 = h1.wrapping_mul(32009)
                ^ ch.wrapping_mul(52069).wrapping_add(oldh2).wrapping_sub(ix as u32);
            h2 = (oldh2 % 152_063) ^ (ch << 5).wrapping_add(h2.wrapping_mul(541));
        }
    }
    let h = h1 ^ h2;
    if h != 0 {
        Ok(h)
    } else {
        let fallback = ((h1 & 0xf_ffff) as u64) + ((h2 & 0xff_ffff) as u64);
        Ok(prime::prime_above(fallback)? as u32)
    }
}

/// An immutable tuple of object references.
#[derive(Debug)]
pub struct Tuple {
    header: ZoneHeader,
    hash: u32,
    components: Box<[Option<ObjectRef>]>,
}

impl Tuple {
    pub fn new(components: &[Option<ObjectRef>]) -> Result<Arc<Self>, Fatal> {
        let header = ZoneHeader::new(
            ZoneKind::Value(ValueKind::Tuple),
            0,
            components.len() as u64,
        )?;
        let hash = fold_component_hashes(
            components.len(),
            components.iter().map(|c| c.as_ref().map(|ob| ob.hash32())),
        )?;
        Ok(Arc::new(Tuple {
            header,
            hash,
            components: components.to_vec().into_boxed_slice(),
        }))
    }

    /// Convenience constructor without holes.
    pub fn of(objects: &[ObjectRef]) -> Result<Arc<Self>, Fatal> {
        let components: Vec<Option<ObjectRef>> = objects.iter().cloned().map(Some).collect();
        Tuple::new(&components)
    }

    pub fn arity(&self) -> usize {
        self.header.length() as usize
    }

    /// Component at `rank`; negative ranks index from the end.
    pub fn nth(&self, rank: i64) -> Option<ObjectRef> {
        let len = self.arity() as i64;
        let rank = if rank < 0 { rank + len } else { rank };
        if (0..len).contains(&rank) {
            self.components[rank as usize].clone()
        } else {
            None
        }
    }

    pub fn components(&self) -> &[Option<ObjectRef>] {
        &self.components
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn header(&self) -> &ZoneHeader {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::object::Object;
    use crate::store::oid::Oid;

    fn fresh() -> ObjectRef {
        Object::new(Oid::random()).unwrap()
    }

    #[test]
    fn hash_is_pure_in_element_hashes_and_arity() {
        let hashes: Vec<Option<u32>> = (0..5).map(|i| Some(0x1000 + i as u32)).collect();
        let a = fold_component_hashes(5, hashes.iter().copied()).unwrap();
        let b = fold_component_hashes(5, hashes.iter().copied()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, 0);
        // same hashes, different arity
        let c = fold_component_hashes(6, hashes.iter().copied()).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn zero_never_escapes_as_a_fold_result() {
        // empty folds and all-hole folds still produce non-zero
        assert_ne!(fold_component_hashes(0, std::iter::empty()).unwrap(), 0);
        assert_ne!(
            fold_component_hashes(4, [None, None, None, None].into_iter()).unwrap(),
            0
        );
    }

    #[test]
    fn order_matters_for_tuples() {
        let a = fresh();
        let b = fresh();
        let t1 = Tuple::of(&[a.clone(), b.clone()]).unwrap();
        let t2 = Tuple::of(&[b, a]).unwrap();
        assert_ne!(t1.hash(), t2.hash());
    }

    #[test]
    fn holes_count_towards_arity() {
        let a = fresh();
        let t = Tuple::new(&[Some(a.clone()), None, Some(a)]).unwrap();
        assert_eq!(t.arity(), 3);
        assert!(t.nth(1).is_none());
    }

    #[test]
    fn nth_supports_negative_ranks() {
        let a = fresh();
        let b = fresh();
        let t = Tuple::of(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(t.nth(-1).unwrap().oid(), b.oid());
        assert_eq!(t.nth(0).unwrap().oid(), a.oid());
        assert!(t.nth(2).is_none());
        assert!(t.nth(-3).is_none());
    }

    #[test]
    fn equal_oid_sequences_hash_equal() {
        let objs: Vec<ObjectRef> = (0..4).map(|_| fresh()).collect();
        let t1 = Tuple::of(&objs).unwrap();
        let t2 = Tuple::of(&objs).unwrap();
        assert_eq!(t1.hash(), t2.hash());
    }
}
