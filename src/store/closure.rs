//! Closure values
//!
//! A closure pairs a mandatory connective object with an optional
//! meta value and a fixed list of captured values. The capture array
//! is sized to the next table prime at or above the requested arity;
//! the prime class index lives in the header `xtra`.

use std::sync::Arc;

use crate::common::fatal::Fatal;
use crate::common::prime;
use crate::fatal;

use super::object::ObjectRef;
use super::tuple::fold_component_hashes;
use super::value::Value;
use super::zone::{ValueKind, ZoneHeader, ZoneKind};

/// Hard ceiling on closure arity; exceeding it is a programming
/// error, not a recoverable condition.
pub const CLOSURE_MAX_ARITY: usize = 1024;

#[derive(Debug)]
pub struct Closure {
    header: ZoneHeader,
    hash: u32,
    connective: ObjectRef,
    meta: Option<Value>,
    captured: Vec<Value>,
}

impl Closure {
    pub fn new(
        connective: ObjectRef,
        meta: Option<Value>,
        captured: &[Value],
    ) -> Result<Arc<Self>, Fatal> {
        if captured.len() >= CLOSURE_MAX_ARITY {
            return Err(fatal!(
                "closure arity {} exceeds ceiling {}",
                captured.len(),
                CLOSURE_MAX_ARITY
            ));
        }
        let class = prime::prime_above(captured.len() as u64)?;
        let xtra = prime::index_of_prime(class).unwrap_or(0) as u16;
        let header = ZoneHeader::new(
            ZoneKind::Value(ValueKind::Closure),
            xtra,
            captured.len() as u64,
        )?;
        let hash = fold_component_hashes(
            captured.len() + 1,
            std::iter::once(Some(connective.hash32()))
                .chain(captured.iter().map(|v| Some(v.hash()))),
        )?;
        let mut values = Vec::with_capacity(class as usize);
        values.extend_from_slice(captured);
        Ok(Arc::new(Closure {
            header,
            hash,
            connective,
            meta,
            captured: values,
        }))
    }

    pub fn connective(&self) -> &ObjectRef {
        &self.connective
    }

    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }

    pub fn arity(&self) -> usize {
        self.header.length() as usize
    }

    /// Allocated capture capacity: the prime class at or above arity.
    pub fn capacity(&self) -> usize {
        prime::prime_of_index(self.header.xtra() as usize).unwrap_or(0) as usize
    }

    pub fn captured(&self) -> &[Value] {
        &self.captured
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
    fn capacity_is_the_prime_at_or_above_arity() {
        let conn = fresh();
        let vals: Vec<Value> = (0..5).map(Value::int).collect();
        let clo = Closure::new(conn, None, &vals).unwrap();
        assert_eq!(clo.arity(), 5);
        assert_eq!(clo.capacity(), 7);
        assert_ne!(clo.hash(), 0);
    }

    #[test]
    fn meta_and_connective_are_kept() {
        let conn = fresh();
        let meta = Value::string("meta").unwrap();
        let clo = Closure::new(conn.clone(), Some(meta.clone()), &[]).unwrap();
        assert_eq!(clo.connective().oid(), conn.oid());
        assert_eq!(clo.meta(), Some(&meta));
        assert_eq!(clo.arity(), 0);
    }

    #[test]
    fn arity_ceiling_is_unrecoverable() {
        let conn = fresh();
        let vals: Vec<Value> = (0..CLOSURE_MAX_ARITY as i64).map(Value::int).collect();
        assert!(Closure::new(conn, None, &vals).is_err());
    }
}
