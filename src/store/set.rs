//! Set-of-objects values
//!
//! A set is built from an unordered candidate array by copying,
//! sorting by the object total order and dropping adjacent
//! duplicates, so logically equal sets converge to the same
//! representation and the same hash regardless of input order.

use std::sync::Arc;

use itertools::Itertools;

use crate::common::fatal::Fatal;

use super::object::{object_cmp, ObjectRef};
use super::oid::Oid;
use super::tuple::fold_component_hashes;
use super::zone::{ValueKind, ZoneHeader, ZoneKind};

/// An immutable set of objects, elements pairwise distinct and
/// OID-ascending.
#[derive(Debug)]
pub struct SetOb {
    header: ZoneHeader,
    hash: u32,
    elements: Box<[ObjectRef]>,
}

impl SetOb {
    pub fn new(candidates: &[ObjectRef]) -> Result<Arc<Self>, Fatal> {
        let elements: Vec<ObjectRef> = candidates
            .iter()
            .cloned()
            .sorted_by(object_cmp)
            .dedup_by(|a, b| a.oid() == b.oid())
            .collect();
        let header = ZoneHeader::new(ZoneKind::Value(ValueKind::Set), 0, elements.len() as u64)?;
        let hash = fold_component_hashes(
            elements.len(),
            elements.iter().map(|ob| Some(ob.hash32())),
        )?;
        Ok(Arc::new(SetOb {
            header,
            hash,
            elements: elements.into_boxed_slice(),
        }))
    }

    pub fn cardinality(&self) -> usize {
        self.header.length() as usize
    }

    /// Elements in ascending OID order.
    pub fn elements(&self) -> &[ObjectRef] {
        &self.elements
    }

    pub fn contains(&self, oid: Oid) -> bool {
        self.elements
            .binary_search_by(|ob| ob.oid().cmp(&oid))
            .is_ok()
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn header(&self) -> &ZoneHeader {
        &self.header
    }
}
