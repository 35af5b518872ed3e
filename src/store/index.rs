//! Ordered-index template
//!
//! One balanced ordered container behind an {insert, find, erase}
//! capability surface, instantiated twice: the process-wide symbol
//! registry (keyed by interned name, byte-wise) and the per-object
//! mutable member set (keyed by OID order). Backed by a B-tree; node
//! ownership follows the owning structure, and the index performs no
//! locking of its own.

use std::borrow::Borrow;
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct OrdIndex<K: Ord, V> {
    map: BTreeMap<K, V>,
}

impl<K: Ord, V> Default for OrdIndex<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> OrdIndex<K, V> {
    pub fn new() -> Self {
        OrdIndex {
            map: BTreeMap::new(),
        }
    }

    /// Insert a binding, reporting whether membership actually
    /// changed. An existing key keeps its value.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        use std::collections::btree_map::Entry;
        match self.map.entry(key) {
            Entry::Vacant(e) => {
                e.insert(value);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn find<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.get(key)
    }

    /// Remove a binding, returning the erased value if it was present.
    pub fn erase<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.remove(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// In ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.map.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_membership_change() {
        let mut ix = OrdIndex::new();
        assert!(ix.insert("b", 2));
        assert!(ix.insert("a", 1));
        assert!(!ix.insert("a", 99));
        assert_eq!(ix.find("a"), Some(&1));
        assert_eq!(ix.len(), 2);
    }

    #[test]
    fn erase_reports_absence() {
        let mut ix = OrdIndex::new();
        ix.insert(3u32, ());
        assert!(ix.erase(&3).is_some());
        assert!(ix.erase(&3).is_none());
        assert!(ix.is_empty());
    }

    #[test]
    fn iteration_is_key_ascending() {
        let mut ix = OrdIndex::new();
        for k in [5, 1, 4, 2, 3] {
            ix.insert(k, ());
        }
        let keys: Vec<i32> = ix.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 2, 3, 4, 5]);
    }
}
