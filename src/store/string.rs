//! Immutable UTF-8 string values
//!
//! Strings cache their hash at construction. The header records the
//! character count in `length` and the prime size class of the byte
//! allocation in `xtra`.

use std::sync::Arc;

use crate::common::fatal::Fatal;
use crate::common::prime;
use crate::fatal;

use super::zone::{ValueKind, ZoneHeader, ZoneKind, MAX_ZONE_LEN};

/// Deterministic 32-bit string hash, never zero.
pub fn hash_str(s: &str) -> u32 {
    let mut h: u32 = 0;
    for b in s.bytes() {
        h = h.wrapping_mul(31).wrapping_add(b as u32) ^ (h >> 17);
    }
    if h != 0 {
        h
    } else {
        (s.len() as u32 & 0xf_ffff) + 11
    }
}

/// An immutable boxed string.
#[derive(Debug)]
pub struct StringValue {
    header: ZoneHeader,
    hash: u32,
    text: Box<str>,
}

impl StringValue {
    pub fn new(s: &str) -> Result<Arc<Self>, Fatal> {
        if s.len() as u64 >= MAX_ZONE_LEN as u64 {
            return Err(fatal!("string of {} bytes exceeds zone ceiling", s.len()));
        }
        let class = prime::prime_above(s.len() as u64 + 1)?;
        let xtra = prime::index_of_prime(class).unwrap_or(0) as u16;
        let chars = s.chars().count() as u64;
        Ok(Arc::new(StringValue {
            header: ZoneHeader::new(ZoneKind::Value(ValueKind::String), xtra, chars)?,
            hash: hash_str(s),
            text: s.into(),
        }))
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Character count (not byte count).
    pub fn char_len(&self) -> usize {
        self.header.length() as usize
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn header(&self) -> &ZoneHeader {
        &self.header
    }
}

impl PartialEq for StringValue {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for StringValue {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_repeatable_and_non_zero() {
        for s in ["", "a", "hello", "ズ zoned ✓"] {
            assert_ne!(hash_str(s), 0);
            assert_eq!(hash_str(s), hash_str(s));
        }
        assert_ne!(hash_str("hello"), hash_str("hellp"));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let s = StringValue::new("héllo").unwrap();
        assert_eq!(s.char_len(), 5);
        assert_eq!(s.as_str(), "héllo");
    }

    #[test]
    fn size_class_covers_the_bytes() {
        let s = StringValue::new("0123456789").unwrap();
        let class = prime::prime_of_index(s.header().xtra() as usize).unwrap();
        assert!(class >= 11);
    }
}
