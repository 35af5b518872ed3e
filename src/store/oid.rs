//! Object identifiers
//!
//! An OID is a 128-bit two-word identifier that permanently names a
//! persistent object. Both words are constrained to documented ranges
//! chosen so that the text form is exactly eleven base-62 digits for
//! the high word and eight for the low word, behind a leading
//! underscore. OIDs order lexicographically (high word first), hash
//! to a non-zero 32 bits, and derive the bucket number used by the
//! concurrent object table.
//!
//! Malformed text parses to the null OID rather than an error; callers
//! check validity explicitly.

use std::fmt;

use rand::Rng;

/// Digits of the base-62 text form, in value order.
pub const B62_DIGITS: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Inclusive lower bound of the high word of a valid OID (62^3).
pub const OID_HI_MIN: u64 = 238_328;
/// Exclusive upper bound of the high word (620 * 62^9).
pub const OID_HI_MAX: u64 = 8_392_993_658_683_402_240;
/// Inclusive lower bound of the low word (62^3).
pub const OID_LO_MIN: u64 = 238_328;
/// Exclusive upper bound of the low word (62^7).
pub const OID_LO_MAX: u64 = 3_521_614_606_208;

/// Digits in the text form of the high word.
pub const OID_HI_DIGITS: usize = 11;
/// Digits in the text form of the low word.
pub const OID_LO_DIGITS: usize = 8;
/// Total width of the text form, separator included.
pub const OID_CHARS: usize = 1 + OID_HI_DIGITS + OID_LO_DIGITS;

/// Number of buckets in the concurrent object table (10 * 62).
pub const BUCKET_COUNT: usize = 620;

// Two fixed primes below 2^31 used to fold each word into 32 bits.
const HASH_PRIME_HI: u64 = 2_147_483_629;
const HASH_PRIME_LO: u64 = 2_147_483_587;

/// A two-word object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Oid {
    hi: u64,
    lo: u64,
}

impl Oid {
    /// The null sentinel.
    pub const NULL: Oid = Oid { hi: 0, lo: 0 };

    /// Smallest valid OID. `OID_HI_MIN` itself is a multiple of 62 and
    /// so falls in the reserved bootstrap sub-range.
    pub const MIN: Oid = Oid {
        hi: OID_HI_MIN + 1,
        lo: OID_LO_MIN,
    };

    /// Largest valid OID.
    pub const MAX: Oid = Oid {
        hi: OID_HI_MAX - 1,
        lo: OID_LO_MAX - 1,
    };

    /// Assemble an OID from its two words, unchecked.
    pub fn new(hi: u64, lo: u64) -> Self {
        Oid { hi, lo }
    }

    pub fn hi(&self) -> u64 {
        self.hi
    }

    pub fn lo(&self) -> u64 {
        self.lo
    }

    pub fn is_null(&self) -> bool {
        self.hi == 0 && self.lo == 0
    }

    /// Both words in range and outside the reserved bootstrap
    /// sub-range (high words that are multiples of 62 are kept for
    /// hand-assigned bootstrap identifiers).
    pub fn is_valid(&self) -> bool {
        (OID_HI_MIN..OID_HI_MAX).contains(&self.hi)
            && (OID_LO_MIN..OID_LO_MAX).contains(&self.lo)
            && self.hi % 62 != 0
    }

    /// Repeatable 32-bit hash mixing both words, non-zero for any
    /// valid OID by convention. The null OID hashes to zero.
    pub fn hash32(&self) -> u32 {
        if self.is_null() {
            return 0;
        }
        let h = ((self.hi % HASH_PRIME_HI) ^ (self.lo % HASH_PRIME_LO)) as u32;
        if h != 0 {
            h
        } else {
            ((self.hi & 0xff_ffff) + (self.lo & 0xff_ffff) + 3) as u32
        }
    }

    /// Bucket number in the concurrent object table.
    pub fn bucket_number(&self) -> usize {
        ((self.hi ^ self.lo) % BUCKET_COUNT as u64) as usize
    }

    /// Generate a random valid OID, skipping the reserved bootstrap
    /// sub-range.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let oid = Oid {
                hi: rng.gen_range(OID_HI_MIN..OID_HI_MAX),
                lo: rng.gen_range(OID_LO_MIN..OID_LO_MAX),
            };
            if oid.is_valid() {
                return oid;
            }
        }
    }

    /// Parse the fixed-width text form from the front of `input`,
    /// returning the OID and the unconsumed suffix. Malformed or
    /// out-of-range text yields the null OID and leaves the whole
    /// input unconsumed.
    pub fn parse(input: &str) -> (Oid, &str) {
        let bytes = input.as_bytes();
        if bytes.len() < OID_CHARS || bytes[0] != b'_' {
            return (Oid::NULL, input);
        }
        let hi = match decode_b62(&bytes[1..1 + OID_HI_DIGITS]) {
            Some(v) => v,
            None => return (Oid::NULL, input),
        };
        let lo = match decode_b62(&bytes[1 + OID_HI_DIGITS..OID_CHARS]) {
            Some(v) => v,
            None => return (Oid::NULL, input),
        };
        let oid = Oid { hi, lo };
        if oid.is_valid() {
            (oid, &input[OID_CHARS..])
        } else {
            (Oid::NULL, input)
        }
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [b'0'; OID_CHARS];
        buf[0] = b'_';
        encode_b62(self.hi, &mut buf[1..1 + OID_HI_DIGITS]);
        encode_b62(self.lo, &mut buf[1 + OID_HI_DIGITS..OID_CHARS]);
        // buf holds only ASCII digits and the separator
        f.write_str(std::str::from_utf8(&buf).expect("ascii"))
    }
}

/// Fixed-width base-62 encoding, zero padded.
fn encode_b62(mut v: u64, out: &mut [u8]) {
    for slot in out.iter_mut().rev() {
        *slot = B62_DIGITS[(v % 62) as usize];
        v /= 62;
    }
}

/// Decode fixed-width base-62 digits; `None` on a non-digit byte or
/// overflow.
fn decode_b62(digits: &[u8]) -> Option<u64> {
    let mut v: u64 = 0;
    for &b in digits {
        let d = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'z' => b - b'a' + 10,
            b'A'..=b'Z' => b - b'A' + 36,
            _ => return None,
        } as u64;
        v = v.checked_mul(62)?.checked_add(d)?;
    }
    Some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_not_valid() {
        assert!(Oid::NULL.is_null());
        assert!(!Oid::NULL.is_valid());
        assert_eq!(Oid::NULL.hash32(), 0);
    }

    #[test]
    fn documented_bounds_are_valid() {
        assert!(Oid::MIN.is_valid());
        assert!(Oid::MAX.is_valid());
        assert!(!Oid::new(OID_HI_MIN, OID_LO_MIN).is_valid()); // bootstrap sub-range
        assert!(!Oid::new(OID_HI_MAX, OID_LO_MIN).is_valid());
        assert!(!Oid::new(Oid::MIN.hi(), OID_LO_MAX).is_valid());
    }

    #[test]
    fn ordering_is_total_and_consistent_with_equality() {
        let a = Oid::new(OID_HI_MIN + 1, OID_LO_MIN);
        let b = Oid::new(OID_HI_MIN + 1, OID_LO_MIN + 1);
        let c = Oid::new(OID_HI_MIN + 3, OID_LO_MIN);
        assert!(a < b && b < c && a < c);
        assert_eq!(a, Oid::new(OID_HI_MIN + 1, OID_LO_MIN));
        for _ in 0..100 {
            let x = Oid::random();
            let y = Oid::random();
            if x != y {
                assert!(x < y || y < x);
            }
        }
    }

    #[test]
    fn hash_is_repeatable_and_non_zero() {
        for _ in 0..1000 {
            let o = Oid::random();
            assert_ne!(o.hash32(), 0);
            assert_eq!(o.hash32(), o.hash32());
        }
    }

    #[test]
    fn text_round_trip_including_bounds() {
        for o in [Oid::MIN, Oid::MAX] {
            let text = o.to_string();
            assert_eq!(text.len(), OID_CHARS);
            let (parsed, rest) = Oid::parse(&text);
            assert_eq!(parsed, o);
            assert!(rest.is_empty());
        }
        for _ in 0..1000 {
            let o = Oid::random();
            let text = o.to_string();
            let (parsed, rest) = Oid::parse(&text);
            assert_eq!(parsed, o);
            assert!(rest.is_empty());
        }
    }

    #[test]
    fn parse_returns_unconsumed_suffix() {
        let text = format!("{} and more", Oid::MIN);
        let (parsed, rest) = Oid::parse(&text);
        assert_eq!(parsed, Oid::MIN);
        assert_eq!(rest, " and more");
    }

    #[test]
    fn malformed_text_yields_null_without_consuming() {
        for bad in [
            "",
            "_",
            "nounderscore0000000",
            "_short",
            "_!!!!!!!!!!!0000000",
            "_0000000000000000000", // in-range digits but not a valid oid
        ] {
            let (parsed, rest) = Oid::parse(bad);
            assert!(parsed.is_null());
            assert_eq!(rest, bad);
        }
    }

    #[test]
    fn random_avoids_reserved_sub_range() {
        for _ in 0..1000 {
            let o = Oid::random();
            assert!(o.is_valid());
            assert_ne!(o.hi() % 62, 0);
        }
    }

    #[test]
    fn bucket_number_in_range() {
        for _ in 0..1000 {
            assert!(Oid::random().bucket_number() < BUCKET_COUNT);
        }
    }
}
