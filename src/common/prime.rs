//! Shared prime size-class table
//!
//! Attribute tables, closure capture arrays and object-table buckets
//! all draw their capacities from one ascending table of primes, each
//! roughly 1.5 times the previous. Capacities are stored compactly as
//! an index into this table (the zone header `xtra` field) so growth
//! and shrink just step along it.

use crate::common::fatal::Fatal;
use crate::fatal;

/// Ascending size classes, all prime. The last entry exceeds twice the
/// zone length ceiling so every legal allocation has a class.
pub static PRIMES: [u64; 47] = [
    2, 3, 7, 11, 17, 29, 47, 71, 107, 163, 251, 379, 569, 857, 1289, 1949, 2927, 4391, 6599, 9901,
    14867, 22303, 33457, 50207, 75323, 112997, 169501, 254257, 381389, 572087, 858149, 1287233,
    1930879, 2896319, 4344479, 6516739, 9775111, 14662727, 21994111, 32991187, 49486793, 74230231,
    111345347, 167018021, 250527047, 375790601, 563685907,
];

/// The prime for a capacity-class index, if the index is in range.
pub fn prime_of_index(ix: usize) -> Option<u64> {
    PRIMES.get(ix).copied()
}

/// The capacity-class index of a prime that appears in the table.
pub fn index_of_prime(n: u64) -> Option<usize> {
    PRIMES.binary_search(&n).ok()
}

/// Smallest table prime at or above `n`.
///
/// A request beyond the last size class means a structure has outgrown
/// the substrate's hard ceiling, which is unrecoverable.
pub fn prime_above(n: u64) -> Result<u64, Fatal> {
    match PRIMES.iter().find(|&&p| p >= n) {
        Some(&p) => Ok(p),
        None => Err(fatal!("no size class at or above {}", n)),
    }
}

/// Largest table prime at or below `n`, if any.
pub fn prime_below(n: u64) -> Option<u64> {
    PRIMES.iter().rev().find(|&&p| p <= n).copied()
}
