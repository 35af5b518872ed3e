//! The object substrate
//!
//! Values are immutable and hash-consistent; objects are the one
//! mutable kind, identified forever by their OID and reachable
//! through the sharded [`table::ObjectTable`]. Payloads extend
//! objects with at most one extra datum each, and the
//! [`loader::Loader`] rebuilds all of it from JSON in two passes.

pub mod attr;
pub mod closure;
pub mod index;
pub mod loader;
pub mod mutset;
pub mod object;
pub mod oid;
pub mod set;
pub mod string;
pub mod symbol;
pub mod table;
pub mod tuple;
pub mod value;
pub mod zone;
