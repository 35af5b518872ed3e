//! ironbark: an in-memory substrate of immutable values, mutable
//! objects with persistent identity, and the machinery that loads a
//! serialized heap back into memory.
//!
//! The `store` module is the substrate itself: OIDs, zone-tagged
//! values and payloads, the sharded object table, the process-wide
//! symbol registry and the two-pass loader. `common` carries the
//! shared prime size-class table and the fatal error tier.

#![allow(non_local_definitions)]
extern crate itertools;
extern crate serde_json;
extern crate thiserror;
#[macro_use]
extern crate lazy_static;

pub mod common;
pub mod store;
