//! Zone headers
//!
//! Every boxed value and every payload starts with the same embedded
//! header: an explicit kind discriminant, a one-byte atomic mark
//! reserved for a future stop-the-world collector, a 16-bit extra
//! field (usually a capacity-class index into the shared prime table)
//! and a 32-bit length. Value kinds and payload kinds are disjoint
//! enumerations joined by [`ZoneKind`]; nothing dispatches on
//! reinterpreted memory.
//!
//! The collector does not exist yet; the mark byte is maintained but
//! never consulted, and owning structures free superseded zones
//! explicitly on resize (which in this rendition is ordinary `Drop`).

use std::sync::atomic::{AtomicU8, Ordering::SeqCst};

use crate::common::fatal::Fatal;
use crate::fatal;

/// Hard ceiling on the length of any single zone.
pub const MAX_ZONE_LEN: u32 = 1 << 28;

/// Kinds of first-class values that occupy a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Double,
    String,
    Json,
    /// UI-widget handle, never persisted.
    Widget,
    Tuple,
    Set,
    Closure,
    Object,
    /// Open file handle, never persisted.
    File,
}

/// Kinds of object-owned payload extensions. Payloads are zone-tagged
/// but are not first-class values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Loader,
    AttrTable,
    StringBuf,
    Symbol,
    MutableSet,
    Agenda,
}

/// The discriminant carried by every zone header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    Value(ValueKind),
    Payload(PayloadKind),
}

/// Header embedded in every boxed value and payload.
#[derive(Debug)]
pub struct ZoneHeader {
    kind: ZoneKind,
    /// GC mark byte, reserved for a future collector.
    mark: AtomicU8,
    /// Extra data, usually a capacity-class index.
    xtra: u16,
    /// Length of the variable-sized part.
    length: u32,
}

impl ZoneHeader {
    /// Stamp a header for a new zone. Exceeding the length ceiling is
    /// unrecoverable; there is no partial allocation path.
    pub fn new(kind: ZoneKind, xtra: u16, length: u64) -> Result<Self, Fatal> {
        if length > MAX_ZONE_LEN as u64 {
            return Err(fatal!(
                "zone length {} exceeds ceiling {} for {:?}",
                length,
                MAX_ZONE_LEN,
                kind
            ));
        }
        Ok(ZoneHeader {
            kind,
            mark: AtomicU8::new(0),
            xtra,
            length: length as u32,
        })
    }

    pub fn kind(&self) -> ZoneKind {
        self.kind
    }

    pub fn xtra(&self) -> u16 {
        self.xtra
    }

    pub fn set_xtra(&mut self, xtra: u16) {
        self.xtra = xtra;
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn set_length(&mut self, length: u32) {
        self.length = length;
    }

    pub fn mark(&self) {
        self.mark.store(1, SeqCst);
    }

    pub fn unmark(&self) {
        self.mark.store(0, SeqCst);
    }

    pub fn is_marked(&self) -> bool {
        self.mark.load(SeqCst) != 0
    }
}
