//! Objects
//!
//! An object is the only mutable kind of value: a stable OID plus a
//! mutex-guarded core holding the modification time, the class link,
//! the attribute table and at most one payload. Everything that reads
//! or writes the core goes through the lock; the OID and its derived
//! hash never change and are readable without it.

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::common::fatal::Fatal;
use crate::common::prime;
use crate::fatal;

use super::attr::AttrTable;
use super::mutset::MutableSet;
use super::oid::Oid;
use super::symbol::Symbol;
use super::value::Value;
use super::zone::{PayloadKind, ZoneHeader, ZoneKind};

/// Shared handle to an object.
pub type ObjectRef = Arc<Object>;

/// The at-most-one extra datum an object carries.
#[derive(Debug, Default)]
pub enum Payload {
    #[default]
    None,
    /// Marks the object driving a load in progress.
    Loader,
    AttrTable(AttrTable),
    StringBuf(StringBuf),
    Symbol(Arc<Symbol>),
    MutableSet(MutableSet),
    Agenda(Agenda),
}

impl Payload {
    pub fn kind(&self) -> Option<PayloadKind> {
        match self {
            Payload::None => None,
            Payload::Loader => Some(PayloadKind::Loader),
            Payload::AttrTable(_) => Some(PayloadKind::AttrTable),
            Payload::StringBuf(_) => Some(PayloadKind::StringBuf),
            Payload::Symbol(_) => Some(PayloadKind::Symbol),
            Payload::MutableSet(_) => Some(PayloadKind::MutableSet),
            Payload::Agenda(_) => Some(PayloadKind::Agenda),
        }
    }
}

/// Mutable state behind the object lock.
#[derive(Debug)]
pub struct ObjectCore {
    mtime: f64,
    class: Option<ObjectRef>,
    attrs: AttrTable,
    payload: Payload,
}

pub struct Object {
    oid: Oid,
    core: Mutex<ObjectCore>,
}

fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

impl Object {
    /// Fresh object under `oid`. The OID must be valid.
    pub fn new(oid: Oid) -> Result<ObjectRef, Fatal> {
        if !oid.is_valid() {
            return Err(fatal!("object with invalid oid {}", oid));
        }
        Ok(Arc::new(Object {
            oid,
            core: Mutex::new(ObjectCore {
                mtime: now_seconds(),
                class: None,
                attrs: AttrTable::empty(),
                payload: Payload::None,
            }),
        }))
    }

    #[cfg(test)]
    pub(crate) fn test_with_oid(oid: Oid) -> ObjectRef {
        Arc::new(Object {
            oid,
            core: Mutex::new(ObjectCore {
                mtime: 0.0,
                class: None,
                attrs: AttrTable::empty(),
                payload: Payload::None,
            }),
        })
    }

    pub fn oid(&self) -> Oid {
        self.oid
    }

    pub fn is_valid(&self) -> bool {
        self.oid.is_valid()
    }

    pub fn hash32(&self) -> u32 {
        self.oid.hash32()
    }

    fn lock(&self) -> MutexGuard<'_, ObjectCore> {
        // a poisoned core is still structurally sound
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last-modification time, seconds since the epoch.
    pub fn mtime(&self) -> f64 {
        self.lock().mtime
    }

    /// Refresh the modification time.
    pub fn touch(&self) {
        self.lock().mtime = now_seconds();
    }

    pub fn class(&self) -> Option<ObjectRef> {
        self.lock().class.clone()
    }

    pub fn set_class(&self, class: Option<ObjectRef>) {
        let mut core = self.lock();
        core.class = class;
        core.mtime = now_seconds();
    }

    /// Value bound to `attr`, cloned out from under the lock.
    pub fn get_attr(&self, attr: &ObjectRef) -> Option<Value> {
        self.lock().attrs.find(attr).cloned()
    }

    pub fn attr_count(&self) -> usize {
        self.lock().attrs.len()
    }

    /// Bind `attr` to `val` in this object's attribute table.
    pub fn put_attr(&self, attr: &ObjectRef, val: Value) -> Result<(), Fatal> {
        let mut core = self.lock();
        let table = std::mem::take(&mut core.attrs);
        core.attrs = table.put(attr, val)?;
        core.mtime = now_seconds();
        Ok(())
    }

    /// Unbind `attr` from this object's attribute table.
    pub fn remove_attr(&self, attr: &ObjectRef) {
        let mut core = self.lock();
        let table = std::mem::take(&mut core.attrs);
        core.attrs = table.remove(attr);
        core.mtime = now_seconds();
    }

    /// Attributes snapshotted in ascending OID order.
    pub fn attrs_snapshot(&self) -> Vec<(ObjectRef, Value)> {
        self.lock()
            .attrs
            .iter()
            .map(|(a, v)| (a.clone(), v.clone()))
            .collect()
    }

    /// Replace the payload, returning the previous one.
    pub fn put_payload(&self, payload: Payload) -> Payload {
        let mut core = self.lock();
        core.mtime = now_seconds();
        std::mem::replace(&mut core.payload, payload)
    }

    pub fn payload_kind(&self) -> Option<PayloadKind> {
        self.lock().payload.kind()
    }

    /// Run `f` against the payload under the object lock.
    pub fn with_payload<R>(&self, f: impl FnOnce(&Payload) -> R) -> R {
        f(&self.lock().payload)
    }

    /// Run `f` against the payload, mutably, under the object lock.
    pub fn with_payload_mut<R>(&self, f: impl FnOnce(&mut Payload) -> R) -> R {
        let mut core = self.lock();
        core.mtime = now_seconds();
        f(&mut core.payload)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object").field("oid", &self.oid).finish_non_exhaustive()
    }
}

/// Objects order by OID; two handles to the same allocation are equal.
pub fn object_cmp(a: &ObjectRef, b: &ObjectRef) -> Ordering {
    if Arc::ptr_eq(a, b) {
        Ordering::Equal
    } else {
        a.oid().cmp(&b.oid())
    }
}

/// Sort a slice of object handles ascending by OID.
pub fn sort_object_refs(refs: &mut [ObjectRef]) {
    refs.sort_by(object_cmp);
}

/// Growable byte-counted text payload.
#[derive(Debug)]
pub struct StringBuf {
    header: ZoneHeader,
    buf: String,
}

impl StringBuf {
    pub fn new() -> Self {
        let header = ZoneHeader::new(ZoneKind::Payload(PayloadKind::StringBuf), 0, 0)
            .expect("empty string buffer header");
        StringBuf {
            header,
            buf: String::new(),
        }
    }

    /// Append text, refreshing the size class in `xtra` and the byte
    /// count in `length`.
    pub fn append(&mut self, text: &str) -> Result<(), Fatal> {
        self.buf.push_str(text);
        let bytes = self.buf.len();
        if bytes as u64 > super::zone::MAX_ZONE_LEN as u64 {
            return Err(fatal!("string buffer of {} bytes exceeds ceiling", bytes));
        }
        let class = prime::prime_above(bytes as u64 + 1)?;
        let ix = prime::index_of_prime(class).unwrap_or(0);
        self.header.set_xtra(ix as u16);
        self.header.set_length(bytes as u32);
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn header(&self) -> &ZoneHeader {
        &self.header
    }
}

impl Default for StringBuf {
    fn default() -> Self {
        StringBuf::new()
    }
}

/// Queue of objects awaiting execution, one ring per priority.
#[derive(Debug, Default)]
pub struct Agenda {
    low: std::collections::VecDeque<ObjectRef>,
    normal: std::collections::VecDeque<ObjectRef>,
    high: std::collections::VecDeque<ObjectRef>,
}

/// Relative urgency of a queued tasklet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgendaPriority {
    Low,
    Normal,
    High,
}

impl Agenda {
    pub fn new() -> Self {
        Agenda::default()
    }

    pub fn add(&mut self, prio: AgendaPriority, tasklet: ObjectRef) {
        match prio {
            AgendaPriority::Low => self.low.push_back(tasklet),
            AgendaPriority::Normal => self.normal.push_back(tasklet),
            AgendaPriority::High => self.high.push_back(tasklet),
        }
    }

    /// Next tasklet, highest priority first.
    pub fn pop(&mut self) -> Option<ObjectRef> {
        self.high
            .pop_front()
            .or_else(|| self.normal.pop_front())
            .or_else(|| self.low.pop_front())
    }

    pub fn len(&self) -> usize {
        self.low.len() + self.normal.len() + self.high.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> ObjectRef {
        Object::new(Oid::random()).unwrap()
    }

    #[test]
    fn new_rejects_an_invalid_oid() {
        assert!(Object::new(Oid::NULL).is_err());
    }

    #[test]
    fn touch_advances_mtime() {
        let ob = fresh();
        let before = ob.mtime();
        std::thread::sleep(std::time::Duration::from_millis(5));
        ob.touch();
        assert!(ob.mtime() > before);
    }

    #[test]
    fn class_link_round_trips() {
        let ob = fresh();
        let class = fresh();
        assert!(ob.class().is_none());
        ob.set_class(Some(class.clone()));
        assert_eq!(ob.class().unwrap().oid(), class.oid());
        ob.set_class(None);
        assert!(ob.class().is_none());
    }

    #[test]
    fn attrs_go_through_the_lock() {
        let ob = fresh();
        let attr = fresh();
        assert!(ob.get_attr(&attr).is_none());
        ob.put_attr(&attr, Value::int(42)).unwrap();
        assert_eq!(ob.get_attr(&attr), Some(Value::int(42)));
        assert_eq!(ob.attr_count(), 1);
        ob.remove_attr(&attr);
        assert!(ob.get_attr(&attr).is_none());
    }

    #[test]
    fn payload_replace_returns_the_old_one() {
        let ob = fresh();
        assert!(ob.payload_kind().is_none());
        let old = ob.put_payload(Payload::StringBuf(StringBuf::new()));
        assert!(matches!(old, Payload::None));
        assert_eq!(ob.payload_kind(), Some(PayloadKind::StringBuf));
        let old = ob.put_payload(Payload::None);
        assert!(matches!(old, Payload::StringBuf(_)));
    }

    #[test]
    fn objects_sort_by_oid() {
        let mut obs: Vec<ObjectRef> = (0..10).map(|_| fresh()).collect();
        sort_object_refs(&mut obs);
        for w in obs.windows(2) {
            assert!(w[0].oid() <= w[1].oid());
        }
    }

    #[test]
    fn string_buf_tracks_bytes_and_class() {
        let mut sb = StringBuf::new();
        sb.append("hello").unwrap();
        sb.append(", world").unwrap();
        assert_eq!(sb.as_str(), "hello, world");
        assert_eq!(sb.header().length(), 12);
        assert!(crate::common::prime::prime_of_index(sb.header().xtra() as usize).unwrap() > 12);
    }

    #[test]
    fn agenda_pops_highest_priority_first() {
        let mut ag = Agenda::new();
        let a = fresh();
        let b = fresh();
        let c = fresh();
        ag.add(AgendaPriority::Low, a.clone());
        ag.add(AgendaPriority::High, b.clone());
        ag.add(AgendaPriority::Normal, c.clone());
        assert_eq!(ag.pop().unwrap().oid(), b.oid());
        assert_eq!(ag.pop().unwrap().oid(), c.oid());
        assert_eq!(ag.pop().unwrap().oid(), a.oid());
        assert!(ag.pop().is_none());
    }
}
