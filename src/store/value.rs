//! First-class values
//!
//! A value is either a tagged integer (63 usable bits, no zone) or a
//! shared reference to a boxed zone: double, string, JSON document,
//! widget handle, tuple, set, closure, object or file handle. Every
//! value yields a repeatable non-zero 32-bit hash; reloading an
//! identical heap reproduces identical hashes.

use std::sync::atomic::{AtomicU64, Ordering::SeqCst};
use std::sync::{Arc, Mutex};

use ordered_float::OrderedFloat;

use crate::common::fatal::Fatal;
use crate::fatal;

use super::closure::Closure;
use super::object::ObjectRef;
use super::set::SetOb;
use super::string::{hash_str, StringValue};
use super::tuple::Tuple;
use super::zone::{ValueKind, ZoneHeader, ZoneKind};

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Double(OrderedFloat<f64>),
    String(Arc<StringValue>),
    Json(Arc<JsonValue>),
    Widget(Arc<WidgetHandle>),
    Tuple(Arc<Tuple>),
    Set(Arc<SetOb>),
    Closure(Arc<Closure>),
    Object(ObjectRef),
    File(Arc<FileHandle>),
}

impl Value {
    /// Tagged integer: 63 usable bits, sign-preserving truncation.
    pub fn int(i: i64) -> Value {
        Value::Int((i << 1) >> 1)
    }

    /// Boxed double. NaN would break the value total order and is
    /// unrecoverable.
    pub fn double(x: f64) -> Result<Value, Fatal> {
        if x.is_nan() {
            return Err(fatal!("NaN is not a boxable double"));
        }
        Ok(Value::Double(OrderedFloat(x)))
    }

    pub fn string(s: &str) -> Result<Value, Fatal> {
        Ok(Value::String(StringValue::new(s)?))
    }

    pub fn object(ob: ObjectRef) -> Value {
        Value::Object(ob)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(ob) => Some(ob),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Repeatable non-zero 32-bit hash.
    pub fn hash(&self) -> u32 {
        match self {
            Value::Int(i) => hash_word(*i as u64),
            Value::Double(d) => hash_word(d.into_inner().to_bits()),
            Value::String(s) => s.hash(),
            Value::Json(j) => j.hash(),
            Value::Widget(w) => w.hash(),
            Value::Tuple(t) => t.hash(),
            Value::Set(s) => s.hash(),
            Value::Closure(c) => c.hash(),
            Value::Object(ob) => ob.hash32(),
            Value::File(f) => f.hash(),
        }
    }
}

impl PartialEq for Value {
    /// Scalars and strings compare by content, objects by OID,
    /// remaining boxed kinds by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => Arc::ptr_eq(a, b),
            (Value::Widget(a), Value::Widget(b)) => Arc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => Arc::ptr_eq(a, b),
            (Value::Set(a), Value::Set(b)) => Arc::ptr_eq(a, b),
            (Value::Closure(a), Value::Closure(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => a.oid() == b.oid(),
            (Value::File(a), Value::File(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Fold a 64-bit word into a non-zero 32-bit hash.
fn hash_word(u: u64) -> u32 {
    let h = (u ^ (u >> 32)) as u32;
    if h != 0 {
        h
    } else {
        1_000_003
    }
}

/// A boxed, already-parsed JSON document.
#[derive(Debug)]
pub struct JsonValue {
    header: ZoneHeader,
    hash: u32,
    doc: serde_json::Value,
}

impl JsonValue {
    pub fn new(doc: serde_json::Value) -> Result<Arc<Self>, Fatal> {
        let hash = hash_str(&doc.to_string());
        Ok(Arc::new(JsonValue {
            header: ZoneHeader::new(ZoneKind::Value(ValueKind::Json), 0, 0)?,
            hash,
            doc,
        }))
    }

    pub fn doc(&self) -> &serde_json::Value {
        &self.doc
    }

    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn header(&self) -> &ZoneHeader {
        &self.header
    }
}

/// Handle to a UI widget. Never persisted.
#[derive(Debug)]
pub struct WidgetHandle {
    header: ZoneHeader,
    widget_id: u64,
}

impl WidgetHandle {
    pub fn new(widget_id: u64) -> Result<Arc<Self>, Fatal> {
        Ok(Arc::new(WidgetHandle {
            header: ZoneHeader::new(ZoneKind::Value(ValueKind::Widget), 0, 0)?,
            widget_id,
        }))
    }

    pub fn widget_id(&self) -> u64 {
        self.widget_id
    }

    pub fn hash(&self) -> u32 {
        hash_word(self.widget_id)
    }

    pub fn header(&self) -> &ZoneHeader {
        &self.header
    }
}

static FILE_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Handle to an open file. Never persisted; hashes by a serial number
/// fixed at construction.
#[derive(Debug)]
pub struct FileHandle {
    header: ZoneHeader,
    serial: u64,
    file: Mutex<Option<std::fs::File>>,
}

impl FileHandle {
    pub fn new(file: Option<std::fs::File>) -> Result<Arc<Self>, Fatal> {
        Ok(Arc::new(FileHandle {
            header: ZoneHeader::new(ZoneKind::Value(ValueKind::File), 0, 0)?,
            serial: FILE_SERIAL.fetch_add(1, SeqCst),
            file: Mutex::new(file),
        }))
    }

    /// Take the underlying file out of the handle, if still present.
    pub fn take(&self) -> Option<std::fs::File> {
        self.file.lock().ok()?.take()
    }

    pub fn hash(&self) -> u32 {
        hash_word(self.serial)
    }

    pub fn header(&self) -> &ZoneHeader {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_int_truncates_to_63_bits() {
        assert_eq!(Value::int(42).as_int(), Some(42));
        assert_eq!(Value::int(-42).as_int(), Some(-42));
        // bit 63 is lost, sign comes from bit 62
        assert_eq!(Value::int(i64::MAX).as_int(), Some(-1));
        assert_eq!(Value::int((1 << 62) - 1).as_int(), Some((1 << 62) - 1));
    }

    #[test]
    fn nan_double_is_unrecoverable() {
        assert!(Value::double(f64::NAN).is_err());
        assert!(Value::double(1.5).is_ok());
    }

    #[test]
    fn scalar_hashes_repeatable_and_non_zero() {
        for v in [
            Value::int(0),
            Value::int(-7),
            Value::double(0.0).unwrap(),
            Value::double(3.25).unwrap(),
            Value::string("").unwrap(),
            Value::string("attr").unwrap(),
        ] {
            assert_ne!(v.hash(), 0);
            assert_eq!(v.hash(), v.hash());
        }
    }

    #[test]
    fn json_hash_is_content_derived() {
        let a = JsonValue::new(serde_json::json!({"k": [1, 2]})).unwrap();
        let b = JsonValue::new(serde_json::json!({"k": [1, 2]})).unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), 0);
    }

    #[test]
    fn file_handles_hash_distinctly() {
        let a = FileHandle::new(None).unwrap();
        let b = FileHandle::new(None).unwrap();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn string_values_compare_by_content() {
        let a = Value::string("same").unwrap();
        let b = Value::string("same").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Value::string("other").unwrap());
    }
}
