//! Named symbols and the process-wide registry
//!
//! A symbol interns a name once for the whole process and carries an
//! optional bound value plus a link to the object owning it as a
//! payload. The registry keeps symbols in ascending byte-wise name
//! order behind a single mutex; registering an existing name hands
//! back the interned symbol, and lookup never allocates.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::common::fatal::Fatal;
use crate::fatal;

use super::index::OrdIndex;
use super::object::ObjectRef;
use super::string::StringValue;
use super::value::Value;
use super::zone::{PayloadKind, ZoneHeader, ZoneKind};

/// Symbol names start with an ASCII letter and continue with letters,
/// digits or single underscores.
pub fn valid_symbol_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    let mut prev_underscore = false;
    for c in chars {
        if c == '_' {
            if prev_underscore {
                return false;
            }
            prev_underscore = true;
        } else if c.is_ascii_alphanumeric() {
            prev_underscore = false;
        } else {
            return false;
        }
    }
    !prev_underscore
}

/// An interned named symbol.
#[derive(Debug)]
pub struct Symbol {
    header: ZoneHeader,
    name: Arc<StringValue>,
    value: Mutex<Option<Value>>,
    owner: Mutex<Option<ObjectRef>>,
}

impl Symbol {
    fn new(name: &str) -> Result<Arc<Self>, Fatal> {
        let boxed = StringValue::new(name)?;
        let header = ZoneHeader::new(
            ZoneKind::Payload(PayloadKind::Symbol),
            0,
            boxed.char_len() as u64,
        )?;
        Ok(Arc::new(Symbol {
            header,
            name: boxed,
            value: Mutex::new(None),
            owner: Mutex::new(None),
        }))
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn name_value(&self) -> Arc<StringValue> {
        self.name.clone()
    }

    pub fn value(&self) -> Option<Value> {
        lock(&self.value).clone()
    }

    pub fn set_value(&self, value: Option<Value>) {
        *lock(&self.value) = value;
    }

    /// Object carrying this symbol as its payload, if any.
    pub fn owner(&self) -> Option<ObjectRef> {
        lock(&self.owner).clone()
    }

    pub fn set_owner(&self, owner: Option<ObjectRef>) {
        *lock(&self.owner) = owner;
    }

    pub fn header(&self) -> &ZoneHeader {
        &self.header
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Name-keyed symbol index behind one mutex.
#[derive(Debug, Default)]
pub struct SymbolRegistry {
    inner: Mutex<OrdIndex<String, Arc<Symbol>>>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        SymbolRegistry::default()
    }

    /// Intern `name`, creating the symbol on first registration. An
    /// ill-formed name is unrecoverable.
    pub fn register(&self, name: &str) -> Result<Arc<Symbol>, Fatal> {
        if !valid_symbol_name(name) {
            return Err(fatal!("ill-formed symbol name {:?}", name));
        }
        let mut index = lock(&self.inner);
        if let Some(existing) = index.find(name) {
            return Ok(existing.clone());
        }
        let symbol = Symbol::new(name)?;
        index.insert(name.to_owned(), symbol.clone());
        Ok(symbol)
    }

    /// Interned symbol for `name`, if registered. Never allocates a
    /// symbol.
    pub fn find(&self, name: &str) -> Option<Arc<Symbol>> {
        lock(&self.inner).find(name).cloned()
    }

    /// Drop `name` from the registry; true when it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        lock(&self.inner).erase(name).is_some()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).is_empty()
    }

    /// Registered names in ascending byte-wise order.
    pub fn names(&self) -> Vec<String> {
        lock(&self.inner).iter().map(|(k, _)| k.clone()).collect()
    }
}

lazy_static! {
    static ref SYMBOLS: SymbolRegistry = SymbolRegistry::new();
}

/// The process-wide symbol registry.
pub fn symbols() -> &'static SymbolRegistry {
    &SYMBOLS
}
