//! Two-pass persistent-state loader
//!
//! Loading happens in two passes over the same JSON description.
//! The creating pass registers every object OID so later references
//! resolve; the filling pass materializes values, attributes, class
//! links and payloads. [`Loader::get_loaded_object`] dispatches on the
//! current pass, and using an operation in the wrong pass means the
//! load ordering is corrupted, which is unrecoverable.

use std::sync::Arc;

use serde_json::Value as Json;

use crate::common::fatal::Fatal;
use crate::fatal;

use super::closure::Closure;
use super::mutset::MutableSet;
use super::object::{Agenda, AgendaPriority, ObjectRef, Payload, StringBuf};
use super::oid::Oid;
use super::set::SetOb;
use super::string::StringValue;
use super::symbol::symbols;
use super::table::ObjectTable;
use super::tuple::Tuple;
use super::value::{JsonValue, Value};

/// Which of the two load passes is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPass {
    /// First pass: every OID is registered as an empty object.
    Creating,
    /// Second pass: contents are materialized into existing objects.
    Filling,
}

pub struct Loader {
    table: Arc<ObjectTable>,
    pass: LoadPass,
    created: usize,
    filled: usize,
}

impl Loader {
    /// Start a load of roughly `expected` objects against `table`,
    /// presizing its buckets, in the creating pass.
    pub fn new(table: Arc<ObjectTable>, expected: usize) -> Result<Self, Fatal> {
        table.reserve_for_load(expected)?;
        tracing::debug!(expected, "load starting, creating pass");
        Ok(Loader {
            table,
            pass: LoadPass::Creating,
            created: 0,
            filled: 0,
        })
    }

    pub fn pass(&self) -> LoadPass {
        self.pass
    }

    pub fn created(&self) -> usize {
        self.created
    }

    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Switch from the creating to the filling pass, once.
    pub fn begin_fill(&mut self) -> Result<(), Fatal> {
        if self.pass != LoadPass::Creating {
            return Err(fatal!("filling pass started twice"));
        }
        tracing::debug!(created = self.created, "filling pass starting");
        self.pass = LoadPass::Filling;
        Ok(())
    }

    /// The object under `oid` for the current pass: freshly created in
    /// the creating pass, fetched in the filling pass. An OID that
    /// already exists while creating, or does not exist while filling,
    /// is unrecoverable.
    pub fn get_loaded_object(&mut self, oid: Oid) -> Result<ObjectRef, Fatal> {
        match self.pass {
            LoadPass::Creating => {
                let ob = self.table.create(oid)?;
                self.created += 1;
                Ok(ob)
            }
            LoadPass::Filling => {
                let ob = self.table.fill(oid)?;
                self.filled += 1;
                Ok(ob)
            }
        }
    }

    fn resolve(&self, oid: Oid) -> Result<ObjectRef, Fatal> {
        if self.pass != LoadPass::Filling {
            return Err(fatal!("object reference {} resolved before filling pass", oid));
        }
        self.table.fill(oid)
    }

    /// Materialize one JSON datum as a value. `null` is the absent
    /// value; structurally invalid input is unrecoverable.
    pub fn value_from_json(&self, js: &Json) -> Result<Option<Value>, Fatal> {
        match js {
            Json::Null => Ok(None),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Some(Value::int(i)))
                } else if let Some(x) = n.as_f64() {
                    Ok(Some(Value::double(x)?))
                } else {
                    Err(fatal!("unrepresentable number {}", n))
                }
            }
            Json::String(s) => {
                if s.starts_with('_') {
                    let (oid, rest) = Oid::parse(s);
                    if !oid.is_null() && rest.is_empty() {
                        return Ok(Some(Value::Object(self.resolve(oid)?)));
                    }
                }
                Ok(Some(Value::String(StringValue::new(s)?)))
            }
            Json::Object(map) => {
                if let Some(components) = map.get("tup") {
                    let comps = self.object_or_hole_vec(components)?;
                    Ok(Some(Value::Tuple(Tuple::new(&comps)?)))
                } else if let Some(elements) = map.get("set") {
                    let els = self.object_vec(elements)?;
                    Ok(Some(Value::Set(SetOb::new(&els)?)))
                } else if let Some(conn) = map.get("clo") {
                    let connective = self.object_from_json(conn)?;
                    let env = match map.get("env") {
                        Some(Json::Array(items)) => {
                            let mut captured = Vec::with_capacity(items.len());
                            for item in items {
                                captured.push(self.value_from_json(item)?.ok_or_else(|| {
                                    fatal!("null captured value in closure under {}", connective.oid())
                                })?);
                            }
                            captured
                        }
                        None => Vec::new(),
                        Some(other) => {
                            return Err(fatal!("closure env is not an array: {}", other))
                        }
                    };
                    let meta = match map.get("meta") {
                        Some(m) => self.value_from_json(m)?,
                        None => None,
                    };
                    Ok(Some(Value::Closure(Closure::new(connective, meta, &env)?)))
                } else if let Some(doc) = map.get("json") {
                    Ok(Some(Value::Json(JsonValue::new(doc.clone())?)))
                } else {
                    Err(fatal!("unrecognized value description {}", js))
                }
            }
            Json::Bool(_) | Json::Array(_) => {
                Err(fatal!("unrecognized value description {}", js))
            }
        }
    }

    fn object_from_json(&self, js: &Json) -> Result<ObjectRef, Fatal> {
        match js {
            Json::String(s) if s.starts_with('_') => {
                let (oid, rest) = Oid::parse(s);
                if oid.is_null() || !rest.is_empty() {
                    return Err(fatal!("malformed object id {:?}", s));
                }
                self.resolve(oid)
            }
            _ => Err(fatal!("expected an object id, got {}", js)),
        }
    }

    fn object_vec(&self, js: &Json) -> Result<Vec<ObjectRef>, Fatal> {
        match js {
            Json::Array(items) => items.iter().map(|i| self.object_from_json(i)).collect(),
            _ => Err(fatal!("expected an array of object ids, got {}", js)),
        }
    }

    fn object_or_hole_vec(&self, js: &Json) -> Result<Vec<Option<ObjectRef>>, Fatal> {
        match js {
            Json::Array(items) => items
                .iter()
                .map(|i| match i {
                    Json::Null => Ok(None),
                    other => self.object_from_json(other).map(Some),
                })
                .collect(),
            _ => Err(fatal!("expected an array of components, got {}", js)),
        }
    }

    /// Fill `ob` from its JSON description: `class`, `attrs`, `mtime`
    /// and at most one payload key. Only meaningful in the filling
    /// pass.
    pub fn fill_object(&mut self, ob: &ObjectRef, js: &Json) -> Result<(), Fatal> {
        if self.pass != LoadPass::Filling {
            return Err(fatal!("object {} filled during creating pass", ob.oid()));
        }
        let map = match js {
            Json::Object(map) => map,
            _ => return Err(fatal!("object description for {} is not a map", ob.oid())),
        };
        if let Some(class) = map.get("class") {
            ob.set_class(Some(self.object_from_json(class)?));
        }
        if let Some(attrs) = map.get("attrs") {
            let entries = match attrs {
                Json::Array(entries) => entries,
                _ => return Err(fatal!("attrs of {} is not an array", ob.oid())),
            };
            for entry in entries {
                let at = entry
                    .get("at")
                    .ok_or_else(|| fatal!("attribute entry without \"at\" in {}", ob.oid()))?;
                let va = entry
                    .get("va")
                    .ok_or_else(|| fatal!("attribute entry without \"va\" in {}", ob.oid()))?;
                let attr = self.object_from_json(at)?;
                if let Some(value) = self.value_from_json(va)? {
                    ob.put_attr(&attr, value)?;
                }
            }
        }
        self.fill_payload(ob, map)?;
        Ok(())
    }

    fn fill_payload(
        &self,
        ob: &ObjectRef,
        map: &serde_json::Map<String, Json>,
    ) -> Result<(), Fatal> {
        if let Some(members) = map.get("setob") {
            let mut ms = MutableSet::new();
            for member in self.object_vec(members)? {
                ms.add(&member);
            }
            ob.put_payload(Payload::MutableSet(ms));
        } else if let Some(name) = map.get("symb_name") {
            let name = match name {
                Json::String(s) => s,
                _ => return Err(fatal!("symbol name of {} is not a string", ob.oid())),
            };
            let symbol = symbols().register(name)?;
            if let Some(v) = map.get("symb_value") {
                symbol.set_value(self.value_from_json(v)?);
            }
            symbol.set_owner(Some(ob.clone()));
            ob.put_payload(Payload::Symbol(symbol));
        } else if let Some(text) = map.get("strbuf") {
            let text = match text {
                Json::String(s) => s,
                _ => return Err(fatal!("string buffer of {} is not a string", ob.oid())),
            };
            let mut sb = StringBuf::new();
            sb.append(text)?;
            ob.put_payload(Payload::StringBuf(sb));
        } else if let Some(queues) = map.get("agenda") {
            let mut agenda = Agenda::new();
            for (key, prio) in [
                ("low", AgendaPriority::Low),
                ("normal", AgendaPriority::Normal),
                ("high", AgendaPriority::High),
            ] {
                if let Some(queued) = queues.get(key) {
                    for tasklet in self.object_vec(queued)? {
                        agenda.add(prio, tasklet);
                    }
                }
            }
            ob.put_payload(Payload::Agenda(agenda));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Loader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("pass", &self.pass)
            .field("created", &self.created)
            .field("filled", &self.filled)
            .finish()
    }
}
