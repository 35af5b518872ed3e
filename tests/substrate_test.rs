//! End-to-end exercise of the object substrate: a two-pass load from
//! JSON, attribute and payload access afterwards, and concurrent use
//! of the shared table and symbol registry.
use std::sync::Arc;

use serde_json::json;

use ironbark::store::loader::{LoadPass, Loader};
use ironbark::store::object::Payload;
use ironbark::store::oid::Oid;
use ironbark::store::symbol::SymbolRegistry;
use ironbark::store::table::ObjectTable;
use ironbark::store::value::Value;

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

#[test]
fn two_pass_load_rebuilds_a_small_heap() {
    init_tracing();
    let table = Arc::new(ObjectTable::new());
    let mut loader = Loader::new(Arc::clone(&table), 4).unwrap();

    let root = Oid::random();
    let class = Oid::random();
    let attr = Oid::random();
    let member = Oid::random();

    for oid in [root, class, attr, member] {
        loader.get_loaded_object(oid).unwrap();
    }
    assert_eq!(loader.pass(), LoadPass::Creating);
    assert_eq!(loader.created(), 4);

    loader.begin_fill().unwrap();
    let root_ob = loader.get_loaded_object(root).unwrap();
    loader
        .fill_object(
            &root_ob,
            &json!({
                "class": class.to_string(),
                "attrs": [
                    {"at": attr.to_string(), "va": {"tup": [member.to_string(), null]}},
                ],
                "setob": [member.to_string()],
            }),
        )
        .unwrap();

    assert_eq!(root_ob.class().unwrap().oid(), class);
    let attr_ob = table.find(attr).unwrap();
    match root_ob.get_attr(&attr_ob) {
        Some(Value::Tuple(t)) => {
            assert_eq!(t.arity(), 2);
            assert_eq!(t.nth(0).unwrap().oid(), member);
            assert!(t.nth(1).is_none());
        }
        other => panic!("unexpected attribute value {:?}", other),
    }
    root_ob.with_payload(|p| match p {
        Payload::MutableSet(ms) => {
            assert!(ms.contains(member));
            assert_eq!(ms.len(), 1);
        }
        other => panic!("unexpected payload {:?}", other),
    });

    table.check_buckets().unwrap();
    assert_eq!(table.len(), 4);
}

#[test]
fn values_survive_a_load_and_hash_deterministically() {
    init_tracing();
    let table = Arc::new(ObjectTable::new());
    let mut loader = Loader::new(Arc::clone(&table), 3).unwrap();
    let oids: Vec<Oid> = (0..3).map(|_| Oid::random()).collect();
    for oid in &oids {
        loader.get_loaded_object(*oid).unwrap();
    }
    loader.begin_fill().unwrap();

    let description = json!({
        "clo": oids[0].to_string(),
        "env": [1, {"set": [oids[1].to_string(), oids[2].to_string()]}],
    });
    let once = loader.value_from_json(&description).unwrap().unwrap();
    let twice = loader.value_from_json(&description).unwrap().unwrap();
    assert_eq!(once.hash(), twice.hash());
    assert_ne!(once.hash(), 0);
}

#[test]
fn registry_and_table_cope_with_concurrent_use() {
    init_tracing();
    let table = Arc::new(ObjectTable::new());
    let registry = Arc::new(SymbolRegistry::new());

    let mut handles = Vec::new();
    for t in 0..6 {
        let table = Arc::clone(&table);
        let registry = Arc::clone(&registry);
        handles.push(std::thread::spawn(move || {
            for i in 0..200 {
                let ob = table.allocate().unwrap();
                assert!(table.find(ob.oid()).is_some());
                // interning the same name from every thread yields one symbol
                let shared = registry.register("shared_root").unwrap();
                shared.set_owner(Some(ob.clone()));
                let own = registry.register(&format!("worker{}_{}", t, i)).unwrap();
                own.set_value(Some(Value::int(i)));
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(table.len(), 6 * 200);
    table.check_buckets().unwrap();
    assert_eq!(registry.len(), 6 * 200 + 1);
    assert!(registry.find("shared_root").is_some());
    assert!(registry.find("worker0_0").is_some());
}
