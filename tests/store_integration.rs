//! File-backed `Store` integration tests: a store opened, closed, and
//! reopened against the same path must see the same data (exercises the
//! on-disk migration and WAL path the in-memory unit tests can't).

use chrono::Utc;
use recollect_core::model::{FactType, LinkMetadata, LinkType, MemoryUnit};
use recollect_core::store::Store;
use tempfile::tempdir;

#[test]
fn units_survive_a_reopen_of_the_same_database_file() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("recollect.db");

    let unit_id = {
        let store = Store::new(Some(db_path.clone())).unwrap();
        let unit = MemoryUnit::new("agent-1", "Alice works at Acme Corp.", FactType::World, Utc::now());
        store.insert_unit(&unit).unwrap();
        unit.id
    };

    let reopened = Store::new(Some(db_path)).unwrap();
    let fetched = reopened.get_unit(&unit_id).unwrap();
    assert!(fetched.is_some());
    assert_eq!(fetched.unwrap().text, "Alice works at Acme Corp.");
}

#[test]
fn links_and_mentions_survive_a_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("recollect.db");

    let (a_id, b_id) = {
        let store = Store::new(Some(db_path.clone())).unwrap();
        let a = MemoryUnit::new("agent-1", "fact a", FactType::World, Utc::now());
        let b = MemoryUnit::new("agent-1", "fact b", FactType::World, Utc::now());
        store.insert_unit(&a).unwrap();
        store.insert_unit(&b).unwrap();
        store.upsert_link(&a.id, &b.id, LinkType::Temporal, 0.6, &LinkMetadata::default()).unwrap();
        (a.id, b.id)
    };

    let reopened = Store::new(Some(db_path)).unwrap();
    let neighbors = reopened.neighbors(&a_id, 0.0).unwrap();
    assert!(neighbors.iter().any(|l| l.to_id == b_id && l.link_type == LinkType::Temporal));
}

#[test]
fn delete_agent_removes_all_of_its_units() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("recollect.db");
    let store = Store::new(Some(db_path)).unwrap();

    let a = MemoryUnit::new("agent-1", "fact a", FactType::World, Utc::now());
    let b = MemoryUnit::new("agent-2", "fact b", FactType::World, Utc::now());
    store.insert_unit(&a).unwrap();
    store.insert_unit(&b).unwrap();

    store.delete_agent("agent-1").unwrap();

    assert!(store.get_unit(&a.id).unwrap().is_none());
    assert!(store.get_unit(&b.id).unwrap().is_some());
}
