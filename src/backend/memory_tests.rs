use super::*;
use crate::backend::{IndexSpec, ScanFilter, SortField};
use crate::identifier::IdentifierGenerator;
use serde_json::json;

fn doc(id: Identifier, dataset: Identifier, key: &str) -> StoredDoc {
    let mut payload = serde_json::Map::new();
    payload.insert("v".to_string(), json!(1));
    StoredDoc {
        id,
        dataset,
        key: key.to_string(),
        discriminator: DiscriminatorWire::Scalar("Quote".to_string()),
        payload,
    }
}

#[test]
fn insert_unique_rejects_duplicate_id() {
    let gen = IdentifierGenerator::new();
    let id = gen.next().unwrap();
    let coll = MemoryCollection::new();
    coll.insert_unique(doc(id, Identifier::EMPTY, "A;0")).unwrap();
    let err = coll.insert_unique(doc(id, Identifier::EMPTY, "A;0")).unwrap_err();
    assert!(matches!(err, BackendError::DuplicateId(_)));
}

#[test]
fn scan_respects_key_and_cutoff() {
    let gen = IdentifierGenerator::new();
    let coll = MemoryCollection::new();
    let id1 = gen.next().unwrap();
    let id2 = gen.next().unwrap();
    coll.insert_unique(doc(id1, Identifier::EMPTY, "A;0")).unwrap();
    coll.insert_unique(doc(id2, Identifier::EMPTY, "A;0")).unwrap();

    let mut filter = ScanFilter::default();
    filter.key_eq = Some("A;0".to_string());
    filter.cutoff = Some(id1);
    filter.sort = vec![SortField::desc("id")];
    let mut cursor = coll.scan(filter);
    let batch = cursor.next_batch(10);
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].id, id1);
}

#[test]
fn reserved_index_names_rejected() {
    let coll = MemoryCollection::new();
    let err = coll.create_index(IndexSpec { name: "Default".to_string(), fields: vec![] }).unwrap_err();
    assert!(matches!(err, BackendError::ReservedIndexName(_)));
    let err = coll.create_index(IndexSpec { name: "Key".to_string(), fields: vec![] }).unwrap_err();
    assert!(matches!(err, BackendError::ReservedIndexName(_)));
}

#[test]
fn conflicting_index_orders_rejected() {
    let coll = MemoryCollection::new();
    coll.create_index(IndexSpec { name: "ByValue".to_string(), fields: vec![SortField::asc("v")] }).unwrap();
    let err = coll
        .create_index(IndexSpec { name: "ByValue".to_string(), fields: vec![SortField::desc("v")] })
        .unwrap_err();
    assert!(matches!(err, BackendError::IndexOrderConflict { .. }));
}

#[test]
fn snapshot_roundtrips_through_disk() {
    let tmp = tempfile::tempdir().unwrap();
    let gen = IdentifierGenerator::new();
    let id = gen.next().unwrap();
    {
        let coll = MemoryCollection::open_at(tmp.path(), "Quote").unwrap();
        coll.insert_unique(doc(id, Identifier::EMPTY, "A;0")).unwrap();
        coll.flush().unwrap();
    }
    let reopened = MemoryCollection::open_at(tmp.path(), "Quote").unwrap();
    assert_eq!(reopened.len(), 1);
    let loaded = reopened.load_by_id(id).unwrap();
    assert_eq!(loaded.key, "A;0");
}
