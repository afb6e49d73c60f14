use super::*;
use crate::backend::memory::MemoryCollection;
use crate::backend::DiscriminatorWire;
use crate::identifier::IdentifierGenerator;
use crate::record::TypeRegistry;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Quote {
    price: f64,
}
impl RecordType for Quote {
    const TYPE_NAME: &'static str = "Quote";
}

fn store_with(collection: MemoryCollection) -> RecordStore {
    RecordStore::new(Arc::new(collection))
}

#[test]
fn insert_and_load_roundtrip() {
    let gen = IdentifierGenerator::new();
    let store = store_with(MemoryCollection::new());
    let id = gen.next().unwrap();
    let mut payload = Map::new();
    payload.insert("price".to_string(), json!(10.5));
    let doc = StoredDoc { id, dataset: Identifier::EMPTY, key: "A;0".to_string(), discriminator: DiscriminatorWire::Scalar("Quote".to_string()), payload };
    store.insert_unique(doc).unwrap();

    let mut registry = TypeRegistry::new();
    registry.register::<Quote>();
    let decoded = store.load_by_id(id).unwrap();
    let typed: Quote = decoded.into_typed::<Quote>(&registry).unwrap().unwrap();
    assert_eq!(typed, Quote { price: 10.5 });
}

#[test]
fn duplicate_insert_is_rejected() {
    let gen = IdentifierGenerator::new();
    let store = store_with(MemoryCollection::new());
    let id = gen.next().unwrap();
    let doc = StoredDoc { id, dataset: Identifier::EMPTY, key: "A;0".to_string(), discriminator: DiscriminatorWire::Scalar("Quote".to_string()), payload: Map::new() };
    store.insert_unique(doc.clone()).unwrap();
    let err = store.insert_unique(doc).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateId { .. }));
}

#[test]
fn tombstone_decodes_to_none_for_any_type() {
    let gen = IdentifierGenerator::new();
    let store = store_with(MemoryCollection::new());
    let id = gen.next().unwrap();
    store.insert_tombstone(id, Identifier::EMPTY, "A;0".to_string()).unwrap();
    let registry = TypeRegistry::new();
    let decoded = store.load_by_id(id).unwrap();
    assert!(decoded.is_tombstone());
    assert_eq!(decoded.into_typed::<Quote>(&registry).unwrap(), None);
}

#[test]
fn type_mismatch_is_an_error_not_none() {
    let gen = IdentifierGenerator::new();
    let store = store_with(MemoryCollection::new());
    let id = gen.next().unwrap();
    let doc = StoredDoc { id, dataset: Identifier::EMPTY, key: "A;0".to_string(), discriminator: DiscriminatorWire::Scalar("OtherType".to_string()), payload: Map::new() };
    store.insert_unique(doc).unwrap();
    let registry = TypeRegistry::new();
    let decoded = store.load_by_id(id).unwrap();
    let err = decoded.into_typed::<Quote>(&registry).unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { .. }));
}

#[test]
fn reserved_user_index_name_rejected() {
    let store = store_with(MemoryCollection::new());
    let err = store.create_user_index("Key", vec![]).unwrap_err();
    assert!(matches!(err, StoreError::ReservedIndexName(_)));
}
