use super::*;
use crate::backend::memory::MemoryCollection;

fn catalog() -> (DatasetCatalog, IdentifierGenerator) {
    (DatasetCatalog::new(Arc::new(MemoryCollection::new())), IdentifierGenerator::new())
}

#[test]
fn create_then_resolve() {
    let (catalog, gen) = catalog();
    let id = catalog.create(&gen, "D0", Identifier::EMPTY, vec![]).unwrap();
    let resolved = catalog.resolve("D0", Identifier::EMPTY, None).unwrap();
    assert_eq!(resolved, id);
}

#[test]
fn resolve_missing_is_not_found() {
    let (catalog, _gen) = catalog();
    let err = catalog.resolve("Nope", Identifier::EMPTY, None).unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
}

#[test]
fn lookup_list_for_root_is_just_empty() {
    let (catalog, _gen) = catalog();
    let list = catalog.lookup_list(Identifier::EMPTY, None).unwrap();
    assert_eq!(list, vec![Identifier::EMPTY]);
}

#[test]
fn lookup_list_follows_imports_after_importer() {
    let (catalog, gen) = catalog();
    let d0 = catalog.create(&gen, "D0", Identifier::EMPTY, vec![]).unwrap();
    let d1 = catalog.create(&gen, "D1", Identifier::EMPTY, vec![d0]).unwrap();
    let list = catalog.lookup_list(d1, None).unwrap();
    assert_eq!(list, vec![d1, d0]);
}

#[test]
fn lookup_list_dedups_diamond_imports() {
    let (catalog, gen) = catalog();
    let d0 = catalog.create(&gen, "D0", Identifier::EMPTY, vec![]).unwrap();
    let d1 = catalog.create(&gen, "D1", Identifier::EMPTY, vec![d0]).unwrap();
    let d2 = catalog.create(&gen, "D2", Identifier::EMPTY, vec![d0]).unwrap();
    let d3 = catalog.create(&gen, "D3", Identifier::EMPTY, vec![d1, d2]).unwrap();
    let list = catalog.lookup_list(d3, None).unwrap();
    assert_eq!(list, vec![d3, d1, d0, d2]);
    let unique: HashSet<Identifier> = list.iter().copied().collect();
    assert_eq!(unique.len(), list.len());
}

#[test]
fn duplicate_imports_are_deduped_at_traversal_not_rejected_at_create() {
    let (catalog, gen) = catalog();
    let d0 = catalog.create(&gen, "D0", Identifier::EMPTY, vec![]).unwrap();
    let d1 = catalog.create(&gen, "D1", Identifier::EMPTY, vec![d0, d0]).unwrap();
    let list = catalog.lookup_list(d1, None).unwrap();
    assert_eq!(list, vec![d1, d0]);
}

#[test]
fn import_that_does_not_dominate_is_rejected() {
    let (catalog, gen) = catalog();
    let far_future = Identifier::from_hex("ffffffffffffffffffffffff").unwrap();
    let err = catalog.create(&gen, "D1", Identifier::EMPTY, vec![far_future]).unwrap_err();
    assert!(matches!(err, StoreError::InvalidDataset { .. }));
}

#[test]
fn cutoff_hides_descriptor_and_its_imports() {
    let (catalog, gen) = catalog();
    let d0 = catalog.create(&gen, "D0", Identifier::EMPTY, vec![]).unwrap();
    let d1 = catalog.create(&gen, "D1", Identifier::EMPTY, vec![d0]).unwrap();
    let before_d1 = {
        // a cutoff strictly between d0 and d1 should still see d0 but not d1
        d0
    };
    let list = catalog.lookup_list(d1, Some(before_d1)).unwrap();
    // d1 itself is the start and always seeded; but since d1 > cutoff its
    // imports must not be followed.
    assert_eq!(list, vec![d1]);
}
