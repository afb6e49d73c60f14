use super::*;

#[test]
fn empty_precedes_everything() {
    let gen = IdentifierGenerator::new();
    let first = gen.next().unwrap();
    assert!(Identifier::EMPTY < first);
}

#[test]
fn monotonic_under_rapid_calls() {
    let gen = IdentifierGenerator::new();
    let mut previous = Identifier::EMPTY;
    for _ in 0..5_000 {
        let id = gen.next().unwrap();
        assert!(id > previous, "identifier sequence must be strictly increasing");
        previous = id;
    }
}

#[test]
fn hex_roundtrip() {
    let gen = IdentifierGenerator::new();
    let id = gen.next().unwrap();
    let s = id.to_hex();
    let back: Identifier = s.parse().unwrap();
    assert_eq!(id, back);
}

#[test]
fn serde_roundtrip() {
    let gen = IdentifierGenerator::new();
    let id = gen.next().unwrap();
    let json = serde_json::to_string(&id).unwrap();
    let back: Identifier = serde_json::from_str(&json).unwrap();
    assert_eq!(id, back);
}

#[test]
fn read_only_rejects_generation() {
    let gen = IdentifierGenerator::new();
    gen.set_read_only(true);
    let err = gen.next().unwrap_err();
    assert!(matches!(err, StoreError::ReadOnlyViolation { .. }));
}
