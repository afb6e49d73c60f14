use super::*;

#[test]
fn duplicate_id_display() {
    let err = StoreError::DuplicateId { id: Identifier::EMPTY };
    assert!(err.to_string().contains("already exists"));
}

#[test]
fn read_only_violation_display() {
    let err = StoreError::ReadOnlyViolation { operation: "Save".into() };
    assert!(err.to_string().contains("read-only"));
}

#[test]
fn internal_wraps_anyhow() {
    let anyhow_err = anyhow::anyhow!("boom");
    let err: StoreError = anyhow_err.into();
    assert!(matches!(err, StoreError::Internal(_)));
}
