//! Unit tests for agritrust-core.

#[test]
fn test_crate_structure() {
    // Smoke test - verifies the public surface compiles
    use crate::{LedgerConfig, LedgerError, Response, ENV_DB_PATH};

    let config = LedgerConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(ENV_DB_PATH, "AGRITRUST_DB_PATH");

    let response = Response::invalid_cid();
    assert_eq!(response.status, 400);

    let err = LedgerError::StorageTimeout(10);
    assert!(!err.is_validation());
    assert!(!err.is_not_found());
}
