//! Error types for the AgriTrust ledger facade.

use agritrust_registry::RegistryError;
use thiserror::Error;

/// Core error type for ledger operations.
///
/// Every variant is per-request: none of them should take the process down.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Registry error passthrough (validation, not found, storage).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A storage round-trip exceeded the configured timeout.
    #[error("Storage timed out after {0} ms")]
    StorageTimeout(u64),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// True for caller mistakes the caller can fix and resubmit.
    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Registry(RegistryError::Validation(_)))
    }

    /// True when the referenced record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::Registry(RegistryError::NotFound(_)))
    }
}
