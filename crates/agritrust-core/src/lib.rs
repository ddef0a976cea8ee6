//! # AgriTrust Core
//!
//! Async ledger facade over the record registry.
//! Owns the storage lifecycle, bounds every storage round-trip with a
//! timeout, and turns outcomes into boundary responses.
//!
//! ## Failure Handling
//!
//! | Failure | Error | Response |
//! |---------|-------|----------|
//! | Bad payload | `RegistryError::Validation` | 400 with per-field details |
//! | Duplicate cid | `RegistryError::AlreadyExists` | 409 |
//! | Unknown cid | `RegistryError::NotFound` | 404 |
//! | Slow storage | `LedgerError::StorageTimeout` | 503 |
//! | Anything else | `LedgerError::Internal` / storage | 500, no detail leaked |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       AGRITRUST CORE                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   request body ──► response::submit / verify / list             │
//! │                              │                                  │
//! │                              ▼                                  │
//! │                    ┌─────────────────┐                          │
//! │                    │     Ledger      │  ← timeout per call      │
//! │                    └────────┬────────┘                          │
//! │                             │ spawn_blocking                    │
//! │                             ▼                                   │
//! │                    ┌─────────────────┐                          │
//! │                    │ RecordRegistry  │  (agritrust-registry)    │
//! │                    └─────────────────┘                          │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agritrust_core::{response, Ledger, LedgerConfig};
//!
//! let ledger = Ledger::open(LedgerConfig::load_or_default("config/agritrust.toml")?)?;
//!
//! let created = response::submit(&ledger, body).await;
//! assert_eq!(created.status, 201);
//!
//! let checked = response::verify(&ledger, "bafy123").await;
//! println!("{}", checked.body);
//!
//! ledger.shutdown().await?;
//! ```

mod config;
mod error;
mod ledger;
pub mod response;

pub use config::{
    LedgerConfig, LoggingConfig, RegistryConfig, StorageConfig, ENV_DB_PATH, ENV_LOG,
};
pub use error::LedgerError;
pub use ledger::Ledger;
pub use response::Response;

// Re-export registry types for convenience
pub use agritrust_registry::{
    ContentHash, LandParcel, Receipt, RecordKind, RecordStatus, RecordSubmission, StoredRecord,
    Verification,
};

/// Core result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests;
