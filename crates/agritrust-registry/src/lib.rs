//! # AgriTrust Record Registry - Tamper-Evident Sensor Records
//!
//! The Record Registry gives agricultural sensor readings a tamper-evidence
//! property. Each record is reduced to a canonical string, fingerprinted with
//! SHA-256, and stored together with its fingerprint. Anyone can later recompute
//! the fingerprint from the stored fields and compare.
//!
//! This is content hashing only. There is no ledger, consensus or signature
//! scheme: the digest proves that stored fields have not changed since they were
//! hashed, nothing more.
//!
//! ## Threat Model
//!
//! | Threat | Description | Defense |
//! |--------|-------------|---------|
//! | Storage tampering | A stored reading is edited in place | Hash mismatch on verify |
//! | Forged client hash | Submitter supplies its own digest | Hash always recomputed |
//! | Field-set drift | Write and verify hash different fields | One field-set definition per kind |
//! | Key reordering | Same record, different field order | Canonical key sorting |
//! | Null ambiguity | Omitted vs `null` optional fields | Null members dropped |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        RECORD REGISTRY                              │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌───────────────────┐    canonical   ┌─────────────────────────┐  │
//! │  │   CANONICALIZER   │───────────────▶│        HASHER           │  │
//! │  │  • Sort keys      │    string      │  SHA-256 → 64 hex chars │  │
//! │  │  • Drop nulls     │                └────────────┬────────────┘  │
//! │  │  • Fixed numbers  │                             │               │
//! │  └───────────────────┘                             ▼               │
//! │  ┌───────────────────┐                ┌─────────────────────────┐  │
//! │  │    VALIDATION     │                │     SLED STORAGE        │  │
//! │  │  every violation  │                │  • records (by cid)     │  │
//! │  │  reported at once │                │  • land parcels         │  │
//! │  └───────────────────┘                └─────────────────────────┘  │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use agritrust_registry::{RecordKind, RecordRegistry, RecordSubmission, SoilReading};
//! use chrono::{TimeZone, Utc};
//!
//! let registry = RecordRegistry::temporary().unwrap();
//!
//! let reading = RecordKind::SoilReading(SoilReading {
//!     land_id: "L1".to_string(),
//!     crop_type: "Wheat".to_string(),
//!     soil_moisture: 42.0,
//!     temperature: 21.0,
//!     ph_level: None,
//!     humidity: None,
//!     cid: "bafy123".to_string(),
//!     producer_id: "P1".to_string(),
//! });
//!
//! let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
//! let receipt = registry.create_at(RecordSubmission::new(reading), at).unwrap();
//! println!("stored {} as {}", receipt.cid, receipt.hash);
//!
//! let check = registry.verify("bafy123").unwrap();
//! assert!(check.valid);
//! ```

pub mod canonicalize;
pub mod models;
pub mod registry;
pub mod storage;
pub mod validation;

pub use canonicalize::compute_record_hash;
pub use models::{
    ContentHash, FieldViolation, LandParcel, Receipt, RecordDigest, RecordKind, RecordStatus,
    RecordSubmission, RegistryError, Result, SoilReading, StoredRecord, Verification,
    VerificationAttestation, WeatherReading,
};
pub use registry::{verify_stored_record, RecordRegistry};

#[cfg(test)]
mod tests;
