//! # Record Registry - Main Facade
//!
//! Coordinates validation, canonicalization, hashing and storage into the two
//! protocols records go through: creation and verification.
//!
//! ## Architecture
//!
//! ```text
//!                    ┌────────────────────┐
//!                    │   RecordRegistry   │
//!                    │      (Facade)      │
//!                    └─────────┬──────────┘
//!                              │
//!          ┌───────────────────┼───────────────────┐
//!          ▼                   ▼                   ▼
//!    ┌──────────┐       ┌──────────────┐     ┌──────────┐
//!    │Validation│       │Canonicalizer │     │ Storage  │
//!    │          │       │  + SHA-256   │     │  (Sled)  │
//!    └──────────┘       └──────────────┘     └──────────┘
//! ```
//!
//! ## Creation
//!
//! 1. Validate every field (all violations reported together)
//! 2. Fix the creation timestamp
//! 3. Canonicalize and hash
//! 4. Persist record, timestamp, hash and derived status
//! 5. Return hash and canonical string
//!
//! ## Verification
//!
//! 1. Load the record by content identifier
//! 2. Canonicalize the **stored** fields and timestamp
//! 3. Recompute the hash and compare with the stored one
//!
//! Verification is read-only and repeatable.

use crate::canonicalize::compute_record_hash;
use crate::models::{
    LandParcel, Receipt, RecordKind, RecordStatus, RecordSubmission, RegistryError, Result,
    StoredRecord, Verification, VerificationAttestation,
};
use crate::storage::Storage;
use crate::validation::validate;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;
use tracing::{debug, info, warn};

/// Default number of records returned by [`RecordRegistry::list`].
pub const DEFAULT_LIST_LIMIT: usize = 50;

/// Renders a creation time the way it is hashed and stored:
/// RFC 3339, UTC, millisecond precision, `Z` suffix.
///
/// ```rust
/// use agritrust_registry::registry::format_timestamp;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
/// assert_eq!(format_timestamp(at), "2024-05-01T10:00:00.000Z");
/// ```
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Re-checks a stored record against its stored hash.
///
/// Pure: takes the stored fields as they are now, recomputes the digest and
/// compares it by exact string equality. A mismatch means the stored data
/// changed after hashing, or the stored hash was wrong to begin with.
pub fn verify_stored_record(stored: &StoredRecord) -> Verification {
    let digest = compute_record_hash(&stored.record, &stored.timestamp);
    Verification {
        valid: digest.hash.to_string() == stored.hash,
        stored_hash: stored.hash.clone(),
        recomputed_hash: digest.hash,
        canonical: digest.canonical,
    }
}

/// The main registry interface.
///
/// All operations take `&self`; the underlying Sled database handles
/// concurrent access.
///
/// # Example
///
/// ```rust
/// use agritrust_registry::{RecordKind, RecordRegistry, RecordSubmission, SoilReading};
///
/// let registry = RecordRegistry::temporary().unwrap();
///
/// let record = RecordKind::SoilReading(SoilReading {
///     land_id: "L1".into(),
///     crop_type: "Wheat".into(),
///     soil_moisture: 42.0,
///     temperature: 21.0,
///     ph_level: None,
///     humidity: None,
///     cid: "bafy123".into(),
///     producer_id: "P1".into(),
/// });
///
/// let receipt = registry.create(RecordSubmission::new(record)).unwrap();
/// let check = registry.verify("bafy123").unwrap();
///
/// assert!(check.valid);
/// assert_eq!(check.recomputed_hash, receipt.hash);
/// ```
pub struct RecordRegistry {
    storage: Storage,
    list_limit: usize,
}

impl RecordRegistry {
    /// Opens a registry backed by a database at `path`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Database` if the database cannot be opened.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::with_storage(Storage::open(path)?))
    }

    /// Creates a registry over an in-memory database.
    pub fn temporary() -> Result<Self> {
        Ok(Self::with_storage(Storage::temporary()?))
    }

    /// Creates a registry over an existing storage handle.
    pub fn with_storage(storage: Storage) -> Self {
        RecordRegistry {
            storage,
            list_limit: DEFAULT_LIST_LIMIT,
        }
    }

    /// Sets the maximum number of records [`list`](Self::list) returns.
    pub fn with_list_limit(mut self, limit: usize) -> Self {
        self.list_limit = limit;
        self
    }

    /// The storage handle this registry writes to.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Creates a record stamped with the current time.
    ///
    /// # Errors
    ///
    /// - `RegistryError::Validation` listing every violated constraint
    /// - `RegistryError::AlreadyExists` if the cid is taken
    /// - `RegistryError::Database` / `Serialization` on storage failure
    pub fn create(&self, submission: RecordSubmission) -> Result<Receipt> {
        self.create_at(submission, Utc::now())
    }

    /// Creates a record stamped with the given time.
    ///
    /// The timestamp becomes part of the hashed content and is stored
    /// verbatim, so verification later reproduces the same digest.
    pub fn create_at(&self, submission: RecordSubmission, at: DateTime<Utc>) -> Result<Receipt> {
        let RecordSubmission {
            record,
            claimed_hash,
        } = submission;

        validate(&record)?;

        let timestamp = format_timestamp(at);
        let digest = compute_record_hash(&record, &timestamp);
        let hash_hex = digest.hash.to_string();

        let status = match claimed_hash {
            Some(claimed) if claimed != hash_hex => {
                warn!(
                    "Record {} submitted with a hash that does not match the recomputed one; storing as pending",
                    record.cid()
                );
                RecordStatus::Pending
            }
            _ => RecordStatus::Verified,
        };

        let stored = StoredRecord {
            record,
            timestamp,
            hash: hash_hex,
            status,
        };
        self.storage.insert_record(&stored)?;
        // The record is already committed; a failed parcel update is only logged.
        if let Err(e) = self.touch_land(&stored) {
            warn!(
                "Record {} stored but land parcel could not be updated: {}",
                stored.cid(),
                e
            );
        }

        info!(
            "Record {} ({}) created with hash {}",
            stored.cid(),
            stored.record.kind_name(),
            digest.hash.short()
        );

        Ok(Receipt {
            cid: stored.cid().to_string(),
            hash: digest.hash,
            canonical: digest.canonical,
            timestamp: stored.timestamp,
            status,
        })
    }

    /// Verifies a stored record by content identifier.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if no record has this cid. A hash
    /// mismatch is not an error: it is `Verification { valid: false, .. }`.
    pub fn verify(&self, cid: &str) -> Result<Verification> {
        let stored = self
            .storage
            .load_record(cid)?
            .ok_or_else(|| RegistryError::NotFound(cid.to_string()))?;

        let verification = verify_stored_record(&stored);
        if verification.valid {
            debug!("Record {} verified", cid);
        } else {
            warn!(
                "Record {} failed verification: recomputed {}",
                cid,
                verification.recomputed_hash.short()
            );
        }
        Ok(verification)
    }

    /// Loads a stored record.
    pub fn get(&self, cid: &str) -> Result<Option<StoredRecord>> {
        self.storage.load_record(cid)
    }

    /// Lists records, newest first, optionally for one land parcel.
    ///
    /// Returns at most the configured list limit.
    pub fn list(&self, land_id: Option<&str>) -> Result<Vec<StoredRecord>> {
        let mut records: Vec<StoredRecord> = self
            .storage
            .list_records()?
            .into_iter()
            .filter(|r| land_id.map_or(true, |id| r.record.land_id() == Some(id)))
            .collect();

        records.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| a.cid().cmp(b.cid()))
        });
        records.truncate(self.list_limit);
        Ok(records)
    }

    /// Changes a record's status label. Fields and hash are untouched.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if no record has this cid.
    pub fn set_status(&self, cid: &str, status: RecordStatus) -> Result<StoredRecord> {
        let mut stored = self
            .storage
            .load_record(cid)?
            .ok_or_else(|| RegistryError::NotFound(cid.to_string()))?;

        stored.status = status;
        self.storage.put_record(&stored)?;
        info!("Record {} status set to {}", cid, status);
        Ok(stored)
    }

    /// Verifies `target_cid` and records the outcome as a verification record.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if the target does not exist, and the
    /// errors of [`create`](Self::create) for the attestation itself.
    pub fn attest(
        &self,
        target_cid: &str,
        attestation_cid: &str,
        verifier_id: &str,
    ) -> Result<(Verification, Receipt)> {
        self.attest_at(target_cid, attestation_cid, verifier_id, Utc::now())
    }

    /// Like [`attest`](Self::attest) with an explicit timestamp.
    pub fn attest_at(
        &self,
        target_cid: &str,
        attestation_cid: &str,
        verifier_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(Verification, Receipt)> {
        let verification = self.verify(target_cid)?;

        let attestation = RecordKind::Verification(VerificationAttestation {
            cid: attestation_cid.to_string(),
            target_cid: target_cid.to_string(),
            verifier_id: verifier_id.to_string(),
            valid: verification.valid,
            observed_hash: verification.recomputed_hash.to_string(),
        });

        let receipt = self.create_at(RecordSubmission::new(attestation), at)?;
        Ok((verification, receipt))
    }

    /// Registers (or replaces) a land parcel.
    pub fn register_land(&self, parcel: &LandParcel) -> Result<()> {
        self.storage.store_land(parcel)?;
        info!("Land parcel {} registered", parcel.id);
        Ok(())
    }

    /// Land parcels owned by `owner_id`, sorted by name.
    pub fn land_for_owner(&self, owner_id: &str) -> Result<Vec<LandParcel>> {
        let mut parcels: Vec<LandParcel> = self
            .storage
            .list_land()?
            .into_iter()
            .filter(|p| p.owner_id.as_deref() == Some(owner_id))
            .collect();
        parcels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(parcels)
    }

    /// Every land parcel, sorted by name.
    pub fn all_land(&self) -> Result<Vec<LandParcel>> {
        let mut parcels = self.storage.list_land()?;
        parcels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(parcels)
    }

    /// Advances the parcel a new reading belongs to, if it is registered.
    fn touch_land(&self, stored: &StoredRecord) -> Result<()> {
        let land_id = match stored.record.land_id() {
            Some(id) => id,
            None => return Ok(()),
        };

        let mut parcel = match self.storage.load_land(land_id)? {
            Some(parcel) => parcel,
            None => {
                debug!("Reading {} refers to unregistered land {}", stored.cid(), land_id);
                return Ok(());
            }
        };

        if let RecordKind::SoilReading(r) = &stored.record {
            parcel.current_crop = r.crop_type.clone();
        }
        parcel.last_updated = Some(stored.timestamp.clone());
        parcel.last_cid = Some(stored.cid().to_string());
        self.storage.store_land(&parcel)
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns true if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Flushes pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.storage.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for RecordRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordRegistry")
            .field("records_count", &self.len())
            .field("list_limit", &self.list_limit)
            .finish()
    }
}
