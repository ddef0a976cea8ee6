//! # Persistent Storage Layer
//!
//! Sled-backed persistence for records and land parcels. The storage handle is
//! constructed explicitly and passed to the registry; there is no process-wide
//! connection.
//!
//! ## Storage Structure
//!
//! | Tree | Key | Value | Purpose |
//! |------|-----|-------|---------|
//! | `records` | content identifier | JSON `StoredRecord` | Records with their digest |
//! | `land_parcels` | parcel id | JSON `LandParcel` | Parcels readings attach to |
//!
//! Stored documents are plain JSON so that an operator (or a test) can inspect
//! and, for tamper drills, modify them outside the registry.

use crate::models::{LandParcel, RegistryError, Result, StoredRecord};
use std::path::Path;
use tracing::debug;

/// Tree name for stored records.
const RECORD_TREE: &str = "records";

/// Tree name for land parcels.
const LAND_TREE: &str = "land_parcels";

/// Wrapper around a Sled database for record storage.
///
/// Cloning is cheap and clones share the same database. The underlying Sled
/// database is thread-safe.
///
/// # Example
///
/// ```rust
/// use agritrust_registry::storage::Storage;
///
/// let storage = Storage::temporary().unwrap();
/// assert!(storage.load_record("bafy123").unwrap().is_none());
/// ```
#[derive(Clone)]
pub struct Storage {
    db: sled::Db,
    records: sled::Tree,
    land: sled::Tree,
}

impl Storage {
    /// Opens or creates a storage database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Database` if the path is unusable or the
    /// database is corrupted.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())?;
        debug!("Opened record storage at {}", path.as_ref().display());
        Self::from_db(db)
    }

    /// Creates an in-memory storage that is discarded on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let records = db.open_tree(RECORD_TREE)?;
        let land = db.open_tree(LAND_TREE)?;
        Ok(Storage { db, records, land })
    }

    /// Inserts a record only if no record with its cid exists yet.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::AlreadyExists` if the cid is taken.
    pub fn insert_record(&self, record: &StoredRecord) -> Result<()> {
        let key = record.cid().as_bytes();
        let bytes = serde_json::to_vec(record)?;

        match self
            .records
            .compare_and_swap(key, None as Option<&[u8]>, Some(bytes))?
        {
            Ok(()) => Ok(()),
            Err(_) => Err(RegistryError::AlreadyExists(record.cid().to_string())),
        }
    }

    /// Writes a record, overwriting any existing one with the same cid.
    ///
    /// This bypasses the registry entirely: nothing is validated or rehashed.
    pub fn put_record(&self, record: &StoredRecord) -> Result<()> {
        let bytes = serde_json::to_vec(record)?;
        self.records.insert(record.cid().as_bytes(), bytes)?;
        Ok(())
    }

    /// Loads a record by content identifier.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Serialization` if the stored document is not a
    /// valid record.
    pub fn load_record(&self, cid: &str) -> Result<Option<StoredRecord>> {
        match self.records.get(cid.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Loads every stored record in key order.
    pub fn list_records(&self) -> Result<Vec<StoredRecord>> {
        let mut records = Vec::new();
        for entry in self.records.iter() {
            let (_, bytes) = entry?;
            records.push(serde_json::from_slice(&bytes)?);
        }
        Ok(records)
    }

    /// Writes a land parcel, overwriting any existing one with the same id.
    pub fn store_land(&self, parcel: &LandParcel) -> Result<()> {
        let bytes = serde_json::to_vec(parcel)?;
        self.land.insert(parcel.id.as_bytes(), bytes)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn put_raw_land(&self, id: &str, bytes: &[u8]) -> Result<()> {
        self.land.insert(id.as_bytes(), bytes)?;
        Ok(())
    }

    /// Loads a land parcel by id.
    pub fn load_land(&self, id: &str) -> Result<Option<LandParcel>> {
        match self.land.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Loads every land parcel in key order.
    pub fn list_land(&self) -> Result<Vec<LandParcel>> {
        let mut parcels = Vec::new();
        for entry in self.land.iter() {
            let (_, bytes) = entry?;
            parcels.push(serde_json::from_slice(&bytes)?);
        }
        Ok(parcels)
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flushes all pending writes to disk and returns the bytes flushed.
    pub fn flush(&self) -> Result<usize> {
        Ok(self.db.flush()?)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("records_count", &self.len())
            .field("land_count", &self.land.len())
            .finish()
    }
}
