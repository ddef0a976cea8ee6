//! The ledger facade.
//!
//! [`Ledger`] owns the storage handle for its whole lifetime: it is opened
//! explicitly at startup and released through [`Ledger::shutdown`]. Hashing
//! and verification themselves are pure and run inline; every storage
//! round-trip runs on tokio's blocking pool under the configured timeout.

use crate::{config::LedgerConfig, error::LedgerError, Result};

use agritrust_registry::storage::Storage;
use agritrust_registry::{
    LandParcel, Receipt, RecordDigest, RecordKind, RecordRegistry, RecordStatus,
    RecordSubmission, StoredRecord, Verification,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The AgriTrust ledger.
///
/// Cheap to share behind an `Arc`; all operations take `&self`.
///
/// # Example
///
/// ```rust,ignore
/// let ledger = Ledger::open(LedgerConfig::load("config/agritrust.toml")?)?;
///
/// let receipt = ledger.submit(body).await?;
/// let check = ledger.verify(&receipt.cid).await?;
/// assert!(check.valid);
///
/// ledger.shutdown().await?;
/// ```
pub struct Ledger {
    /// Configuration.
    config: LedgerConfig,

    /// Registry over the storage handle.
    registry: Arc<RecordRegistry>,
}

impl Ledger {
    /// Opens the storage described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The record database cannot be opened
    pub fn open(config: LedgerConfig) -> Result<Self> {
        config.validate()?;

        let storage = if config.storage.temporary {
            Storage::temporary()?
        } else {
            Storage::open(&config.storage.db_path)?
        };
        let registry = RecordRegistry::with_storage(storage).with_list_limit(config.registry.list_limit);

        info!(
            "Ledger opened ({} records, {} ms storage timeout)",
            registry.len(),
            config.storage.timeout_ms
        );

        Ok(Self {
            config,
            registry: Arc::new(registry),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Direct access to the registry, for synchronous callers and tests.
    pub fn registry(&self) -> &RecordRegistry {
        &self.registry
    }

    /// Hashes a record at a fixed timestamp without touching storage.
    pub fn compute_record_hash(record: &RecordKind, timestamp: &str) -> RecordDigest {
        agritrust_registry::compute_record_hash(record, timestamp)
    }

    /// Re-checks a record the caller already holds, without touching storage.
    pub fn verify_stored_record(stored: &StoredRecord) -> Verification {
        agritrust_registry::verify_stored_record(stored)
    }

    /// Parses a request body and creates the record it describes.
    ///
    /// Any `hash` member in the body is treated as an untrusted claim.
    pub async fn submit(&self, body: serde_json::Value) -> Result<Receipt> {
        let submission = RecordSubmission::from_json(body)?;
        self.create(submission).await
    }

    /// Creates a record.
    pub async fn create(&self, submission: RecordSubmission) -> Result<Receipt> {
        let cid = submission.record.cid().to_string();
        debug!("Creating record {}", cid);
        self.with_storage("create", move |registry| registry.create(submission))
            .await
    }

    /// Verifies a stored record by content identifier.
    pub async fn verify(&self, cid: &str) -> Result<Verification> {
        let cid = cid.to_string();
        self.with_storage("verify", move |registry| registry.verify(&cid))
            .await
    }

    /// Loads a stored record.
    pub async fn get(&self, cid: &str) -> Result<Option<StoredRecord>> {
        let cid = cid.to_string();
        self.with_storage("get", move |registry| registry.get(&cid)).await
    }

    /// Lists records, newest first.
    pub async fn list(&self, land_id: Option<String>) -> Result<Vec<StoredRecord>> {
        self.with_storage("list", move |registry| registry.list(land_id.as_deref()))
            .await
    }

    /// Sets a record's status label.
    pub async fn set_status(&self, cid: &str, status: RecordStatus) -> Result<StoredRecord> {
        let cid = cid.to_string();
        self.with_storage("set_status", move |registry| registry.set_status(&cid, status))
            .await
    }

    /// Verifies a record and persists the outcome as an attestation.
    pub async fn attest(
        &self,
        target_cid: &str,
        attestation_cid: &str,
        verifier_id: &str,
    ) -> Result<(Verification, Receipt)> {
        let (target, cid, verifier) = (
            target_cid.to_string(),
            attestation_cid.to_string(),
            verifier_id.to_string(),
        );
        self.with_storage("attest", move |registry| {
            registry.attest(&target, &cid, &verifier)
        })
        .await
    }

    /// Registers a land parcel.
    pub async fn register_land(&self, parcel: LandParcel) -> Result<()> {
        self.with_storage("register_land", move |registry| registry.register_land(&parcel))
            .await
    }

    /// Land parcels for one owner, or all parcels.
    pub async fn land(&self, owner_id: Option<String>) -> Result<Vec<LandParcel>> {
        self.with_storage("land", move |registry| match owner_id {
            Some(owner) => registry.land_for_owner(&owner),
            None => registry.all_land(),
        })
        .await
    }

    /// Flushes pending writes and releases the storage handle.
    pub async fn shutdown(self) -> Result<()> {
        self.with_storage("flush", |registry| registry.flush()).await?;
        info!("Ledger shut down");
        Ok(())
    }

    /// Runs one storage round-trip on the blocking pool under the timeout.
    async fn with_storage<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&RecordRegistry) -> agritrust_registry::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        run_with_timeout(
            Arc::clone(&self.registry),
            self.config.storage_timeout(),
            op,
            f,
        )
        .await
    }
}

async fn run_with_timeout<T, F>(
    registry: Arc<RecordRegistry>,
    timeout: Duration,
    op: &'static str,
    f: F,
) -> Result<T>
where
    F: FnOnce(&RecordRegistry) -> agritrust_registry::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(move || f(&registry));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result.map_err(LedgerError::from),
        Ok(Err(join_error)) => Err(LedgerError::Internal(format!("{} task failed: {}", op, join_error))),
        Err(_) => {
            let ms = timeout.as_millis() as u64;
            warn!("Storage operation '{}' timed out after {} ms", op, ms);
            Err(LedgerError::StorageTimeout(ms))
        }
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("registry", &self.registry)
            .field("timeout_ms", &self.config.storage.timeout_ms)
            .finish()
    }
}
