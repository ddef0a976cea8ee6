//! Boundary responses.
//!
//! Request handlers sit outside this crate; this module is where ledger
//! results and errors become a status code plus a JSON body. Nothing that
//! reaches this layer is allowed to escape as a panic or an unhandled error.

use crate::{error::LedgerError, ledger::Ledger, Result};

use agritrust_registry::{Receipt, RegistryError, StoredRecord, Verification};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, warn};

/// A status code and JSON body ready to be written to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,

    /// Response body.
    pub body: Value,
}

impl Response {
    /// Create a response.
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 201 for a freshly created record.
    pub fn created(receipt: &Receipt) -> Self {
        Self::new(
            201,
            json!({
                "success": true,
                "cid": receipt.cid,
                "hash": receipt.hash.to_string(),
                "canonical": receipt.canonical,
                "timestamp": receipt.timestamp,
                "status": receipt.status,
            }),
        )
    }

    /// 200 for a completed verification, whatever its outcome.
    pub fn verification(verification: &Verification) -> Self {
        Self::new(
            200,
            json!({
                "ok": verification.valid,
                "storedHash": verification.stored_hash,
                "recomputedHash": verification.recomputed_hash.to_string(),
                "canonical": verification.canonical,
            }),
        )
    }

    /// 200 with a list of stored records flattened for display.
    pub fn records(records: &[StoredRecord]) -> Self {
        let rows: Vec<Value> = records.iter().map(record_row).collect();
        Self::new(200, json!({ "success": true, "records": rows }))
    }

    /// 400 for a verification request without a usable identifier.
    pub fn invalid_cid() -> Self {
        Self::new(400, json!({ "ok": false, "message": "Invalid CID format" }))
    }

    /// Translates an error from a write-side operation.
    pub fn from_create_error(err: &LedgerError) -> Self {
        match err {
            LedgerError::Registry(RegistryError::Validation(violations)) => Self::new(
                400,
                json!({
                    "success": false,
                    "message": "Invalid record payload",
                    "details": violations,
                }),
            ),
            LedgerError::Registry(RegistryError::AlreadyExists(cid)) => Self::new(
                409,
                json!({ "success": false, "message": format!("Record already exists: {}", cid) }),
            ),
            LedgerError::Registry(RegistryError::NotFound(_)) => Self::new(
                404,
                json!({ "success": false, "message": "Record not found" }),
            ),
            other => Self::server_error("success", other),
        }
    }

    /// Translates an error from a verification.
    pub fn from_verify_error(err: &LedgerError) -> Self {
        match err {
            LedgerError::Registry(RegistryError::NotFound(_)) => {
                Self::new(404, json!({ "ok": false, "message": "Record not found" }))
            }
            other => Self::server_error("ok", other),
        }
    }

    fn server_error(flag: &str, err: &LedgerError) -> Self {
        let (status, message) = match err {
            LedgerError::StorageTimeout(_) => (503, "Storage unavailable"),
            _ => (500, "Internal server error"),
        };
        error!("Request failed: {}", err);

        let mut body = json!({ "message": message });
        body[flag] = json!(false);
        Self::new(status, body)
    }
}

fn record_row(stored: &StoredRecord) -> Value {
    let mut row = serde_json::to_value(&stored.record).unwrap_or_else(|_| json!({}));
    row["hash"] = json!(stored.hash);
    row["timestamp"] = json!(stored.timestamp);
    row["status"] = json!(stored.status);
    row
}

/// Handles a record submission end to end.
pub async fn submit(ledger: &Ledger, body: Value) -> Response {
    match ledger.submit(body).await {
        Ok(receipt) => Response::created(&receipt),
        Err(err) => {
            if err.is_validation() {
                warn!("Rejected invalid record payload");
            }
            Response::from_create_error(&err)
        }
    }
}

/// Handles a verification request end to end.
pub async fn verify(ledger: &Ledger, cid: &str) -> Response {
    if cid.trim().is_empty() {
        return Response::invalid_cid();
    }
    match ledger.verify(cid).await {
        Ok(verification) => Response::verification(&verification),
        Err(err) => {
            if err.is_not_found() {
                warn!("Verification requested for unknown record {}", cid);
            }
            Response::from_verify_error(&err)
        }
    }
}

/// Handles a listing request end to end.
pub async fn list(ledger: &Ledger, land_id: Option<String>) -> Response {
    let result: Result<Vec<StoredRecord>> = ledger.list(land_id).await;
    match result {
        Ok(records) => Response::records(&records),
        Err(err) => Response::from_create_error(&err),
    }
}
