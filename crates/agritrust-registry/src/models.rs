//! # Core Data Models for the Record Registry
//!
//! This module defines the record schema and the result types that flow through
//! the registry. Records are a tagged sum type: each kind declares its own
//! fields, and the canonical field set of a kind is fixed by its type.
//!
//! ## Threat Model
//!
//! The types in this module help defend against:
//!
//! - **Field-set asymmetry**: The hashed field set is derived from the record
//!   type, so write-time and verify-time hashing cannot disagree.
//! - **Type Confusion**: `ContentHash` keeps digests apart from arbitrary strings.
//! - **Trusted client hashes**: `RecordSubmission` carries a claimed hash only
//!   as an untrusted hint; it is never persisted.

use crate::validation;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// SHA-256 output size in bytes.
pub const HASH_SIZE: usize = 32;

/// Length of a rendered digest (two hex characters per byte).
pub const HASH_HEX_LEN: usize = HASH_SIZE * 2;

/// A 32-byte SHA-256 content digest.
///
/// Renders as 64 lowercase hexadecimal characters, which is also its serde
/// representation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; HASH_SIZE]);

impl ContentHash {
    /// Wraps raw digest bytes.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        ContentHash(bytes)
    }

    /// Returns the 64-character lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short prefix used in log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != HASH_HEX_LEN {
            return Err(RegistryError::InvalidHash(s.to_string()));
        }
        let bytes = hex::decode(s).map_err(|_| RegistryError::InvalidHash(s.to_string()))?;
        let array: [u8; HASH_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| RegistryError::InvalidHash(s.to_string()))?;
        Ok(ContentHash(array))
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A soil reading for a land parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilReading {
    /// Land parcel identifier.
    pub land_id: String,

    /// Crop currently grown on the parcel.
    pub crop_type: String,

    /// Soil moisture percentage.
    pub soil_moisture: f64,

    /// Temperature in degrees Celsius.
    pub temperature: f64,

    /// Soil pH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph_level: Option<f64>,

    /// Relative humidity percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,

    /// Content identifier of the full payload.
    pub cid: String,

    /// Producer (farmer) identifier.
    pub producer_id: String,
}

/// A weather station reading for a land parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    pub land_id: String,
    pub temperature: f64,
    pub humidity: f64,

    /// Rainfall in millimetres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<f64>,

    /// Wind speed in metres per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,

    pub cid: String,
    pub producer_id: String,
}

/// A consumer's attestation about the integrity of another record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationAttestation {
    /// Identifier of this attestation.
    pub cid: String,

    /// Identifier of the record that was checked.
    pub target_cid: String,

    /// Who performed the check.
    pub verifier_id: String,

    /// Outcome of the check.
    pub valid: bool,

    /// Digest recomputed during the check.
    pub observed_hash: String,
}

/// A tamper-evident record, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordKind {
    SoilReading(SoilReading),
    WeatherReading(WeatherReading),
    Verification(VerificationAttestation),
}

impl RecordKind {
    /// The record's content identifier (its storage key).
    pub fn cid(&self) -> &str {
        match self {
            RecordKind::SoilReading(r) => &r.cid,
            RecordKind::WeatherReading(r) => &r.cid,
            RecordKind::Verification(r) => &r.cid,
        }
    }

    /// The land parcel the record belongs to, if any.
    pub fn land_id(&self) -> Option<&str> {
        match self {
            RecordKind::SoilReading(r) => Some(&r.land_id),
            RecordKind::WeatherReading(r) => Some(&r.land_id),
            RecordKind::Verification(_) => None,
        }
    }

    /// Tag name as it appears on the wire.
    pub fn kind_name(&self) -> &'static str {
        match self {
            RecordKind::SoilReading(_) => "soil_reading",
            RecordKind::WeatherReading(_) => "weather_reading",
            RecordKind::Verification(_) => "verification",
        }
    }
}

/// A record as submitted by a caller, before validation.
///
/// Callers may include a `hash` they computed themselves. It is kept only to
/// compare against the server-side digest and is never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSubmission {
    pub record: RecordKind,
    pub claimed_hash: Option<String>,
}

impl RecordSubmission {
    /// Wraps a record with no claimed hash.
    pub fn new(record: RecordKind) -> Self {
        RecordSubmission {
            record,
            claimed_hash: None,
        }
    }

    /// Parses a request body. The `hash` member, if present, becomes the
    /// claimed hash; all other members describe the record. A body without
    /// `kind` is a soil reading.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Validation` listing every missing or mistyped
    /// member, or a `kind` violation when the kind is not recognised.
    pub fn from_json(body: serde_json::Value) -> Result<Self> {
        let mut body = match body {
            serde_json::Value::Object(map) => map,
            _ => {
                return Err(RegistryError::Validation(vec![FieldViolation::new(
                    "payload",
                    "expected a JSON object",
                )]))
            }
        };

        let claimed_hash = match body.remove("hash") {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Null) | None => None,
            Some(_) => {
                return Err(RegistryError::Validation(vec![FieldViolation::new(
                    "hash",
                    "expected a string",
                )]))
            }
        };

        if matches!(body.get("kind"), None | Some(serde_json::Value::Null)) {
            body.insert(
                "kind".to_string(),
                serde_json::Value::String(validation::DEFAULT_KIND.to_string()),
            );
        }
        validation::check_shape(&body)?;

        let record: RecordKind = serde_json::from_value(serde_json::Value::Object(body))
            .map_err(|e| RegistryError::Validation(vec![FieldViolation::new("payload", e.to_string())]))?;

        Ok(RecordSubmission {
            record,
            claimed_hash,
        })
    }
}

/// Caller-controlled trust label persisted with each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Verified,
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Pending => f.write_str("pending"),
            RecordStatus::Verified => f.write_str("verified"),
        }
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RecordStatus::Pending),
            "verified" => Ok(RecordStatus::Verified),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// A record as persisted: fields, fixed timestamp, digest and label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record: RecordKind,

    /// Creation time, stored verbatim as it was hashed.
    pub timestamp: String,

    /// Digest computed at creation, as text.
    pub hash: String,

    pub status: RecordStatus,
}

impl StoredRecord {
    pub fn cid(&self) -> &str {
        self.record.cid()
    }
}

/// Output of the hashing step: the digest and the exact string it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDigest {
    pub hash: ContentHash,
    pub canonical: String,
}

/// Outcome of re-checking a stored record.
///
/// `valid == false` is the designed-for tamper signal, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub valid: bool,
    pub stored_hash: String,
    pub recomputed_hash: ContentHash,

    /// Canonical string the recomputed hash covers, for out-of-band checks.
    pub canonical: String,
}

/// Returned to the submitter after a record is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub cid: String,
    pub hash: ContentHash,
    pub canonical: String,
    pub timestamp: String,
    pub status: RecordStatus,
}

/// A land parcel that readings are attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandParcel {
    pub id: String,
    pub name: String,
    pub current_crop: String,

    #[serde(default)]
    pub owner_id: Option<String>,

    #[serde(default)]
    pub last_updated: Option<String>,

    #[serde(default)]
    pub last_cid: Option<String>,
}

/// One violated input constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldViolation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to open, read or write the database.
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Failed to serialize or deserialize a stored document.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Submitted fields violate the record schema. Lists every violation.
    #[error("Validation failed: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),

    /// No record with this content identifier.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A record with this content identifier already exists.
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    /// A string that should have been a 64-character hex digest.
    #[error("Invalid hash: {0}")]
    InvalidHash(String),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
