//! # Canonical JSON and Content Hashing
//!
//! Produces the byte-exact string that record digests are computed over. Two
//! semantically equal records always canonicalize to identical bytes, no matter
//! in which order their fields were inserted.
//!
//! ## Canonical Format
//!
//! This format is part of the wire contract: third parties reproduce hashes
//! from it, so every rule below is fixed.
//!
//! 1. **Null / booleans**: `null`, `true`, `false`
//! 2. **Numbers**: integers in decimal; floats with no fractional part print
//!    as integers (`42.0` → `42`, `-0.0` → `0`); other finite floats use the
//!    shortest round-trip decimal form (`21.5`); non-finite values print `null`
//! 3. **Strings**: double-quoted; `"` and `\` escaped, `\b \f \n \r \t` as
//!    short escapes, other control characters as `\u00xx`; everything else raw
//! 4. **Arrays**: elements in original order, joined by `,`
//! 5. **Objects**: `null` members dropped, keys sorted by UTF-16 code units,
//!    `"key":value` pairs joined by `,`
//! 6. **Whitespace**: none
//!
//! Dropping `null` members is the optional-field policy: an omitted optional
//! field and one explicitly set to `null` hash identically.
//!
//! ## Example
//!
//! ```rust
//! use agritrust_registry::canonicalize::canonicalize;
//! use serde_json::json;
//!
//! let a = canonicalize(&json!({"b": 1, "a": 2, "c": null}));
//! let b = canonicalize(&json!({"a": 2, "b": 1}));
//!
//! assert_eq!(a, b);
//! assert_eq!(a, r#"{"a":2,"b":1}"#);
//! ```

use crate::models::{ContentHash, RecordDigest, RecordKind};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Nesting depth past which values collapse to `null`.
pub const MAX_DEPTH: usize = 128;

/// Canonicalizes a JSON value.
///
/// # Example
///
/// ```rust
/// use agritrust_registry::canonicalize::canonicalize;
/// use serde_json::json;
///
/// let value = json!({
///     "zulu": true,
///     "alpha": [3, 2, 1],
///     "bravo": "test"
/// });
///
/// assert_eq!(canonicalize(&value), r#"{"alpha":[3,2,1],"bravo":"test","zulu":true}"#);
/// ```
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0);
    out
}

/// SHA-256 of a canonical string.
pub fn digest(canonical: &str) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    ContentHash::from_bytes(hasher.finalize().into())
}

/// Builds the document that gets hashed for a record at a given timestamp.
///
/// This is the single definition of each kind's hashed field set; creation
/// and verification both go through it. Soil readings carry no kind tag so
/// their canonical form stays compatible with records hashed before the
/// other kinds existed.
pub fn record_document(record: &RecordKind, timestamp: &str) -> Value {
    match record {
        RecordKind::SoilReading(r) => json!({
            "landId": r.land_id,
            "cropType": r.crop_type,
            "soilMoisture": r.soil_moisture,
            "temperature": r.temperature,
            "phLevel": r.ph_level,
            "humidity": r.humidity,
            "cid": r.cid,
            "producerId": r.producer_id,
            "timestamp": timestamp,
        }),
        RecordKind::WeatherReading(r) => json!({
            "kind": "weather_reading",
            "landId": r.land_id,
            "temperature": r.temperature,
            "humidity": r.humidity,
            "rainfall": r.rainfall,
            "windSpeed": r.wind_speed,
            "cid": r.cid,
            "producerId": r.producer_id,
            "timestamp": timestamp,
        }),
        RecordKind::Verification(r) => json!({
            "kind": "verification",
            "cid": r.cid,
            "targetCid": r.target_cid,
            "verifierId": r.verifier_id,
            "valid": r.valid,
            "observedHash": r.observed_hash,
            "timestamp": timestamp,
        }),
    }
}

/// Computes the digest of a record at a fixed timestamp.
///
/// # Example
///
/// ```rust
/// use agritrust_registry::canonicalize::compute_record_hash;
/// use agritrust_registry::{RecordKind, SoilReading};
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
/// let digest = compute_record_hash(&record, "2024-05-01T10:00:00.000Z");
/// assert!(digest.canonical.starts_with(r#"{"cid":"bafy123","cropType":"Wheat""#));
/// assert_eq!(digest.hash.to_string().len(), 64);
/// ```
pub fn compute_record_hash(record: &RecordKind, timestamp: &str) -> RecordDigest {
    let canonical = canonicalize(&record_document(record, timestamp));
    let hash = digest(&canonical);
    RecordDigest { hash, canonical }
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    if depth > MAX_DEPTH {
        out.push_str("null");
        return;
    }

    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&canonicalize_number(n)),
        Value::String(s) => write_string(out, s),
        Value::Array(arr) => {
            out.push('[');
            for (i, item) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item, depth + 1);
            }
            out.push(']');
        }
        Value::Object(obj) => {
            let mut entries: Vec<(&String, &Value)> =
                obj.iter().filter(|(_, v)| !v.is_null()).collect();
            entries.sort_by(|(a, _), (b, _)| compare_utf16(a, b));

            out.push('{');
            for (i, (k, v)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, k);
                out.push(':');
                write_value(out, v, depth + 1);
            }
            out.push('}');
        }
    }
}

fn canonicalize_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if !f.is_finite() => "null".to_string(),
        // Whole floats print without a fraction so 42.0 and 42 agree.
        Some(f) if f.fract() == 0.0 && f.abs() < (i64::MAX as f64) => (f as i64).to_string(),
        Some(f) => format!("{}", f),
        None => n.to_string(),
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x08' => out.push_str("\\b"),
            '\x0C' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\x20' => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn compare_utf16(a: &str, b: &str) -> std::cmp::Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}
