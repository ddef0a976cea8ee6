//! # Submission Validation
//!
//! Checks a record against its schema before anything is hashed. Every
//! violated constraint is collected so the caller can fix them all in one
//! resubmission.
//!
//! ## Constraints
//!
//! | Field | Rule |
//! |-------|------|
//! | `landId`, `cropType`, `producerId`, `verifierId` | non-empty |
//! | `cid`, `targetCid` | at least 3 characters |
//! | `soilMoisture`, `humidity` | 0 to 100 |
//! | `temperature` | -100 to 100 |
//! | `phLevel` | 0 to 14 |
//! | `rainfall`, `windSpeed` | 0 or more |
//! | `observedHash` | 64 hex characters |
//!
//! Every number must also be finite. Before a body is decoded at all,
//! [`check_shape`] reports missing members and members of the wrong JSON type,
//! again collecting every one.

use crate::models::{
    ContentHash, FieldViolation, RecordKind, RegistryError, Result, SoilReading,
    VerificationAttestation, WeatherReading,
};
use serde_json::{Map, Value};

/// Minimum length of a content identifier.
pub const MIN_CID_LEN: usize = 3;

/// Record kind assumed when a body carries no `kind` member.
pub const DEFAULT_KIND: &str = "soil_reading";

#[derive(Debug, Clone, Copy)]
enum Shape {
    Text,
    Number,
    Flag,
}

impl Shape {
    fn matches(self, value: &Value) -> bool {
        match self {
            Shape::Text => value.is_string(),
            Shape::Number => value.is_number(),
            Shape::Flag => value.is_boolean(),
        }
    }

    fn expected(self) -> &'static str {
        match self {
            Shape::Text => "expected a string",
            Shape::Number => "expected a number",
            Shape::Flag => "expected a boolean",
        }
    }
}

/// (member, JSON type, required)
type Member = (&'static str, Shape, bool);

const SOIL_MEMBERS: &[Member] = &[
    ("landId", Shape::Text, true),
    ("cropType", Shape::Text, true),
    ("soilMoisture", Shape::Number, true),
    ("temperature", Shape::Number, true),
    ("phLevel", Shape::Number, false),
    ("humidity", Shape::Number, false),
    ("cid", Shape::Text, true),
    ("producerId", Shape::Text, true),
];

const WEATHER_MEMBERS: &[Member] = &[
    ("landId", Shape::Text, true),
    ("temperature", Shape::Number, true),
    ("humidity", Shape::Number, true),
    ("rainfall", Shape::Number, false),
    ("windSpeed", Shape::Number, false),
    ("cid", Shape::Text, true),
    ("producerId", Shape::Text, true),
];

const VERIFICATION_MEMBERS: &[Member] = &[
    ("cid", Shape::Text, true),
    ("targetCid", Shape::Text, true),
    ("verifierId", Shape::Text, true),
    ("valid", Shape::Flag, true),
    ("observedHash", Shape::Text, true),
];

/// Checks that a submitted body has every required member with the right
/// JSON type for its `kind`. `null` counts as absent.
///
/// # Errors
///
/// Returns `RegistryError::Validation` listing every missing or mistyped
/// member, or a single `kind` violation when the kind is not recognised.
pub fn check_shape(body: &Map<String, Value>) -> Result<()> {
    let mut checks = Checks::default();

    let members = match body.get("kind").and_then(Value::as_str) {
        Some("soil_reading") => SOIL_MEMBERS,
        Some("weather_reading") => WEATHER_MEMBERS,
        Some("verification") => VERIFICATION_MEMBERS,
        _ => {
            checks.fail("kind", "must be one of soil_reading, weather_reading, verification");
            return checks.finish();
        }
    };

    for &(field, shape, required) in members {
        checks.member(field, body.get(field), shape, required);
    }
    checks.finish()
}

/// Validates a record, returning every violation found.
///
/// # Errors
///
/// Returns `RegistryError::Validation` listing all violations.
///
/// # Example
///
/// ```rust
/// use agritrust_registry::validation::validate;
/// use agritrust_registry::{RecordKind, RegistryError, SoilReading};
///
/// let record = RecordKind::SoilReading(SoilReading {
///     land_id: "".into(),
///     crop_type: "Wheat".into(),
///     soil_moisture: 140.0,
///     temperature: 21.0,
///     ph_level: Some(15.0),
///     humidity: None,
///     cid: "bafy123".into(),
///     producer_id: "P1".into(),
/// });
///
/// match validate(&record) {
///     Err(RegistryError::Validation(violations)) => assert_eq!(violations.len(), 3),
///     _ => unreachable!(),
/// }
/// ```
pub fn validate(record: &RecordKind) -> Result<()> {
    let mut checks = Checks::default();

    match record {
        RecordKind::SoilReading(r) => check_soil(&mut checks, r),
        RecordKind::WeatherReading(r) => check_weather(&mut checks, r),
        RecordKind::Verification(r) => check_verification(&mut checks, r),
    }

    checks.finish()
}

fn check_soil(c: &mut Checks, r: &SoilReading) {
    c.non_empty("landId", &r.land_id);
    c.non_empty("cropType", &r.crop_type);
    c.range("soilMoisture", r.soil_moisture, 0.0, 100.0);
    c.range("temperature", r.temperature, -100.0, 100.0);
    if let Some(ph) = r.ph_level {
        c.range("phLevel", ph, 0.0, 14.0);
    }
    if let Some(humidity) = r.humidity {
        c.range("humidity", humidity, 0.0, 100.0);
    }
    c.min_len("cid", &r.cid, MIN_CID_LEN);
    c.non_empty("producerId", &r.producer_id);
}

fn check_weather(c: &mut Checks, r: &WeatherReading) {
    c.non_empty("landId", &r.land_id);
    c.range("temperature", r.temperature, -100.0, 100.0);
    c.range("humidity", r.humidity, 0.0, 100.0);
    if let Some(rain) = r.rainfall {
        c.non_negative("rainfall", rain);
    }
    if let Some(wind) = r.wind_speed {
        c.non_negative("windSpeed", wind);
    }
    c.min_len("cid", &r.cid, MIN_CID_LEN);
    c.non_empty("producerId", &r.producer_id);
}

fn check_verification(c: &mut Checks, r: &VerificationAttestation) {
    c.min_len("cid", &r.cid, MIN_CID_LEN);
    c.min_len("targetCid", &r.target_cid, MIN_CID_LEN);
    c.non_empty("verifierId", &r.verifier_id);
    if r.observed_hash.parse::<ContentHash>().is_err() {
        c.fail("observedHash", "must be 64 hexadecimal characters");
    }
}

#[derive(Default)]
struct Checks {
    violations: Vec<FieldViolation>,
}

impl Checks {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.violations.push(FieldViolation::new(field, message));
    }

    fn member(&mut self, field: &str, value: Option<&Value>, shape: Shape, required: bool) {
        match value {
            None | Some(Value::Null) => {
                if required {
                    self.fail(field, "is required");
                }
            }
            Some(v) if !shape.matches(v) => self.fail(field, shape.expected()),
            Some(_) => {}
        }
    }

    fn non_empty(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.fail(field, "must not be empty");
        }
    }

    fn min_len(&mut self, field: &str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.fail(field, format!("must be at least {} characters", min));
        }
    }

    fn range(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() {
            self.fail(field, "must be a finite number");
        } else if value < min || value > max {
            self.fail(field, format!("must be between {} and {}", min, max));
        }
    }

    fn non_negative(&mut self, field: &str, value: f64) {
        if !value.is_finite() {
            self.fail(field, "must be a finite number");
        } else if value < 0.0 {
            self.fail(field, "must not be negative");
        }
    }

    fn finish(self) -> Result<()> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(RegistryError::Validation(self.violations))
        }
    }
}
