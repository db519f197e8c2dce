//! Medication draft schema and sentinel payload validation.
//!
//! A completion reply that contains [`COMPLETION_MARKER`] carries a JSON
//! object after the marker. [`MedicationDraft::from_payload`] turns that text
//! into a draft, or explains why it cannot:
//!
//! 1. `preferred_time` is normalised to a list (a bare string becomes a
//!    one-element list).
//! 2. Every `preferred_time` entry must be one of the four [`TimeOfDay`]
//!    values.
//! 3. Every required field must be present and non-empty.
//! 4. `times_per_frequency` is coerced to a positive integer; `dosage` and
//!    `remaining_quantity` must look numeric.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Literal prefix announcing that a structured payload follows.
pub const COMPLETION_MARKER: &str = "MEDICATION_COMPLETE:";

/// Required fields, in the order they are reported when missing.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "medication_name",
    "dosage",
    "dosage_unit",
    "frequency",
    "times_per_frequency",
    "preferred_time",
];

// ---------------------------------------------------------------------------
// DraftError
// ---------------------------------------------------------------------------

/// Why a sentinel payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("malformed medication payload: {0}")]
    Malformed(String),

    #[error(
        "Invalid preferred time values: {}. Must be one of: morning, afternoon, evening, bedtime",
        .0.join(", ")
    )]
    InvalidPreferredTime(Vec<String>),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("{field} is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

// ---------------------------------------------------------------------------
// TimeOfDay
// ---------------------------------------------------------------------------

/// Accepted `preferred_time` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Bedtime,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::Bedtime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Bedtime => "bedtime",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    /// Exact, case-sensitive match after trimming.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TimeOfDay::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

// ---------------------------------------------------------------------------
// MedicationDraft
// ---------------------------------------------------------------------------

/// A complete, validated medication record produced by the assistant.
///
/// Only [`from_payload`](Self::from_payload) constructs one from model output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicationDraft {
    pub medication_name: String,
    pub dosage: String,
    pub dosage_unit: String,
    pub frequency: String,
    pub times_per_frequency: u32,
    /// Non-empty, duplicates removed, in the order the model listed them.
    pub preferred_time: Vec<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_quantity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MedicationDraft {
    /// Parse and validate the text that followed the completion marker.
    pub fn from_payload(payload: &str) -> Result<Self, DraftError> {
        let value: Value = serde_json::from_str(payload.trim())
            .map_err(|e| DraftError::Malformed(e.to_string()))?;
        let Value::Object(obj) = value else {
            return Err(DraftError::Malformed("payload is not a JSON object".into()));
        };

        let preferred = normalize_preferred_time(obj.get("preferred_time"));

        let invalid: Vec<String> = preferred
            .iter()
            .filter(|raw| raw.parse::<TimeOfDay>().is_err())
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(DraftError::InvalidPreferredTime(invalid));
        }

        let medication_name = text_field(&obj, "medication_name")?;
        let dosage = text_field(&obj, "dosage")?;
        let dosage_unit = text_field(&obj, "dosage_unit")?;
        let frequency = text_field(&obj, "frequency")?;
        let times = text_field(&obj, "times_per_frequency")?;

        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .into_iter()
            .filter(|field| match *field {
                "medication_name" => medication_name.is_none(),
                "dosage" => dosage.is_none(),
                "dosage_unit" => dosage_unit.is_none(),
                "frequency" => frequency.is_none(),
                "times_per_frequency" => times.is_none(),
                _ => preferred.is_empty(),
            })
            .collect();
        if !missing.is_empty() {
            return Err(DraftError::MissingFields(missing));
        }

        // All required values were checked above.
        let (
            Some(medication_name),
            Some(dosage),
            Some(dosage_unit),
            Some(frequency),
            Some(times),
        ) = (medication_name, dosage, dosage_unit, frequency, times)
        else {
            return Err(DraftError::Malformed("required field vanished".into()));
        };

        let times_per_frequency = coerce_count("times_per_frequency", &times)?;
        ensure_numeric("dosage", &dosage)?;

        let remaining_quantity = text_field(&obj, "remaining_quantity")?;
        if let Some(quantity) = remaining_quantity.as_deref() {
            ensure_numeric("remaining_quantity", quantity)?;
        }
        let notes = text_field(&obj, "notes")?;

        let mut preferred_time: Vec<TimeOfDay> = Vec::with_capacity(preferred.len());
        for raw in &preferred {
            if let Ok(time) = raw.parse::<TimeOfDay>() {
                if !preferred_time.contains(&time) {
                    preferred_time.push(time);
                }
            }
        }

        Ok(Self {
            medication_name,
            dosage,
            dosage_unit,
            frequency,
            times_per_frequency,
            preferred_time,
            remaining_quantity,
            notes,
        })
    }
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

/// The candidate payload following the first marker in `reply`, if any.
pub fn extract_payload(reply: &str) -> Option<&str> {
    reply
        .find(COMPLETION_MARKER)
        .map(|idx| reply[idx + COMPLETION_MARKER.len()..].trim())
}

/// Wrap a lone value into a list and render every entry as text.
///
/// A blank scalar means the field was not provided. Blank list entries and
/// non-string entries are kept so they are reported as invalid time values.
fn normalize_preferred_time(value: Option<&Value>) -> Vec<String> {
    let items: Vec<&Value> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        })
        .collect()
}

/// Read a scalar field as trimmed text; `None` when absent, null or blank.
fn text_field(obj: &Map<String, Value>, field: &'static str) -> Result<Option<String>, DraftError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(DraftError::Malformed(format!(
            "{field} must be text or a number, got {other}"
        ))),
    }
}

fn is_numeric(value: &str) -> bool {
    value
        .parse::<f64>()
        .is_ok_and(|n| n.is_finite() && n >= 0.0)
}

fn ensure_numeric(field: &'static str, value: &str) -> Result<(), DraftError> {
    if is_numeric(value) {
        Ok(())
    } else {
        Err(DraftError::InvalidNumber {
            field,
            value: value.to_string(),
        })
    }
}

/// Accepts `2`, `2.0` and `"2"`; zero is treated as not provided.
fn coerce_count(field: &'static str, value: &str) -> Result<u32, DraftError> {
    let invalid = || DraftError::InvalidNumber {
        field,
        value: value.to_string(),
    };
    let n: f64 = value.parse().map_err(|_| invalid())?;
    if !n.is_finite() || n.fract() != 0.0 || n < 0.0 || n > f64::from(u32::MAX) {
        return Err(invalid());
    }
    match n as u32 {
        0 => Err(DraftError::MissingFields(vec![field])),
        count => Ok(count),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ASPIRIN: &str = r#"{"medication_name":"Aspirin","dosage":"500","dosage_unit":"mg","frequency":"daily","times_per_frequency":2,"preferred_time":["morning","evening"]}"#;

    fn payload_with(field: &str, value: Value) -> String {
        let mut obj: Map<String, Value> = serde_json::from_str(ASPIRIN).unwrap();
        obj.insert(field.to_string(), value);
        Value::Object(obj).to_string()
    }

    fn payload_without(field: &str) -> String {
        let mut obj: Map<String, Value> = serde_json::from_str(ASPIRIN).unwrap();
        obj.remove(field);
        Value::Object(obj).to_string()
    }

    // ---- extract_payload ---

    #[test]
    fn extract_returns_none_without_marker() {
        assert_eq!(extract_payload("What dosage do you take?"), None);
    }

    #[test]
    fn extract_splits_after_marker() {
        let reply = format!("All set! {COMPLETION_MARKER} {ASPIRIN}\n");
        assert_eq!(extract_payload(&reply), Some(ASPIRIN));
    }

    // ---- happy path ---

    #[test]
    fn valid_payload_parses() {
        let draft = MedicationDraft::from_payload(ASPIRIN).unwrap();
        assert_eq!(draft.medication_name, "Aspirin");
        assert_eq!(draft.dosage, "500");
        assert_eq!(draft.dosage_unit, "mg");
        assert_eq!(draft.frequency, "daily");
        assert_eq!(draft.times_per_frequency, 2);
        assert_eq!(
            draft.preferred_time,
            vec![TimeOfDay::Morning, TimeOfDay::Evening]
        );
        assert_eq!(draft.remaining_quantity, None);
        assert_eq!(draft.notes, None);
    }

    #[test]
    fn optional_fields_are_kept() {
        let payload = r#"{"medication_name":"Aspirin","dosage":"500","dosage_unit":"mg","frequency":"daily","times_per_frequency":2,"preferred_time":["morning","evening"],"remaining_quantity":"30","notes":"Take with food"}"#;
        let draft = MedicationDraft::from_payload(payload).unwrap();
        assert_eq!(draft.remaining_quantity.as_deref(), Some("30"));
        assert_eq!(draft.notes.as_deref(), Some("Take with food"));
    }

    #[test]
    fn scalar_preferred_time_is_wrapped() {
        let draft =
            MedicationDraft::from_payload(&payload_with("preferred_time", "morning".into()))
                .unwrap();
        assert_eq!(draft.preferred_time, vec![TimeOfDay::Morning]);
    }

    #[test]
    fn numeric_strings_and_numbers_are_coerced() {
        let draft =
            MedicationDraft::from_payload(&payload_with("times_per_frequency", "3".into()))
                .unwrap();
        assert_eq!(draft.times_per_frequency, 3);

        let draft =
            MedicationDraft::from_payload(&payload_with("dosage", serde_json::json!(250)))
                .unwrap();
        assert_eq!(draft.dosage, "250");
    }

    #[test]
    fn duplicate_times_are_collapsed() {
        let draft = MedicationDraft::from_payload(&payload_with(
            "preferred_time",
            serde_json::json!(["bedtime", "morning", "bedtime"]),
        ))
        .unwrap();
        assert_eq!(
            draft.preferred_time,
            vec![TimeOfDay::Bedtime, TimeOfDay::Morning]
        );
    }

    // ---- rejections ---

    #[test]
    fn unknown_time_is_rejected_by_name() {
        let err = MedicationDraft::from_payload(&payload_with(
            "preferred_time",
            serde_json::json!(["noon", "morning", "midnight"]),
        ))
        .unwrap_err();
        assert_eq!(
            err,
            DraftError::InvalidPreferredTime(vec!["noon".into(), "midnight".into()])
        );
        assert!(err.to_string().contains("noon, midnight"));
    }

    #[test]
    fn time_matching_is_case_sensitive() {
        let err =
            MedicationDraft::from_payload(&payload_with("preferred_time", "Morning".into()))
                .unwrap_err();
        assert_eq!(err, DraftError::InvalidPreferredTime(vec!["Morning".into()]));
    }

    #[test]
    fn missing_field_is_named() {
        let err = MedicationDraft::from_payload(&payload_without("dosage_unit")).unwrap_err();
        assert_eq!(err, DraftError::MissingFields(vec!["dosage_unit"]));
        assert_eq!(err.to_string(), "Missing required fields: dosage_unit");
    }

    #[test]
    fn blank_and_empty_values_count_as_missing() {
        let err = MedicationDraft::from_payload(&payload_with("medication_name", "  ".into()))
            .unwrap_err();
        assert_eq!(err, DraftError::MissingFields(vec!["medication_name"]));

        let err = MedicationDraft::from_payload(&payload_with(
            "preferred_time",
            serde_json::json!([]),
        ))
        .unwrap_err();
        assert_eq!(err, DraftError::MissingFields(vec!["preferred_time"]));
    }

    #[test]
    fn blank_time_entries_are_invalid() {
        let err = MedicationDraft::from_payload(&payload_with(
            "preferred_time",
            serde_json::json!(["morning", ""]),
        ))
        .unwrap_err();
        assert_eq!(err, DraftError::InvalidPreferredTime(vec![String::new()]));

        let err = MedicationDraft::from_payload(&payload_with(
            "preferred_time",
            serde_json::json!(["  "]),
        ))
        .unwrap_err();
        assert_eq!(err, DraftError::InvalidPreferredTime(vec![String::new()]));
    }

    #[test]
    fn blank_scalar_time_counts_as_missing() {
        let err = MedicationDraft::from_payload(&payload_with("preferred_time", "".into()))
            .unwrap_err();
        assert_eq!(err, DraftError::MissingFields(vec!["preferred_time"]));
    }

    #[test]
    fn all_missing_fields_are_reported() {
        let err = MedicationDraft::from_payload(r#"{"notes":"x"}"#).unwrap_err();
        assert_eq!(err, DraftError::MissingFields(REQUIRED_FIELDS.to_vec()));
    }

    #[test]
    fn non_numeric_count_is_rejected() {
        let err = MedicationDraft::from_payload(&payload_with(
            "times_per_frequency",
            "twice".into(),
        ))
        .unwrap_err();
        assert!(matches!(
            err,
            DraftError::InvalidNumber { field: "times_per_frequency", .. }
        ));

        let err = MedicationDraft::from_payload(&payload_with(
            "times_per_frequency",
            serde_json::json!(1.5),
        ))
        .unwrap_err();
        assert!(matches!(err, DraftError::InvalidNumber { .. }));
    }

    #[test]
    fn zero_count_counts_as_missing() {
        let err = MedicationDraft::from_payload(&payload_with(
            "times_per_frequency",
            serde_json::json!(0),
        ))
        .unwrap_err();
        assert_eq!(err, DraftError::MissingFields(vec!["times_per_frequency"]));
    }

    #[test]
    fn non_numeric_dosage_and_quantity_are_rejected() {
        let err = MedicationDraft::from_payload(&payload_with("dosage", "five hundred".into()))
            .unwrap_err();
        assert!(matches!(err, DraftError::InvalidNumber { field: "dosage", .. }));

        let err =
            MedicationDraft::from_payload(&payload_with("remaining_quantity", "lots".into()))
                .unwrap_err();
        assert!(matches!(
            err,
            DraftError::InvalidNumber { field: "remaining_quantity", .. }
        ));
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            MedicationDraft::from_payload("{\"medication_name\": "),
            Err(DraftError::Malformed(_))
        ));
        assert!(matches!(
            MedicationDraft::from_payload("[1, 2]"),
            Err(DraftError::Malformed(_))
        ));
        assert!(matches!(
            MedicationDraft::from_payload(""),
            Err(DraftError::Malformed(_))
        ));
    }

    #[test]
    fn draft_serialises_with_schema_field_names() {
        let draft = MedicationDraft::from_payload(ASPIRIN).unwrap();
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["preferred_time"], serde_json::json!(["morning", "evening"]));
        assert_eq!(json["times_per_frequency"], serde_json::json!(2));
        assert!(json.get("notes").is_none());
    }
}
