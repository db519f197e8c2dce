//! Stored medication record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assistant::{MedicationDraft, TimeOfDay};

/// A medication as persisted for one owner.
///
/// Built from a [`MedicationDraft`] once the assistant finishes; the draft
/// itself carries no owner, timestamp or reminder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationRecord {
    pub owner_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub dosage_unit: String,
    pub frequency: String,
    pub times_per_frequency: u32,
    pub preferred_time: Vec<TimeOfDay>,
    pub remaining_quantity: Option<i64>,
    pub notes: Option<String>,
    pub refill_reminder: bool,
    pub refill_reminder_threshold: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl MedicationRecord {
    pub fn from_draft(owner_id: impl Into<String>, draft: MedicationDraft, created_at: DateTime<Utc>) -> Self {
        let remaining_quantity = draft.remaining_quantity.as_deref().and_then(parse_quantity);
        Self {
            owner_id: owner_id.into(),
            medication_name: draft.medication_name,
            dosage: draft.dosage,
            dosage_unit: draft.dosage_unit,
            frequency: draft.frequency,
            times_per_frequency: draft.times_per_frequency,
            preferred_time: draft.preferred_time,
            remaining_quantity,
            notes: draft.notes,
            refill_reminder: false,
            refill_reminder_threshold: None,
            created_at,
        }
    }

    /// One-line summary, e.g. `Aspirin 500 mg, daily x2 (morning, evening)`.
    pub fn summary(&self) -> String {
        let times = self
            .preferred_time
            .iter()
            .map(TimeOfDay::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "{} {} {}, {} x{} ({})",
            self.medication_name,
            self.dosage,
            self.dosage_unit,
            self.frequency,
            self.times_per_frequency,
            times
        )
    }
}

/// Whole units only; fractions are truncated and non-numbers dropped.
fn parse_quantity(raw: &str) -> Option<i64> {
    let n: f64 = raw.trim().parse().ok()?;
    (n.is_finite() && n >= 0.0 && n <= i64::MAX as f64).then(|| n.trunc() as i64)
}
