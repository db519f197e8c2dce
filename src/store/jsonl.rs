//! JSON-lines file store.
//!
//! Each record is one JSON object per line, appended on insert. Lines that
//! fail to parse are skipped with a warning rather than failing the listing.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::store::{MedicationRecord, MedicationStore, StoreError};

/// [`MedicationStore`] backed by a `.jsonl` file.
#[derive(Debug, Clone)]
pub struct JsonlStore {
    path: PathBuf,
}

impl JsonlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MedicationStore for JsonlStore {
    fn insert(&self, record: &MedicationRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        log::debug!("stored record in {}", self.path.display());
        Ok(())
    }

    fn list_for_owner(&self, owner_id: &str) -> Result<Vec<MedicationRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;

        let mut records: Vec<MedicationRecord> = data
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(idx, line)| match serde_json::from_str::<MedicationRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("skipping malformed record on line {}: {e}", idx + 1);
                    None
                }
            })
            .filter(|record| record.owner_id == owner_id)
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}
