//! Persistence for finished medication records.
//!
//! The assistant hands back a [`MedicationDraft`](crate::assistant::MedicationDraft);
//! the caller turns it into a [`MedicationRecord`] and inserts it through a
//! [`MedicationStore`]. The engine itself never touches storage.

pub mod jsonl;
pub mod record;

use thiserror::Error;

pub use jsonl::JsonlStore;
pub use record::MedicationRecord;

/// Errors raised by a [`MedicationStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Insert/query interface for stored medications, keyed by owner.
pub trait MedicationStore: Send + Sync {
    fn insert(&self, record: &MedicationRecord) -> Result<(), StoreError>;

    /// Records belonging to `owner_id`, newest first.
    fn list_for_owner(&self, owner_id: &str) -> Result<Vec<MedicationRecord>, StoreError>;
}
