//! Conversational medication extraction.
//!
//! This module provides:
//! * [`ExtractionEngine`] — runs the slot-filling dialogue against a backend.
//! * [`TurnOutcome`] — what each user message produced.
//! * [`MedicationDraft`] / [`TimeOfDay`] — the validated target schema.
//! * [`Transcript`] / [`Turn`] / [`Role`] — the conversation record.
//! * [`RetryPolicy`] — backoff schedule for rate-limited calls.
//! * [`ConversationState`] — busy/idle state for the front end.

pub mod draft;
pub mod engine;
pub mod retry;
pub mod state;
pub mod transcript;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use draft::{extract_payload, DraftError, MedicationDraft, TimeOfDay, COMPLETION_MARKER};
pub use engine::{
    ExtractionEngine, TurnOutcome, CONFIRMATION_MESSAGE, GENERIC_ERROR_MESSAGE, GREETING_MESSAGE,
    HIGH_DEMAND_MESSAGE, RESTART_MESSAGE,
};
pub use retry::RetryPolicy;
pub use state::ConversationState;
pub use transcript::{Role, Transcript, Turn};
