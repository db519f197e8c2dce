//! Conversational medication entry.
//!
//! A user describes a medication in free-form chat; the [`assistant`] engine
//! drives a completion backend ([`llm`]) until the model emits a complete,
//! validated [`MedicationDraft`](assistant::MedicationDraft), which the caller
//! can persist through [`store`].

pub mod assistant;
pub mod config;
pub mod llm;
pub mod store;
