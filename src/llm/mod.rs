//! Completion backend module for the medication assistant.
//!
//! This module provides:
//! * [`CompletionBackend`] — async trait implemented by all backends.
//! * [`ApiBackend`] — OpenAI-compatible REST API backend.
//! * [`FallbackBackend`] — wraps any backend; replaces empty replies.
//! * [`PromptBuilder`] — pairs the extraction instruction with a transcript.
//! * [`BackendError`] — error variants, including the retryable rate limit.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use medication_assistant::assistant::Turn;
//! use medication_assistant::config::AppConfig;
//! use medication_assistant::llm::{ApiBackend, CompletionBackend, FallbackBackend, PromptBuilder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let backend = FallbackBackend::new(ApiBackend::from_config(&config.llm));
//!
//!     let request = PromptBuilder::from_config(&config.llm)
//!         .build(&[Turn::user("I need to add metformin")]);
//!     let reply = backend.complete(&request).await.unwrap();
//!     println!("{reply}");
//! }
//! ```

pub mod backend;
pub mod fallback;
pub mod prompt;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use backend::{ApiBackend, BackendError, CompletionBackend, CompletionRequest};
pub use fallback::{FallbackBackend, EMPTY_REPLY_FALLBACK};
pub use prompt::PromptBuilder;
