//! Dialogue extraction engine.
//!
//! [`ExtractionEngine`] owns one conversation: the running [`Transcript`],
//! the retry policy, and the [`ConversationState`] the front end watches.
//!
//! # Turn flow
//!
//! ```text
//! submit_user_message(text)
//!   └─▶ append user turn
//!   └─▶ backend.complete(system + transcript)      [AwaitingBackend]
//!         ├─ rate limited, budget left → sleep      [BackingOff] → retry
//!         ├─ rate limited, budget spent → "high demand" turn     → Error
//!         ├─ other failure              → generic error turn     → Error
//!         └─ reply
//!              ├─ no marker          → append reply              → Continue
//!              ├─ marker, invalid    → clear, restart turn       → Continue
//!              └─ marker, valid      → confirmation turn         → Complete
//! ```
//!
//! Backend and validation failures never escape as `Err`; they become
//! assistant turns and a [`TurnOutcome`].

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::assistant::draft::{extract_payload, MedicationDraft};
use crate::assistant::retry::RetryPolicy;
use crate::assistant::state::ConversationState;
use crate::assistant::transcript::{Transcript, Turn};
use crate::config::AppConfig;
use crate::llm::{BackendError, CompletionBackend, PromptBuilder};

// ---------------------------------------------------------------------------
// Scripted assistant turns
// ---------------------------------------------------------------------------

pub const GREETING_MESSAGE: &str =
    "Hello! I'm your medication assistant. What medication would you like to add?";

pub const CONFIRMATION_MESSAGE: &str = "Great! I'll add this medication to your list.";

pub const RESTART_MESSAGE: &str = "I encountered an error processing the medication details. \
Let's try again from the beginning. What medication would you like to add?";

pub const GENERIC_ERROR_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

pub const HIGH_DEMAND_MESSAGE: &str =
    "We're experiencing high demand. Please try again in a few minutes.";

// ---------------------------------------------------------------------------
// TurnOutcome
// ---------------------------------------------------------------------------

/// Result of one [`ExtractionEngine::submit_user_message`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The assistant replied (or restarted); wait for the next user message.
    Continue { reply: String },
    /// The conversation produced a validated draft.
    Complete { draft: MedicationDraft },
    /// The backend failed; the transcript is kept so the user can resend.
    Error { message: String },
    /// Blank input; nothing happened.
    Ignored,
    /// The cancellation token fired before the call finished.
    Cancelled,
}

enum ExchangeFailure {
    Backend(BackendError),
    Cancelled,
}

// ---------------------------------------------------------------------------
// ExtractionEngine
// ---------------------------------------------------------------------------

/// Drives a slot-filling conversation against a [`CompletionBackend`].
///
/// Turns are serialised by `&mut self`: a second message cannot be submitted
/// while one is still in flight.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use medication_assistant::assistant::{ExtractionEngine, TurnOutcome};
/// use medication_assistant::config::AppConfig;
/// use medication_assistant::llm::ApiBackend;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let backend = Arc::new(ApiBackend::from_config(&config.llm));
/// let mut engine = ExtractionEngine::from_config(backend, &config);
///
/// engine.start();
/// match engine.submit_user_message("Aspirin 500 mg twice a day").await {
///     TurnOutcome::Continue { reply } => println!("{reply}"),
///     TurnOutcome::Complete { draft } => println!("{draft:?}"),
///     other => println!("{other:?}"),
/// }
/// # }
/// ```
pub struct ExtractionEngine {
    backend: Arc<dyn CompletionBackend>,
    prompt: PromptBuilder,
    retry: RetryPolicy,
    transcript: Transcript,
    state: watch::Sender<ConversationState>,
    cancel: CancellationToken,
}

impl ExtractionEngine {
    pub fn new(backend: Arc<dyn CompletionBackend>, prompt: PromptBuilder, retry: RetryPolicy) -> Self {
        let (state, _) = watch::channel(ConversationState::Idle);
        Self {
            backend,
            prompt,
            retry,
            transcript: Transcript::new(),
            state,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(backend: Arc<dyn CompletionBackend>, config: &AppConfig) -> Self {
        Self::new(
            backend,
            PromptBuilder::from_config(&config.llm),
            RetryPolicy::from_config(&config.retry),
        )
    }

    /// Use `token` to abandon in-flight calls.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Replace the cancellation token, e.g. with a fresh one per turn.
    pub fn set_cancellation(&mut self, token: CancellationToken) {
        self.cancel = token;
    }

    // -----------------------------------------------------------------------
    // Conversation control
    // -----------------------------------------------------------------------

    /// Begin a new conversation with the greeting turn. Any previous
    /// transcript is discarded.
    pub fn start(&mut self) {
        self.transcript.clear();
        self.transcript.push(Turn::assistant(GREETING_MESSAGE));
        self.set_state(ConversationState::AwaitingUser);
    }

    /// Drop the transcript; call [`start`](Self::start) to resume.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.set_state(ConversationState::Idle);
    }

    /// Append a user turn and run one backend exchange.
    ///
    /// Once the cancellation token has fired, further messages are dropped
    /// without touching the transcript until a fresh token is installed.
    pub async fn submit_user_message(&mut self, text: &str) -> TurnOutcome {
        if text.trim().is_empty() {
            log::debug!("ignoring blank user message");
            return TurnOutcome::Ignored;
        }
        if self.cancel.is_cancelled() {
            log::debug!("cancellation token already fired; message dropped");
            return TurnOutcome::Cancelled;
        }

        self.transcript.push(Turn::user(text));
        log::debug!(
            "user turn appended (len={}, turns={})",
            text.len(),
            self.transcript.len()
        );

        let cancel = self.cancel.clone();
        match self.exchange(&cancel).await {
            Ok(reply) => self.handle_reply(reply),
            Err(ExchangeFailure::Cancelled) => {
                log::info!("completion call cancelled");
                self.set_state(ConversationState::AwaitingUser);
                TurnOutcome::Cancelled
            }
            Err(ExchangeFailure::Backend(err)) => {
                log::error!("completion failed: {err}");
                let message = if err.is_rate_limited() {
                    HIGH_DEMAND_MESSAGE
                } else {
                    GENERIC_ERROR_MESSAGE
                };
                self.transcript.push(Turn::assistant(message));
                self.set_state(ConversationState::AwaitingUser);
                TurnOutcome::Error {
                    message: message.to_string(),
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn state(&self) -> ConversationState {
        *self.state.borrow()
    }

    /// Watch state changes from another task (e.g. a loading indicator).
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.state.subscribe()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Send the transcript, retrying rate limits with exponential backoff.
    async fn exchange(&self, cancel: &CancellationToken) -> Result<String, ExchangeFailure> {
        let request = self.prompt.build(self.transcript.turns());
        let mut retry = 0u32;

        loop {
            self.set_state(ConversationState::AwaitingBackend);
            log::debug!("completion attempt {}", retry + 1);

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ExchangeFailure::Cancelled),
                result = self.backend.complete(&request) => result,
            };

            let err = match result {
                Ok(reply) => return Ok(reply),
                Err(err) => err,
            };
            if !err.is_rate_limited() {
                return Err(ExchangeFailure::Backend(err));
            }
            let Some(delay) = self.retry.delay_for(retry) else {
                return Err(ExchangeFailure::Backend(err));
            };

            retry += 1;
            log::warn!("rate limited; retry {retry} in {delay:?}");
            self.set_state(ConversationState::BackingOff);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ExchangeFailure::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn handle_reply(&mut self, reply: String) -> TurnOutcome {
        let Some(payload) = extract_payload(&reply) else {
            self.transcript.push(Turn::assistant(reply.clone()));
            self.set_state(ConversationState::AwaitingUser);
            return TurnOutcome::Continue { reply };
        };

        match MedicationDraft::from_payload(payload) {
            Ok(draft) => {
                log::info!("medication draft complete: {}", draft.medication_name);
                self.transcript.push(Turn::assistant(CONFIRMATION_MESSAGE));
                self.set_state(ConversationState::Complete);
                TurnOutcome::Complete { draft }
            }
            Err(err) => {
                // Never repair a bad payload; restart the whole conversation.
                log::warn!("rejected medication payload: {err}");
                self.transcript.clear();
                self.transcript.push(Turn::assistant(RESTART_MESSAGE));
                self.set_state(ConversationState::AwaitingUser);
                TurnOutcome::Continue {
                    reply: RESTART_MESSAGE.to_string(),
                }
            }
        }
    }

    fn set_state(&self, state: ConversationState) {
        self.state.send_replace(state);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
