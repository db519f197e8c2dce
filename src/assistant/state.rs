//! Conversation state machine.
//!
//! [`ConversationState`] tells the front end what the engine is doing so it
//! can show a loading indicator and keep input disabled while a completion
//! call is outstanding.

/// States of one extraction conversation.
///
/// ```text
/// Idle ──start──▶ AwaitingUser
///      ──submit──▶ AwaitingBackend ──rate limited──▶ BackingOff ──▶ AwaitingBackend
///                  AwaitingBackend ──reply / error / restart──▶ AwaitingUser
///                  AwaitingBackend ──valid payload──▶ Complete
/// any state ──reset──▶ Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    /// No conversation; `start` has not been called since the last reset.
    #[default]
    Idle,

    /// Greeting or reply shown; waiting for the next user message.
    AwaitingUser,

    /// A completion call is in flight.
    AwaitingBackend,

    /// The backend throttled us; sleeping before the next attempt.
    BackingOff,

    /// A validated draft was handed to the caller.
    Complete,
}

impl ConversationState {
    /// Returns `true` while the engine is waiting on the backend.
    ///
    /// ```
    /// use medication_assistant::assistant::ConversationState;
    ///
    /// assert!(!ConversationState::AwaitingUser.is_busy());
    /// assert!(ConversationState::AwaitingBackend.is_busy());
    /// assert!(ConversationState::BackingOff.is_busy());
    /// ```
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            ConversationState::AwaitingBackend | ConversationState::BackingOff
        )
    }

    /// A short human-readable label for status lines.
    pub fn label(&self) -> &'static str {
        match self {
            ConversationState::Idle => "Idle",
            ConversationState::AwaitingUser => "Your turn",
            ConversationState::AwaitingBackend => "Thinking",
            ConversationState::BackingOff => "Waiting to retry",
            ConversationState::Complete => "Done",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_backend_states_are_busy() {
        assert!(!ConversationState::Idle.is_busy());
        assert!(!ConversationState::AwaitingUser.is_busy());
        assert!(ConversationState::AwaitingBackend.is_busy());
        assert!(ConversationState::BackingOff.is_busy());
        assert!(!ConversationState::Complete.is_busy());
    }

    #[test]
    fn labels() {
        assert_eq!(ConversationState::Idle.label(), "Idle");
        assert_eq!(ConversationState::AwaitingBackend.label(), "Thinking");
        assert_eq!(ConversationState::BackingOff.label(), "Waiting to retry");
        assert_eq!(ConversationState::Complete.label(), "Done");
    }

    #[test]
    fn default_is_idle() {
        assert_eq!(ConversationState::default(), ConversationState::Idle);
    }
}
