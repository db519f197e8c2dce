//! Prompt builder for medication slot-filling.
//!
//! [`PromptBuilder`] pairs the fixed extraction instruction with the running
//! transcript and the sampling settings from [`LlmConfig`] to produce a
//! [`CompletionRequest`].
//!
//! The instruction enumerates every field of the medication schema, the four
//! accepted `preferred_time` values, and the sentinel convention the model
//! must use once all required fields are known.

use crate::assistant::Turn;
use crate::config::LlmConfig;
use crate::llm::backend::CompletionRequest;

// ---------------------------------------------------------------------------
// System instruction
// ---------------------------------------------------------------------------

const SYSTEM_INSTRUCTION: &str = "\
You are a medical assistant helping users add medications to their tracking system.
Collect the following information in a conversational way:
- medication_name (string)
- dosage (string, numbers only)
- dosage_unit (string, e.g., \"mg\", \"ml\")
- frequency (string, e.g., \"daily\", \"weekly\")
- times_per_frequency (number)
- preferred_time (array of strings, must only contain: \"morning\", \"afternoon\", \"evening\", or \"bedtime\"; can be multiple values and should match the frequency; map what the user says onto these values)
- remaining_quantity (optional string)
- notes (optional string)

Guide the user through providing this information one step at a time.
For preferred_time, only accept and return \"morning\", \"afternoon\", \"evening\", or \"bedtime\".
Once all required information is collected, respond with \"MEDICATION_COMPLETE:\" followed by a valid JSON object containing the collected information.

Example format:
MEDICATION_COMPLETE:{\"medication_name\":\"Aspirin\",\"dosage\":\"500\",\"dosage_unit\":\"mg\",\"frequency\":\"daily\",\"times_per_frequency\":2,\"preferred_time\":[\"morning\",\"evening\"],\"remaining_quantity\":\"30\",\"notes\":\"Take with food\"}

Keep responses concise and focused on collecting medication information.";

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds completion requests for the extraction dialogue.
///
/// # Example
/// ```rust
/// use medication_assistant::assistant::Turn;
/// use medication_assistant::config::LlmConfig;
/// use medication_assistant::llm::PromptBuilder;
///
/// let builder = PromptBuilder::from_config(&LlmConfig::default());
/// let request = builder.build(&[Turn::user("I take aspirin")]);
/// assert!(request.system.contains("MEDICATION_COMPLETE:"));
/// assert_eq!(request.messages.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    temperature: f32,
    max_tokens: u32,
}

impl PromptBuilder {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.temperature, config.max_tokens)
    }

    /// The fixed extraction instruction.
    pub fn system_instruction(&self) -> &'static str {
        SYSTEM_INSTRUCTION
    }

    /// Build a request carrying the instruction plus the full transcript.
    pub fn build(&self, transcript: &[Turn]) -> CompletionRequest {
        CompletionRequest {
            system: SYSTEM_INSTRUCTION.to_string(),
            messages: transcript.to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
