//! Completion client — prompt → reply text, never an error.
//!
//! DESIGN
//! ======
//! Wraps one `LlmChat::generate` call with the assistant persona. Failures
//! are folded into [`Completion`] so the conversation always gets a model
//! turn, but the cause stays typed for callers and logs.

use std::sync::Arc;

use tracing::{info, warn};

use crate::llm::LlmChat;
use crate::llm::types::{LlmError, Message};

/// Shown when the service answered without any text.
pub const UNABLE_TO_PROCESS: &str = "Maaf, saya tidak dapat memproses permintaan Anda saat ini.";

/// Shown when the service could not be reached or rejected the call.
pub const SERVICE_ERROR: &str =
    "Terjadi kesalahan saat menghubungi AI. Pastikan API Key dikonfigurasi dengan benar.";

pub const SYSTEM_INSTRUCTION: &str = "\
You are an expert developer advocate for the Sui Blockchain, specifically focusing on the Indonesian developer community (Sui Indonesia).
Your goal is to help developers understand Sui, the Move programming language, and web3 concepts.

Key Traits:
- Technical, precise, yet accessible.
- Use analogies relevant to blockchain development.
- If the user asks in Indonesian, reply in Indonesian. If in English, reply in English.
- Encourage best practices in Move.
- Keep answers concise and strictly related to Sui/Move development.

Formatting:
- Use Markdown for code blocks.
- Keep paragraphs short.";

// =============================================================================
// TYPES
// =============================================================================

/// Settled result of one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The service produced text.
    Reply { text: String },
    /// The service answered but with no usable text.
    Unavailable,
    /// The call failed; `error` says why.
    Failed { error: LlmError },
}

impl Completion {
    /// Text to display as the model turn.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Reply { text } => text,
            Self::Unavailable => UNABLE_TO_PROCESS,
            Self::Failed { .. } => SERVICE_ERROR,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::Reply { .. })
    }

    #[must_use]
    pub fn error(&self) -> Option<&LlmError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone)]
pub struct CompletionClient {
    llm: Arc<dyn LlmChat>,
    system: String,
}

impl CompletionClient {
    /// Client using the Sui developer-advocate persona.
    #[must_use]
    pub fn new(llm: Arc<dyn LlmChat>) -> Self {
        Self::with_system(llm, SYSTEM_INSTRUCTION)
    }

    #[must_use]
    pub fn with_system(llm: Arc<dyn LlmChat>, system: impl Into<String>) -> Self {
        Self { llm, system: system.into() }
    }

    /// Ask the service about `prompt`. Only the latest prompt is sent; earlier
    /// turns are not replayed.
    pub async fn complete(&self, prompt: &str) -> Completion {
        let messages = [Message::user(prompt)];
        match self.llm.generate(&self.system, &messages).await {
            Ok(response) => match response.text {
                Some(text) if !text.is_empty() => {
                    info!(
                        model = %response.model,
                        input_tokens = response.input_tokens,
                        output_tokens = response.output_tokens,
                        "completion: reply received"
                    );
                    Completion::Reply { text }
                }
                _ => {
                    warn!(
                        model = %response.model,
                        finish_reason = response.finish_reason.as_deref().unwrap_or("-"),
                        block_reason = response.block_reason.as_deref().unwrap_or("-"),
                        "completion: response carried no text"
                    );
                    Completion::Unavailable
                }
            },
            Err(error) => {
                warn!(
                    error = %error,
                    code = error.error_code(),
                    retryable = error.retryable(),
                    "completion: service call failed"
                );
                Completion::Failed { error }
            }
        }
    }
}

#[cfg(test)]
#[path = "completion_test.rs"]
mod tests;
