//! Sui Indonesia developer assistant.
//!
//! A conversation store that forwards questions to Gemini through a
//! completion client and records the answers.

pub mod llm;
pub mod repl;
pub mod services;

pub use llm::LlmClient;
pub use llm::types::{LlmChat, LlmError, Message, Role};
pub use services::completion::{Completion, CompletionClient};
pub use services::conversation::{ConversationOptions, ConversationStore, RejectReason, SubmitOutcome, SubmitPolicy};
