//! LLM — provider adapter for the assistant.
//!
//! DESIGN
//! ======
//! `LlmClient` is built once at the composition root from [`LlmConfig`] and
//! shared as `Arc<dyn LlmChat>`. Gemini is the only provider; the trait is
//! the seam tests mock.

pub mod config;
pub mod gemini;
pub mod types;

use config::LlmConfig;
pub use types::LlmChat;
use types::{ChatResponse, LlmError, Message};

// =============================================================================
// CLIENT
// =============================================================================

/// Concrete LLM client bound to one model and one credential.
pub struct LlmClient {
    inner: gemini::GeminiClient,
    model: String,
    max_output_tokens: Option<u32>,
}

impl LlmClient {
    /// Build an LLM client from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a config value is malformed or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_config(LlmConfig::from_env()?)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let inner = gemini::GeminiClient::new(config.api_key, config.api_key_env, config.base_url, config.timeouts)?;
        Ok(Self { inner, model: config.model, max_output_tokens: config.max_output_tokens })
    }

    /// Return the configured model name (e.g. `"gemini-2.0-flash-exp"`).
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl LlmChat for LlmClient {
    async fn generate(&self, system: &str, messages: &[Message]) -> Result<ChatResponse, LlmError> {
        self.inner
            .generate(&self.model, self.max_output_tokens, system, messages)
            .await
    }
}
