//! LLM configuration parsed from environment variables.

use super::types::LlmError;

pub const DEFAULT_API_KEY_ENV: &str = "DOCUSAURUS_GEMINI_API_KEY";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_LLM_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_LLM_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlmTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for LlmTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_LLM_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_LLM_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmConfig {
    /// Name of the env var the key was read from. Kept for error messages.
    pub api_key_env: String,
    /// `None` when the env var is unset or empty. The client is still built;
    /// every call then fails with [`LlmError::MissingApiKey`].
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_output_tokens: Option<u32>,
    pub timeouts: LlmTimeouts,
}

impl LlmConfig {
    /// Build typed LLM config from environment variables.
    ///
    /// All optional:
    /// - `LLM_API_KEY_ENV`: names the env var holding the key
    ///   (default `DOCUSAURUS_GEMINI_API_KEY`)
    /// - `LLM_MODEL`: default `gemini-2.0-flash-exp`
    /// - `LLM_BASE_URL`: default Gemini v1beta endpoint
    /// - `LLM_MAX_OUTPUT_TOKENS`: unset means provider default
    /// - `LLM_REQUEST_TIMEOUT_SECS`: default 120
    /// - `LLM_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigParse`] if a numeric variable is not a number.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LlmConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigParse`] if a numeric variable is not a number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LlmError> {
        let api_key_env = lookup("LLM_API_KEY_ENV")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let api_key = lookup(api_key_env.as_str())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let model = lookup("LLM_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        let base_url = lookup("LLM_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let max_output_tokens = parse_opt(&lookup, "LLM_MAX_OUTPUT_TOKENS")?;
        let timeouts = LlmTimeouts {
            request_secs: parse_opt(&lookup, "LLM_REQUEST_TIMEOUT_SECS")?.unwrap_or(DEFAULT_LLM_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_opt(&lookup, "LLM_CONNECT_TIMEOUT_SECS")?.unwrap_or(DEFAULT_LLM_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_key_env, api_key, model, base_url, max_output_tokens, timeouts })
    }

    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn parse_opt<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, LlmError>
where
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| LlmError::ConfigParse(format!("invalid {key}: {raw}"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
