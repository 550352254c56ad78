//! Provider selection and connection configuration.
//!
//! Three providers are supported.  When none is pinned explicitly, the
//! active one is auto-detected from key availability in the order
//! Anthropic > OpenAI > Ollama (Ollama needs no key and is always last).

use std::fmt;
use std::str::FromStr;

use crate::error::{LlmError, Result};

/// Default Anthropic API base URL.
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Default OpenAI API base URL.
const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Default local Ollama endpoint.
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// An LLM vendor with its own tool-use wire convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Anthropic Messages API: separate system parameter, typed content
    /// blocks, tool results echoed back by id in user messages.
    Anthropic,
    /// OpenAI Chat Completions: system message prepended, parallel
    /// `tool_calls` array with ids, JSON-string arguments on echo.
    OpenAi,
    /// Ollama `/api/chat`: system message prepended, `tool_calls` without
    /// ids, tool results appended in order.
    Ollama,
}

impl Provider {
    /// The lowercase identifier used in configuration and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(LlmError::NotConfigured {
                reason: format!("unknown provider `{other}`"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection configuration for the provider layer.
///
/// Every field has a sensible default; [`LlmConfig::from_env`] overlays the
/// process environment on top of those defaults.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Pinned provider.  `None` means auto-detect by key availability.
    pub provider: Option<Provider>,

    /// Model override.  Empty string means the per-provider default below.
    pub model: String,

    /// Anthropic API key.
    pub anthropic_api_key: String,
    /// Anthropic base URL (overridable for tests and proxies).
    pub anthropic_base_url: String,
    /// Anthropic model used when `model` is empty.
    pub anthropic_model: String,

    /// OpenAI API key.
    pub openai_api_key: String,
    /// OpenAI base URL.
    pub openai_base_url: String,
    /// OpenAI model used when `model` is empty.
    pub openai_model: String,

    /// Ollama endpoint URL.
    pub ollama_url: String,
    /// Ollama model used when `model` is empty.
    pub ollama_model: String,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: String::new(),
            anthropic_api_key: String::new(),
            anthropic_base_url: ANTHROPIC_BASE_URL.to_owned(),
            anthropic_model: "claude-haiku-4-5-20251001".to_owned(),
            openai_api_key: String::new(),
            openai_base_url: OPENAI_BASE_URL.to_owned(),
            openai_model: "gpt-4o-mini".to_owned(),
            ollama_url: OLLAMA_BASE_URL.to_owned(),
            ollama_model: "qwen3:8b".to_owned(),
            max_tokens: 300,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Build a configuration from the process environment.
    ///
    /// Unset or unparseable variables fall back to the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(p) = std::env::var("SOTTO_PROVIDER") {
            config.provider = p.parse().ok();
        }
        if let Ok(m) = std::env::var("SOTTO_MODEL") {
            config.model = m;
        }
        if let Ok(k) = std::env::var("ANTHROPIC_API_KEY") {
            config.anthropic_api_key = k;
        }
        if let Ok(k) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = k;
        }
        if let Ok(m) = std::env::var("OPENAI_MODEL") {
            config.openai_model = m;
        }
        if let Ok(u) = std::env::var("OLLAMA_URL") {
            config.ollama_url = u;
        }
        if let Ok(m) = std::env::var("OLLAMA_MODEL") {
            config.ollama_model = m;
        }

        config
    }

    /// Resolve the active provider: the pinned one, or auto-detect by key
    /// availability (Anthropic > OpenAI > Ollama).
    pub fn resolve_provider(&self) -> Provider {
        if let Some(p) = self.provider {
            return p;
        }
        if !self.anthropic_api_key.is_empty() {
            return Provider::Anthropic;
        }
        if !self.openai_api_key.is_empty() {
            return Provider::OpenAi;
        }
        Provider::Ollama
    }

    /// Whether the resolved provider can actually be called.
    ///
    /// Ollama is assumed reachable when selected; there is no cheap
    /// pre-check for a local endpoint.
    pub fn is_configured(&self) -> bool {
        match self.resolve_provider() {
            Provider::Anthropic => !self.anthropic_api_key.is_empty(),
            Provider::OpenAi => !self.openai_api_key.is_empty(),
            Provider::Ollama => true,
        }
    }

    /// The model identifier to send for the resolved provider.
    pub fn model_for(&self, provider: Provider) -> &str {
        if !self.model.is_empty() {
            return &self.model;
        }
        match provider {
            Provider::Anthropic => &self.anthropic_model,
            Provider::OpenAi => &self.openai_model,
            Provider::Ollama => &self.ollama_model,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_known_names() {
        assert_eq!("anthropic".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert_eq!("claude".parse::<Provider>().unwrap(), Provider::Anthropic);
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAi);
        assert_eq!("ollama".parse::<Provider>().unwrap(), Provider::Ollama);
        assert!("gemini".parse::<Provider>().is_err());
    }

    #[test]
    fn auto_detect_prefers_anthropic() {
        let config = LlmConfig {
            anthropic_api_key: "ak".into(),
            openai_api_key: "ok".into(),
            ..Default::default()
        };
        assert_eq!(config.resolve_provider(), Provider::Anthropic);
    }

    #[test]
    fn auto_detect_falls_back_to_openai_then_ollama() {
        let config = LlmConfig {
            openai_api_key: "ok".into(),
            ..Default::default()
        };
        assert_eq!(config.resolve_provider(), Provider::OpenAi);

        let config = LlmConfig::default();
        assert_eq!(config.resolve_provider(), Provider::Ollama);
        assert!(config.is_configured());
    }

    #[test]
    fn pinned_provider_wins_over_keys() {
        let config = LlmConfig {
            provider: Some(Provider::Ollama),
            anthropic_api_key: "ak".into(),
            ..Default::default()
        };
        assert_eq!(config.resolve_provider(), Provider::Ollama);
    }

    #[test]
    fn model_override_applies_to_all_providers() {
        let config = LlmConfig {
            model: "custom".into(),
            ..Default::default()
        };
        assert_eq!(config.model_for(Provider::Anthropic), "custom");
        assert_eq!(config.model_for(Provider::Ollama), "custom");

        let config = LlmConfig::default();
        assert_eq!(config.model_for(Provider::OpenAi), "gpt-4o-mini");
    }
}
