//! Provider error types.
//!
//! Every failure mode of the provider layer surfaces as a single
//! [`LlmError`] carrying a machine-readable kind and a human message.

/// Unified error type for LLM provider operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The provider rejected the request's credentials.
    #[error("authentication failed for provider `{provider}`")]
    Auth { provider: String },

    /// The provider throttled the request.
    #[error("rate limited by provider `{provider}`")]
    RateLimited { provider: String },

    /// The HTTP request could not be completed.
    #[error("transport error: {reason}")]
    Transport { reason: String },

    /// The provider returned a body we could not interpret.
    #[error("malformed provider response: {reason}")]
    MalformedResponse { reason: String },

    /// The request exceeded its configured deadline.
    #[error("provider request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// No provider is usable with the current configuration.
    #[error("no llm provider configured: {reason}")]
    NotConfigured { reason: String },
}

/// Convenience alias used throughout the provider crate.
pub type Result<T> = std::result::Result<T, LlmError>;

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured deadline on the error;
            // callers that know it attach the real value themselves.
            Self::Timeout { seconds: 0 }
        } else {
            Self::Transport {
                reason: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse {
            reason: err.to_string(),
        }
    }
}
