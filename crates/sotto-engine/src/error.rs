//! Engine error types.

use sotto_llm::LlmError;

/// Unified error type for the conversational core.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A provider failure in the chat loop; surfaces to the caller so the
    /// transport can close the turn with an error.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// A workflow step failed.  The runner converts this into the spoken
    /// apology reply rather than propagating it.
    #[error("workflow step `{step_id}` failed: {reason}")]
    WorkflowStep { step_id: String, reason: String },
}

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;
