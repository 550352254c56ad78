//! Tool error types.
//!
//! These exist for the tool implementations themselves; by the time a
//! failure reaches the chat loop it has been flattened into the string
//! result the model sees (see [`crate::registry::ToolRegistry::dispatch`]).

/// Unified error type for Sotto tools.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The requested tool does not exist in the registry.
    #[error("unknown tool: `{name}`")]
    NotFound { name: String },

    /// The arguments supplied to a tool are invalid.
    #[error("invalid parameters for tool `{tool_name}`: {reason}")]
    InvalidParams { tool_name: String, reason: String },

    /// A tool invocation failed.
    #[error("execution failed for tool `{tool_name}`: {reason}")]
    Execution { tool_name: String, reason: String },
}

/// Convenience alias used throughout the tools crate.
pub type Result<T> = std::result::Result<T, ToolError>;
