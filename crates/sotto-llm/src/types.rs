//! Internal message and tool types.
//!
//! These are provider-agnostic: every component above this crate speaks in
//! [`Message`] and [`ToolCall`], and the [`crate::convert`] module projects
//! them into whichever wire format the active provider expects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// The role of a participant in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Input from the human user.
    User,
    /// Output from the LLM.
    Assistant,
    /// Result of a tool invocation, fed back to the model.
    Tool,
}

/// A single message in a conversation history.
///
/// An assistant message carrying tool calls is immediately followed by one
/// [`Role::Tool`] message per call, in call order; that tuple is a *tool
/// group* and is kept indivisible by history trimming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this message.
    pub role: Role,

    /// The textual content.  May be empty on assistant messages that only
    /// carry tool calls.
    #[serde(default)]
    pub content: String,

    /// Tool calls requested by the assistant (only present when
    /// `role == Role::Assistant`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant text message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message that carries tool calls alongside any
    /// text the model produced with them.
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
        }
    }

    /// Create a tool result message.
    ///
    /// Tool results are correlated to their calls positionally within the
    /// group; the vendor-specific ids are reattached during wire conversion.
    pub fn tool_result(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Whether this message opens a tool group.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tool calls
// ---------------------------------------------------------------------------

/// A tool invocation requested by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id assigned by the provider.  Anthropic requires it to be
    /// echoed back with the result; Ollama never supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The name of the tool to invoke.
    pub name: String,

    /// Arguments as a JSON value.  The structure depends on the tool's
    /// declared schema.
    pub arguments: Value,
}

impl ToolCall {
    /// Create a tool call without a provider-assigned id.
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            arguments,
        }
    }
}

// ---------------------------------------------------------------------------
// Tool schemas
// ---------------------------------------------------------------------------

/// Declarative tool metadata exposed to models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool name.
    pub name: String,

    /// Human-readable description of what the tool does.
    pub description: String,

    /// JSON Schema describing the tool's input parameters.  Always an
    /// object type with a top-level `required` list.
    pub parameters: Value,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
    }

    #[test]
    fn message_constructors() {
        let user = Message::user("hello");
        assert_eq!(user.role, Role::User);
        assert!(!user.has_tool_calls());

        let calls = vec![ToolCall::new("web_search", json!({"query": "rust"}))];
        let assistant = Message::assistant_tool_calls("", calls);
        assert_eq!(assistant.role, Role::Assistant);
        assert!(assistant.has_tool_calls());

        let tool = Message::tool_result("42 results");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.content, "42 results");
    }

    #[test]
    fn tool_call_id_omitted_when_absent() {
        let call = ToolCall::new("web_search", json!({"query": "x"}));
        let v = serde_json::to_value(&call).unwrap();
        assert!(v.get("id").is_none());
        assert_eq!(v["name"], "web_search");
    }
}
