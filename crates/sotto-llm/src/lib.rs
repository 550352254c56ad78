//! LLM provider adapter for Sotto.
//!
//! Hides three vendor tool-use conventions (Anthropic Messages, OpenAI Chat
//! Completions, Ollama `/api/chat`) behind two operations: plain generation
//! and tool-use generation.  All other crates manipulate only the internal
//! [`Message`] / [`ToolCall`] representation; the vendor-specific wire
//! formats live in [`convert`] and are applied at the crate boundary.
//!
//! ## Modules
//!
//! - [`types`] -- internal message and tool-call representation.
//! - [`provider`] -- provider selection and connection configuration.
//! - [`convert`] -- wire-format projection (the single point of divergence).
//! - [`client`] -- the HTTP client and the [`LanguageModel`] trait.
//! - [`error`] -- provider error types.

pub mod client;
pub mod convert;
pub mod error;
pub mod provider;
pub mod types;

pub use client::{LanguageModel, LlmClient};
pub use convert::{build_tool_result_messages, history_to_wire, tools_payload};
pub use error::{LlmError, Result};
pub use provider::{LlmConfig, Provider};
pub use types::{Message, Role, ToolCall, ToolSchema};
