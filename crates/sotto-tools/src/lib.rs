//! Tool surface for Sotto.
//!
//! A process-global, read-only [`ToolRegistry`] maps canonical tool names to
//! handlers implementing the [`Tool`] trait.  The registry is built once at
//! startup; models see the exported [`sotto_llm::ToolSchema`] list, and all
//! execution goes through [`ToolRegistry::dispatch`], which never raises --
//! failures become the string the model receives.
//!
//! ## Modules
//!
//! - [`registry`] -- the [`Tool`] trait, registry, and alias table.
//! - [`search`] -- web search with a four-provider fallback chain.
//! - [`timezone`] -- IANA timezone resolution from spoken place names.
//! - [`datetime`] -- current date/time tool.
//! - [`calendar`] -- calendar tool (mock data).
//! - [`knowledge`] -- personal knowledge-base (RAG service) tool.

pub mod calendar;
pub mod datetime;
pub mod error;
pub mod knowledge;
pub mod registry;
pub mod search;
pub mod timezone;

pub use calendar::CalendarTool;
pub use datetime::DateTimeTool;
pub use error::{Result, ToolError};
pub use knowledge::KnowledgeBaseTool;
pub use registry::{Tool, ToolRegistry, WebSearchTool, default_aliases};
pub use search::SearchClient;
pub use timezone::TimezoneIndex;
