//! Conversational core for Sotto.
//!
//! One user utterance goes in, one spoken reply comes out.  In between:
//!
//! ```text
//! text ──> InputFilter ──> FastPath ──> keyword router ─┬─> WorkflowRunner (FSM)
//!           (drop?)        (instant)                    └─> Orchestrator (chat loop)
//!                                                              │
//!                                                       LanguageModel + ToolRegistry
//! ```
//!
//! Progress flows out through the [`events::EventBus`]; the transport and
//! the persistence sink are subscribers, never callees.
//!
//! ## Modules
//!
//! - [`session`] -- the ingress surface tying the filters to the runner.
//! - [`orchestrator`] -- the iterative tool-calling chat loop.
//! - [`workflow`] / [`templates`] -- the FSM runner and its shipped templates.
//! - [`fast_path`] -- deterministic time/date answers.
//! - [`filter`] -- STT input-quality classification.
//! - [`events`] -- the typed event bus.
//! - [`config`] -- engine configuration and defaults.
//! - [`error`] -- engine error types.

pub mod config;
pub mod error;
pub mod events;
pub mod fast_path;
pub mod filter;
pub mod orchestrator;
pub mod session;
pub mod templates;
pub mod workflow;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use events::{EngineEvent, EventBus, StateStatus, StatusKind, ToolCallRecord};
pub use fast_path::FastPath;
pub use filter::{InputFilter, InputQuality, SttSignals};
pub use orchestrator::Orchestrator;
pub use session::{Session, TurnContext};
pub use workflow::{
    StepKind, WorkflowContext, WorkflowDef, WorkflowRunner, WorkflowStep, WorkflowTable,
    client_view,
};
