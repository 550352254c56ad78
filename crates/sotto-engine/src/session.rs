//! The ingress surface: one session per connected conversation.
//!
//! Three sequential filters run before either orchestrator sees the text:
//! the input-quality classifier (garbage and low-quality drop silently),
//! the fast-path matcher (time/date answered with zero model calls), and
//! the workflow keyword router inside [`WorkflowRunner::chat`].  Every turn
//! that produces a reply ends with a [`EngineEvent::TurnCompleted`] on the
//! bus for the persistence sink.

use std::sync::Arc;

use tracing::debug;

use sotto_llm::{LanguageModel, Message};
use sotto_tools::ToolRegistry;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::events::{EngineEvent, EventBus};
use crate::fast_path::FastPath;
use crate::filter::{InputFilter, InputQuality, SttSignals};
use crate::orchestrator::Orchestrator;
use crate::workflow::{WorkflowRunner, WorkflowTable};

// ---------------------------------------------------------------------------
// Turn context
// ---------------------------------------------------------------------------

/// Optional per-turn context supplied by the transport.
#[derive(Debug, Clone, Default)]
pub struct TurnContext {
    /// The client's IANA timezone (from the transport's hello message),
    /// used by fast-path time queries.
    pub client_timezone: Option<String>,

    /// STT quality metrics for the input classifier.  Absent for typed
    /// input, which is never dropped on quality grounds.
    pub stt: Option<SttSignals>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One conversation: filters, fast path, and the workflow runner, with a
/// single owned history.
pub struct Session {
    filter: InputFilter,
    fast_path: FastPath,
    runner: WorkflowRunner,
    bus: EventBus,
}

impl Session {
    /// Wire up a session over a model, a tool registry, and an event bus.
    pub fn new(
        model: Arc<dyn LanguageModel>,
        tools: Arc<ToolRegistry>,
        config: EngineConfig,
        bus: EventBus,
    ) -> Self {
        let orchestrator = Orchestrator::new(model, tools, config, bus.clone());
        let runner = WorkflowRunner::new(orchestrator, Arc::new(WorkflowTable::builtin()));
        Self {
            filter: InputFilter::new(),
            fast_path: FastPath::new(),
            runner,
            bus,
        }
    }

    /// Process one utterance with no transport context (typed input).
    pub async fn chat(&mut self, text: &str) -> Result<Option<String>> {
        self.chat_with_context(text, &TurnContext::default()).await
    }

    /// Process one utterance.
    ///
    /// Returns `Ok(None)` when the input was classified garbage or low
    /// quality -- the silent drop: the transport never learns why.
    pub async fn chat_with_context(
        &mut self,
        text: &str,
        ctx: &TurnContext,
    ) -> Result<Option<String>> {
        let signals = ctx.stt.unwrap_or_default();
        match self.filter.classify(text, &signals) {
            InputQuality::Valid => {}
            quality => {
                debug!(?quality, "input dropped by classifier");
                return Ok(None);
            }
        }

        if let Some(reply) = self
            .fast_path
            .try_answer(text, ctx.client_timezone.as_deref())
        {
            // Deterministic answer: the model never saw this exchange, so
            // history stays untouched, but the turn is still persisted.
            self.bus.publish(EngineEvent::TurnCompleted {
                user: text.to_owned(),
                assistant: reply.clone(),
                tool_calls: Vec::new(),
            });
            return Ok(Some(reply));
        }

        let reply = self.runner.chat(text).await?;

        self.bus.publish(EngineEvent::TurnCompleted {
            user: text.to_owned(),
            assistant: reply.clone(),
            tool_calls: self.runner.turn_tool_calls().to_vec(),
        });

        Ok(Some(reply))
    }

    /// Reset the conversation history.
    pub fn clear_history(&mut self) {
        self.runner.clear_history();
    }

    /// Read-only view of the conversation history.
    pub fn history(&self) -> &[Message] {
        self.runner.history()
    }

    /// The event bus this session publishes on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}
