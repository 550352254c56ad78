//! Typed event bus.
//!
//! The core publishes progress as [`EngineEvent`]s on a
//! [`tokio::sync::broadcast`] channel; the transport renders them, the
//! persistence sink records [`EngineEvent::TurnCompleted`].  Publishing
//! never blocks: with no subscribers the event is dropped, and a subscriber
//! that falls behind loses the oldest events (`Lagged`) rather than
//! applying backpressure to the conversation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Coarse activity status of the chat loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Waiting on the model.
    Thinking,
    /// Waiting on a web search.
    Searching,
}

/// Status of a workflow state in the UI's FSM rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateStatus {
    /// The state is currently executing.
    Active,
    /// The state finished executing.
    Visited,
    /// A loop state advanced to another child query.
    LoopUpdate,
}

/// A tool invocation summary handed to the persistence sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Canonical tool name that was dispatched.
    pub name: String,
    /// The arguments it was dispatched with.
    pub args: Value,
}

/// An event emitted by the conversational core during a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The loop entered a new coarse activity.
    Status { kind: StatusKind },

    /// The model requested a tool and the core is about to execute it.
    ToolCall { name: String, args: Value },

    /// A workflow was selected; carries the client-serialized definition.
    WorkflowStart { definition: Value },

    /// A workflow state changed.  `children` and `active_index` are only
    /// present on loop updates; `step`/`total`/`step_name`/`detail` only
    /// where the original emission carried them.
    WorkflowState {
        state_id: String,
        status: StateStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        step_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        children: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        active_index: Option<i64>,
    },

    /// A short user-visible sentence spoken before a step runs.
    WorkflowNarration { text: String },

    /// A UI progress hint with the expected upper bound in seconds.
    WorkflowActivity { activity: String, timeout_secs: f64 },

    /// Optional per-step diagnostics for the debugger UI.
    WorkflowDebug { diagnostics: Value },

    /// The workflow finished (successfully or not).
    WorkflowExit { workflow_id: String },

    /// A turn reached its final reply; the persistence sink records this.
    TurnCompleted {
        user: String,
        assistant: String,
        tool_calls: Vec<ToolCallRecord>,
    },
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// Broadcast bus carrying [`EngineEvent`]s from the core to its observers.
///
/// Cheaply cloneable; events are wrapped in [`Arc`] so fan-out does not
/// clone payloads.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<EngineEvent>>,
}

impl EventBus {
    /// Create a bus with the given per-subscriber buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of receivers that will observe it; zero (no one
    /// listening) is not an error.
    pub fn publish(&self, event: EngineEvent) -> usize {
        match self.sender.send(Arc::new(event)) {
            Ok(n) => n,
            Err(_) => {
                tracing::trace!("event published with no active subscribers");
                0
            }
        }
    }

    /// Subscribe to all future events.  Past events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<EngineEvent>> {
        self.sender.subscribe()
    }

    /// Current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let n = bus.publish(EngineEvent::Status {
            kind: StatusKind::Thinking,
        });
        assert_eq!(n, 1);

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event.as_ref(),
            EngineEvent::Status {
                kind: StatusKind::Thinking
            }
        ));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_dropped_silently() {
        let bus = EventBus::new(16);
        let n = bus.publish(EngineEvent::WorkflowExit {
            workflow_id: "fact_check".into(),
        });
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_share_the_same_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(EngineEvent::ToolCall {
            name: "web_search".into(),
            args: json!({"query": "x"}),
        });

        let e1 = rx1.recv().await.unwrap();
        let e2 = rx2.recv().await.unwrap();
        assert!(Arc::ptr_eq(&e1, &e2));
    }

    #[test]
    fn events_serialize_with_type_tags() {
        let v = serde_json::to_value(EngineEvent::WorkflowState {
            state_id: "search_each".into(),
            status: StateStatus::LoopUpdate,
            step: None,
            total: None,
            step_name: None,
            detail: None,
            children: Some(vec!["q1".into(), "q2".into()]),
            active_index: Some(0),
        })
        .unwrap();

        assert_eq!(v["type"], "workflow_state");
        assert_eq!(v["status"], "loop_update");
        assert_eq!(v["active_index"], 0);
        // Absent optionals are omitted entirely.
        assert!(v.get("detail").is_none());
    }
}
