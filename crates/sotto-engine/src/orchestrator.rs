//! Iterative tool-calling chat loop.
//!
//! One [`Orchestrator::chat`] call drives up to `max_iterations` rounds of
//! model generation and tool execution, then runs two recovery checks: a
//! post-tool retry when the model hedges despite having fresh search
//! results in context, and a safety-net search when it hedges without
//! having used any tool at all.  History is trimmed tool-group-aware so a
//! vendor conversion never sees half a group.

use std::sync::Arc;

use aho_corasick::AhoCorasick;
use regex::Regex;
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use sotto_llm::{LanguageModel, Message, Role, ToolCall, history_to_wire};
use sotto_tools::ToolRegistry;

use crate::config::{EngineConfig, SEARCH_CLASSIFIER_PROMPT};
use crate::error::Result;
use crate::events::{EngineEvent, EventBus, StatusKind, ToolCallRecord};

/// Reply used when the loop exhausts its iterations without any text.
const EXHAUSTED_FALLBACK: &str = "I wasn't able to complete that request.";

/// Ephemeral directive injected for the post-tool hedging retry.  Removed
/// from persistent history once the regenerated reply is captured.
const POST_TOOL_DIRECTIVE: &str =
    "You already searched the web and received results above. \
     Use those results to answer my question directly. \
     Do not say you cannot access real-time data — you just did.";

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Chat loop with tool calling, hedging recovery, text-tool fallback
/// parsing, think-tag stripping, and tool-group-aware history.
pub struct Orchestrator {
    config: EngineConfig,
    model: Arc<dyn LanguageModel>,
    tools: Arc<ToolRegistry>,
    bus: EventBus,

    /// Hedging detector over the configured phrase set.
    hedging: Option<AhoCorasick>,
    /// Strips `<think>...</think>` reasoning blocks.
    think_re: Regex,
    /// Catches tool calls the model emitted as plain text,
    /// e.g. `gc_search {"query": "austin weather"}`.
    text_tool_re: Regex,

    /// Conversation history owned by this orchestrator.
    pub(crate) messages: Vec<Message>,
    /// Tool invocations made during the current turn, for the persistence
    /// sink's summary.
    pub(crate) turn_tool_calls: Vec<ToolCallRecord>,
}

impl Orchestrator {
    /// Create an orchestrator.  All patterns compile here, once, off the
    /// request path.
    pub fn new(
        model: Arc<dyn LanguageModel>,
        tools: Arc<ToolRegistry>,
        config: EngineConfig,
        bus: EventBus,
    ) -> Self {
        let phrases: Vec<String> = config
            .hedging_phrases
            .iter()
            .map(|p| p.to_lowercase())
            .collect();
        let hedging = match AhoCorasick::new(&phrases) {
            Ok(ac) => Some(ac),
            Err(e) => {
                error!(error = %e, "failed to build hedging automaton");
                None
            }
        };

        Self {
            config,
            model,
            tools,
            bus,
            hedging,
            think_re: Regex::new(r"(?s)<think>.*?</think>").expect("static pattern"),
            text_tool_re: Regex::new(r#"(?:^|['"`\s])(\w+)\s*\(?\s*(\{[^}]*\})\s*\)?"#)
                .expect("static pattern"),
            messages: Vec::new(),
            turn_tool_calls: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Public API
    // -----------------------------------------------------------------------

    /// Process one user input through the tool-calling loop and return the
    /// final assistant text.
    ///
    /// # Errors
    ///
    /// Provider failures in the main loop propagate; tool failures do not
    /// (they become the tool's string result).
    pub async fn chat(&mut self, user_input: &str) -> Result<String> {
        self.turn_tool_calls.clear();
        self.messages.push(Message::user(user_input));
        self.trim_history();

        let system = self.config.effective_system_prompt();
        let schemas = self.tools.schemas_filtered(
            &self.config.disabled_tools_admin,
            &self.config.disabled_tools_user,
        );

        self.bus.publish(EngineEvent::Status {
            kind: StatusKind::Thinking,
        });

        let mut reply = String::new();
        let mut text = String::new();
        let mut search_performed = false;
        let mut resolved = false;

        for iteration in 0..self.config.max_iterations {
            // On the last iteration, omit tools to force a text answer.
            let is_last = iteration + 1 == self.config.max_iterations;
            let tools_for_call = if is_last { &[][..] } else { &schemas[..] };

            debug!(iteration, tools = tools_for_call.len(), "chat loop iteration");

            let wire = history_to_wire(self.model.provider(), &self.messages);
            let (raw_text, mut calls) = self
                .model
                .generate_with_tools(&system, &wire, tools_for_call)
                .await?;

            text = self.strip_thinking(&raw_text);

            // Fallback: detect tool calls emitted as plain text.
            if calls.is_empty() && !text.is_empty() {
                let parsed = self.parse_text_tool_calls(&text);
                if !parsed.is_empty() {
                    info!(
                        count = parsed.len(),
                        "detected tool calls in text output (fallback parser)"
                    );
                    calls = parsed;
                    text.clear();
                }
            }

            if calls.is_empty() {
                reply = text.clone();
                resolved = true;
                break;
            }

            // The model wants tools: record the group and execute each call.
            self.messages
                .push(Message::assistant_tool_calls(text.clone(), calls.clone()));

            for call in &calls {
                self.bus.publish(EngineEvent::ToolCall {
                    name: call.name.clone(),
                    args: call.arguments.clone(),
                });
                self.turn_tool_calls.push(ToolCallRecord {
                    name: call.name.clone(),
                    args: call.arguments.clone(),
                });

                let result = self.tools.dispatch(&call.name, call.arguments.clone()).await;
                search_performed = search_performed || call.name == "web_search";
                self.messages.push(Message::tool_result(result));
            }
        }

        if !resolved {
            reply = if text.is_empty() {
                EXHAUSTED_FALLBACK.to_owned()
            } else {
                text.clone()
            };
        }

        // Recovery check 1: the model got search results but still refused.
        if search_performed && self.is_hedging(&reply) {
            info!("model hedged after receiving search results, retrying with directive");
            reply = self.post_tool_hedging_retry(&system).await?;
        }

        // Recovery check 2: the model hedged without touching a tool.
        if !search_performed
            && self.config.enable_hedging_safety_net
            && !schemas.is_empty()
            && self.is_hedging(&reply)
        {
            info!("model hedged without using tools, running safety-net search");
            if let Some(recovered) = self.safety_net_search(user_input, &system).await {
                reply = recovered;
            }
        }

        if !reply.is_empty() {
            self.messages.push(Message::assistant(reply.clone()));
        }

        Ok(reply)
    }

    /// Reset the conversation history.
    pub fn clear_history(&mut self) {
        self.messages.clear();
    }

    /// Read-only view of the conversation history.
    pub fn history(&self) -> &[Message] {
        &self.messages
    }

    /// The engine configuration this orchestrator runs with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    pub(crate) fn registry(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub(crate) fn bus(&self) -> &EventBus {
        &self.bus
    }

    // -----------------------------------------------------------------------
    // History management
    // -----------------------------------------------------------------------

    /// Trim history to `max_history`, preserving tool groups.
    ///
    /// The cut point first advances past any tool-role messages (never
    /// leave one first), then rewinds to include an assistant-with-calls
    /// whose group it would otherwise split.  When the rewind reaches the
    /// front, the whole group is kept and the transient over-limit
    /// accepted.
    pub(crate) fn trim_history(&mut self) {
        let limit = self.config.max_history;
        if self.messages.len() <= limit {
            return;
        }

        let candidate = self.messages.len() - limit;
        let mut cut = candidate;
        while cut < self.messages.len() && self.messages[cut].role == Role::Tool {
            cut += 1;
        }
        if cut >= self.messages.len() {
            // Everything past the candidate is one oversized group.  No
            // safe cut exists: rewind to the assistant that opened it and
            // accept the transient over-limit.
            cut = candidate;
            while cut > 0 && self.messages[cut].role == Role::Tool {
                cut -= 1;
            }
        }
        if cut > 0 && self.messages[cut - 1].has_tool_calls() {
            cut -= 1;
            while cut > 0 && self.messages[cut - 1].role == Role::Tool {
                cut -= 1;
            }
        }

        if cut > 0 {
            debug!(dropped = cut, retained = self.messages.len() - cut, "history trimmed");
            self.messages.drain(..cut);
        }
    }

    // -----------------------------------------------------------------------
    // Content cleanup
    // -----------------------------------------------------------------------

    /// Remove `<think>...</think>` blocks some models interleave and expect
    /// the caller to discard.
    pub(crate) fn strip_thinking(&self, text: &str) -> String {
        self.think_re.replace_all(text, "").trim().to_owned()
    }

    // -----------------------------------------------------------------------
    // Text-based tool call parsing (fallback)
    // -----------------------------------------------------------------------

    /// Parse tool calls embedded in plain text output.
    ///
    /// Unknown names and unparseable argument blobs are skipped, not
    /// errors: the text is then treated as a normal reply.
    fn parse_text_tool_calls(&self, text: &str) -> Vec<ToolCall> {
        let mut calls = Vec::new();

        for caps in self.text_tool_re.captures_iter(text) {
            let raw_name = caps[1].to_lowercase();
            let raw_args = &caps[2];

            let Some(canonical) = self.config.tool_aliases.get(&raw_name) else {
                continue;
            };
            let Ok(args) = serde_json::from_str::<Value>(raw_args) else {
                continue;
            };

            debug!(raw = %raw_name, tool = %canonical, "parsed text tool call");
            calls.push(ToolCall::new(canonical.clone(), args));
        }

        calls
    }

    // -----------------------------------------------------------------------
    // Hedging detection and recovery
    // -----------------------------------------------------------------------

    /// Whether the reply contains any configured hedging phrase.
    pub(crate) fn is_hedging(&self, reply: &str) -> bool {
        match &self.hedging {
            Some(ac) => ac.is_match(&reply.to_lowercase()),
            None => false,
        }
    }

    /// Retry once when the model hedges after receiving search results:
    /// inject a directive, regenerate without tools, drop the directive.
    async fn post_tool_hedging_retry(&mut self, system: &str) -> Result<String> {
        self.bus.publish(EngineEvent::Status {
            kind: StatusKind::Thinking,
        });

        self.messages.push(Message::user(POST_TOOL_DIRECTIVE));
        let wire = history_to_wire(self.model.provider(), &self.messages);
        let result = self.model.generate(system, &wire).await;
        self.messages.pop();

        let reply = self.strip_thinking(&result?);
        info!(chars = reply.len(), "post-tool retry reply received");
        Ok(reply)
    }

    /// Extract a clean search query from user text via a short dedicated
    /// generation.  Falls back to the raw input.
    async fn extract_search_query(&self, text: &str) -> String {
        let messages = vec![json!({"role": "user", "content": text})];
        match self.model.generate(SEARCH_CLASSIFIER_PROMPT, &messages).await {
            Ok(reply) => {
                let query = self.strip_thinking(&reply);
                if query.len() > 5 {
                    debug!(query = %query, "extracted search query");
                    return query;
                }
                text.to_owned()
            }
            Err(e) => {
                warn!(error = %e, "search query extraction failed");
                text.to_owned()
            }
        }
    }

    /// When the model hedges without calling tools: search out of band,
    /// present the results in a synthetic assistant message, and regenerate
    /// once without tools.  The synthetic message is not persisted.
    async fn safety_net_search(&mut self, user_input: &str, system: &str) -> Option<String> {
        if !self.tools.contains("web_search") {
            return None;
        }

        let query = self.extract_search_query(user_input).await;

        self.bus.publish(EngineEvent::Status {
            kind: StatusKind::Searching,
        });

        let result = self.tools.dispatch("web_search", json!({"query": query})).await;
        if result.trim().is_empty()
            || result.starts_with("Error")
            || result.starts_with("Web search failed")
        {
            warn!("safety-net search produced no usable results");
            return None;
        }

        let mut wire = history_to_wire(self.model.provider(), &self.messages);
        wire.push(json!({
            "role": "assistant",
            "content": format!(
                "I searched the web and found:\n\n{result}\nI'll use these results to answer."
            ),
        }));

        self.bus.publish(EngineEvent::Status {
            kind: StatusKind::Thinking,
        });

        match self.model.generate(system, &wire).await {
            Ok(reply) => Some(self.strip_thinking(&reply)),
            Err(e) => {
                warn!(error = %e, "safety-net regeneration failed");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
