//! Hybrid FSM + LLM workflow engine.
//!
//! [`WorkflowRunner`] composes the [`Orchestrator`] (it does not replace
//! it).  Complex queries that match a template are driven step by step
//! through the FSM, with a focused one-shot LLM call per reasoning step;
//! simple queries fall through to the chat loop unchanged.  Intermediate
//! workflow reasoning never enters conversation history -- only the final
//! user/assistant pair is appended, keeping context costs bounded.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use regex::Regex;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use sotto_llm::Message;

use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, StateStatus, ToolCallRecord};
use crate::orchestrator::Orchestrator;
use crate::templates;

/// Upper bound hint for one workflow LLM call, surfaced to the UI.
pub const LLM_TIMEOUT_SECS: f64 = 120.0;

/// Upper bound hint for one search dispatch, surfaced to the UI.
pub const SEARCH_TIMEOUT_SECS: f64 = 5.0;

/// Fixed system prompt for workflow reasoning steps.
const WORKFLOW_SYSTEM_PROMPT: &str =
    "You are a research assistant. Follow instructions precisely.";

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// What a workflow step does when it becomes active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// A focused one-shot LLM call, with a fixed post-action keyed by the
    /// step id.
    Llm,
    /// Dispatch the step's tool once per derived search query.
    Loop,
    /// Dispatch the step's tool once, query chosen by step id.
    Direct,
}

impl StepKind {
    /// Identifier used in the client serialization.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Loop => "loop",
            Self::Direct => "direct",
        }
    }
}

/// A single state in a workflow FSM.
#[derive(Debug, Clone)]
pub struct WorkflowStep {
    /// Stable id, e.g. "decompose"; the llm post-actions key off this.
    pub id: String,
    /// Human-readable name, e.g. "Decomposing query".
    pub name: String,
    /// What the step does.
    pub kind: StepKind,
    /// Prompt with `{{placeholder}}` expansions (llm steps).
    pub prompt_template: String,
    /// Tool to dispatch (loop/direct steps, optional on llm steps).
    pub tool_name: String,
    /// Next state id, "" = terminal.  Advisory for UI rendering; the
    /// runner executes steps in declaration order.
    pub next_step: String,
    /// Short user-visible sentence spoken before the step runs.
    pub narration: String,
}

/// A complete workflow definition.
#[derive(Debug, Clone)]
pub struct WorkflowDef {
    /// Stable id, e.g. "research_compare".
    pub id: String,
    /// Display name.
    pub name: String,
    /// Brief description.
    pub description: String,
    /// Raw trigger keywords (kept for introspection).
    pub trigger_keywords: Vec<String>,
    /// The keywords compiled into one case-insensitive alternation.
    pub trigger_pattern: Regex,
    /// Queries with fewer words than this skip routing entirely.
    pub min_query_words: usize,
    /// Ordered steps.
    pub steps: Vec<WorkflowStep>,
}

/// Compile a keyword list into a single alternation pattern.  Plain words
/// get `\b` anchors; keywords that already contain regex syntax are used
/// as written.
pub(crate) fn compile_trigger(keywords: &[&str]) -> Regex {
    let parts: Vec<String> = keywords
        .iter()
        .map(|kw| {
            if kw.chars().any(|c| "\\+*?[]()".contains(c)) {
                (*kw).to_owned()
            } else {
                format!(r"\b{kw}\b")
            }
        })
        .collect();
    Regex::new(&format!("(?i){}", parts.join("|"))).expect("static trigger pattern")
}

// ---------------------------------------------------------------------------
// Template table
// ---------------------------------------------------------------------------

/// The immutable set of workflow templates, built once at startup.
pub struct WorkflowTable {
    defs: Vec<WorkflowDef>,
}

impl WorkflowTable {
    /// The three shipped workflows.
    pub fn builtin() -> Self {
        Self {
            defs: templates::builtin(),
        }
    }

    /// Build a table from explicit definitions (tests).
    pub fn new(defs: Vec<WorkflowDef>) -> Self {
        Self { defs }
    }

    /// Match user input against the trigger patterns, in declaration
    /// order.  Short queries (below a template's word minimum) skip that
    /// template.
    pub fn route(&self, user_input: &str) -> Option<&WorkflowDef> {
        let word_count = user_input.split_whitespace().count();
        let matched = self.defs.iter().find(|def| {
            word_count >= def.min_query_words && def.trigger_pattern.is_match(user_input)
        });
        if let Some(def) = matched {
            info!(workflow = %def.id, "workflow routed");
        }
        matched
    }

    /// Look up a definition by id.
    pub fn get(&self, id: &str) -> Option<&WorkflowDef> {
        self.defs.iter().find(|d| d.id == id)
    }

    /// All definitions, in routing order.
    pub fn defs(&self) -> &[WorkflowDef] {
        &self.defs
    }
}

/// Serialize a definition for the frontend debugger.
pub fn client_view(def: &WorkflowDef) -> Value {
    json!({
        "workflow_id": def.id,
        "name": def.name,
        "description": def.description,
        "states": def.steps.iter().map(|s| json!({
            "id": s.id,
            "name": s.name,
            "type": s.kind.as_str(),
            "has_tool": !s.tool_name.is_empty(),
            "tool_name": s.tool_name,
            "prompt_template": truncate_chars(&s.prompt_template, 200),
            "next_step": s.next_step,
            "narration": s.narration,
        })).collect::<Vec<_>>(),
    })
}

// ---------------------------------------------------------------------------
// Execution context
// ---------------------------------------------------------------------------

/// Mutable state carried through one workflow execution.
#[derive(Debug, Default)]
pub struct WorkflowContext {
    /// The original user query.
    pub user_query: String,
    /// Raw result text per executed step id.
    pub step_results: HashMap<String, String>,
    /// Search queries produced by decomposition steps, consumed by
    /// loop/direct steps.
    pub search_queries: Vec<String>,
    /// Accumulated per-query search results (`[Query: q]`-prefixed).
    pub search_results: Vec<String>,
    /// Set only by the terminal llm step (synthesize/verdict).
    pub final_answer: String,
}

impl WorkflowContext {
    fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Template rendering
// ---------------------------------------------------------------------------

/// Substitute `{{key}}` occurrences from the fixed key set.
pub(crate) fn render_template(template: &str, ctx: &WorkflowContext) -> String {
    let today = Local::now();
    let step = |id: &str| ctx.step_results.get(id).cloned().unwrap_or_default();

    let short_query = if ctx.user_query.chars().count() > 50 {
        format!("{}...", truncate_chars(&ctx.user_query, 50))
    } else {
        ctx.user_query.clone()
    };

    let replacements: Vec<(&str, String)> = vec![
        ("user_query", ctx.user_query.clone()),
        ("user_query_short", short_query),
        ("current_date", today.format("%B %d, %Y").to_string()),
        ("current_year", today.format("%Y").to_string()),
        (
            "search_queries",
            ctx.search_queries
                .iter()
                .map(|q| format!("- {q}"))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        ("search_results", ctx.search_results.join("\n\n")),
        ("decompose_result", step("decompose")),
        ("claims", step("extract_claim")),
        ("evidence", step("search_evidence")),
        ("counter_evidence", step("search_counter")),
        ("initial_search", step("initial_search")),
        ("initial_lookup", truncate_search_block(&step("initial_lookup"))),
        ("gap_analysis", step("evaluate_gaps")),
        ("targeted_results", step("targeted_search")),
    ];

    let mut result = template.to_owned();
    for (key, value) in replacements {
        result = result.replace(&format!("{{{{{key}}}}}"), &value);
    }
    result
}

/// Shorten search-result snippets so decompose prompts stay small.
///
/// Numbered title lines stay intact (entity names live there); indented
/// snippet lines longer than 150 chars are cut, and the whole block is
/// capped at 2,500 chars.
pub(crate) fn truncate_search_block(text: &str) -> String {
    const MAX_SNIPPET: usize = 150;
    const MAX_TOTAL: usize = 2_500;

    let lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            if line.starts_with("   ") && line.chars().count() > MAX_SNIPPET {
                format!("{}...", truncate_chars(line, MAX_SNIPPET))
            } else {
                line.to_owned()
            }
        })
        .collect();

    let joined = lines.join("\n");
    if joined.chars().count() > MAX_TOTAL {
        format!("{}\n[...truncated]", truncate_chars(&joined, MAX_TOTAL))
    } else {
        joined
    }
}

/// Cap a string at `max` characters (not bytes).
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_owned()
    } else {
        s.chars().take(max).collect()
    }
}

// ---------------------------------------------------------------------------
// JSON extraction
// ---------------------------------------------------------------------------

/// Parse JSON out of model output, tolerating a code fence around it.
/// Returns `None` when the text is not JSON (callers fall back to treating
/// it as plain text).
pub(crate) fn extract_json(text: &str) -> Option<Value> {
    let mut stripped = text.trim();

    if stripped.starts_with("```") {
        let lines: Vec<&str> = stripped.split('\n').collect();
        if lines.len() >= 3 && lines[lines.len() - 1].trim() == "```" {
            return serde_json::from_str(lines[1..lines.len() - 1].join("\n").trim()).ok();
        }
    }

    // A bare fence with no terminator still sometimes precedes the JSON.
    if let Some(rest) = stripped.strip_prefix("```json") {
        stripped = rest.trim();
    }

    serde_json::from_str(stripped).ok()
}

/// Parse an LLM-produced list of search queries: a JSON array when the
/// model obeyed, otherwise one query per line with list markers stripped.
fn parse_query_list(text: &str, cap: usize) -> Vec<String> {
    if let Some(Value::Array(items)) = extract_json(text) {
        return items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
    }

    text.lines()
        .map(strip_list_marker)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .take(cap)
        .collect()
}

/// Strip a leading list marker ("1. ", "- ", "* ") from a line.
fn strip_list_marker(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == '-' || c == '*')
        .trim()
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// FSM-driven workflow engine wrapping the [`Orchestrator`].
///
/// Mirrors the orchestrator's public surface: `chat`, `clear_history`.
pub struct WorkflowRunner {
    orchestrator: Orchestrator,
    table: Arc<WorkflowTable>,
}

impl WorkflowRunner {
    /// Create a runner over an orchestrator and a template table.
    pub fn new(orchestrator: Orchestrator, table: Arc<WorkflowTable>) -> Self {
        Self {
            orchestrator,
            table,
        }
    }

    /// Route the input: a matched template executes the FSM, anything else
    /// falls through to the chat loop.
    pub async fn chat(&mut self, user_input: &str) -> Result<String> {
        let table = Arc::clone(&self.table);
        match table.route(user_input) {
            Some(def) => self.execute_workflow(def, user_input).await,
            None => self.orchestrator.chat(user_input).await,
        }
    }

    /// Reset conversation history.
    pub fn clear_history(&mut self) {
        self.orchestrator.clear_history();
    }

    /// Read-only view of the conversation history.
    pub fn history(&self) -> &[Message] {
        self.orchestrator.history()
    }

    /// Tool invocations made during the most recent turn.
    pub fn turn_tool_calls(&self) -> &[ToolCallRecord] {
        &self.orchestrator.turn_tool_calls
    }

    /// The underlying orchestrator (tests and the session need it).
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    // -----------------------------------------------------------------------
    // Workflow execution
    // -----------------------------------------------------------------------

    async fn execute_workflow(&mut self, def: &WorkflowDef, user_input: &str) -> Result<String> {
        let mut ctx = WorkflowContext::new(user_input);
        self.orchestrator.turn_tool_calls.clear();

        info!(workflow = %def.id, "starting workflow");

        self.orchestrator.bus().publish(EngineEvent::WorkflowStart {
            definition: client_view(def),
        });

        let total = def.steps.len();
        let mut failure: Option<EngineError> = None;

        for (idx, step) in def.steps.iter().enumerate() {
            self.orchestrator.bus().publish(EngineEvent::WorkflowState {
                state_id: step.id.clone(),
                status: StateStatus::Active,
                step: Some(idx + 1),
                total: Some(total),
                step_name: Some(step.name.clone()),
                detail: None,
                children: None,
                active_index: None,
            });

            if let Err(e) = self.execute_step(step, &mut ctx).await {
                error!(workflow = %def.id, step = %step.id, error = %e, "workflow step failed");
                failure = Some(e);
                break;
            }

            self.orchestrator.bus().publish(EngineEvent::WorkflowState {
                state_id: step.id.clone(),
                status: StateStatus::Visited,
                step: None,
                total: None,
                step_name: None,
                detail: None,
                children: None,
                active_index: None,
            });
        }

        let reply = match failure {
            Some(e) => format!("I ran into an issue during research: {e}"),
            None if ctx.final_answer.is_empty() => {
                "I completed the research but couldn't form a response.".to_owned()
            }
            None => ctx.final_answer.clone(),
        };

        self.orchestrator.bus().publish(EngineEvent::WorkflowExit {
            workflow_id: def.id.clone(),
        });

        // Only the final pair is persisted; intermediate reasoning is not.
        self.orchestrator.messages.push(Message::user(user_input));
        self.orchestrator.messages.push(Message::assistant(reply.clone()));

        Ok(reply)
    }

    async fn execute_step(&mut self, step: &WorkflowStep, ctx: &mut WorkflowContext) -> Result<()> {
        if !step.narration.is_empty() {
            let text = render_template(&step.narration, ctx);
            self.orchestrator
                .bus()
                .publish(EngineEvent::WorkflowNarration { text });
        }

        match step.kind {
            StepKind::Llm => self.execute_llm_step(step, ctx).await,
            StepKind::Loop => {
                self.execute_loop_step(step, ctx).await;
                Ok(())
            }
            StepKind::Direct => {
                self.execute_direct_step(step, ctx).await;
                Ok(())
            }
        }
    }

    /// One focused LLM call, result stored under the step id, then the
    /// fixed post-action for that id.
    async fn execute_llm_step(&mut self, step: &WorkflowStep, ctx: &mut WorkflowContext) -> Result<()> {
        let prompt = render_template(&step.prompt_template, ctx);
        info!(step = %step.id, prompt_chars = prompt.len(), "workflow llm step");

        self.orchestrator.bus().publish(EngineEvent::WorkflowActivity {
            activity: "Querying model...".into(),
            timeout_secs: LLM_TIMEOUT_SECS,
        });

        let messages = vec![json!({"role": "user", "content": prompt})];
        let raw = self
            .orchestrator
            .model()
            .generate(WORKFLOW_SYSTEM_PROMPT, &messages)
            .await
            .map_err(|e| EngineError::WorkflowStep {
                step_id: step.id.clone(),
                reason: e.to_string(),
            })?;

        let text = self.orchestrator.strip_thinking(&raw);
        ctx.step_results.insert(step.id.clone(), text.clone());

        self.orchestrator.bus().publish(EngineEvent::WorkflowDebug {
            diagnostics: json!({
                "step": step.id,
                "prompt_chars": prompt.len(),
                "response_chars": text.len(),
            }),
        });

        match step.id.as_str() {
            "decompose" => {
                ctx.search_queries = parse_query_list(&text, 5);
                info!(count = ctx.search_queries.len(), "decomposed into queries");
            }
            "evaluate_gaps" => {
                ctx.search_queries = parse_query_list(&text, 3);
            }
            "extract_claim" => match extract_json(&text) {
                Some(Value::Object(obj)) => {
                    let claim = obj
                        .get("claim")
                        .and_then(Value::as_str)
                        .unwrap_or(&text)
                        .to_owned();
                    ctx.step_results.insert(step.id.clone(), claim);
                    ctx.search_queries = ["support_query", "counter_query"]
                        .iter()
                        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
                        .filter(|q| !q.is_empty())
                        .map(str::to_owned)
                        .collect();
                }
                _ => {
                    // No structured claim: search for the user query itself.
                    ctx.search_queries = vec![ctx.user_query.clone()];
                }
            },
            "initial_search" | "initial_lookup" => {
                // The step generated a search query; dispatch it right away
                // and store the search output, not the query.
                let query = text.trim().trim_matches('"').trim_matches('\'').to_owned();
                info!(query = %query, "initial search query");

                self.orchestrator.bus().publish(EngineEvent::WorkflowActivity {
                    activity: format!("Searching: {}", truncate_chars(&query, 60)),
                    timeout_secs: SEARCH_TIMEOUT_SECS,
                });

                if step.tool_name.is_empty() {
                    ctx.step_results
                        .insert(step.id.clone(), "(search not available)".into());
                } else {
                    let result = self
                        .dispatch_recorded(&step.tool_name, json!({"query": query}))
                        .await;
                    ctx.step_results.insert(step.id.clone(), result);
                }
            }
            "synthesize" | "verdict" => {
                ctx.final_answer = text;
            }
            _ => {}
        }

        Ok(())
    }

    /// Dispatch the step's tool once per derived query, accumulating
    /// prefixed results.  A per-iteration failure is captured into the
    /// results and does not abort.
    async fn execute_loop_step(&mut self, step: &WorkflowStep, ctx: &mut WorkflowContext) {
        let queries = ctx.search_queries.clone();
        if queries.is_empty() {
            warn!(step = %step.id, "loop step has no queries to process");
            return;
        }

        self.publish_loop_update(&step.id, &queries, -1);

        let delay = self.orchestrator.config().loop_delay_ms;
        let mut results = Vec::with_capacity(queries.len());

        for (i, query) in queries.iter().enumerate() {
            // Rate-limit defense between successive searches.
            if i > 0 && delay > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }

            let label = format!(
                "Searching {}/{}: {}",
                i + 1,
                queries.len(),
                truncate_chars(query, 50)
            );

            self.orchestrator.bus().publish(EngineEvent::WorkflowState {
                state_id: step.id.clone(),
                status: StateStatus::Active,
                step: None,
                total: None,
                step_name: None,
                detail: Some(label.clone()),
                children: None,
                active_index: None,
            });
            self.publish_loop_update(&step.id, &queries, i as i64);
            self.orchestrator.bus().publish(EngineEvent::WorkflowActivity {
                activity: label,
                timeout_secs: SEARCH_TIMEOUT_SECS,
            });

            if step.tool_name.is_empty() {
                results.push(format!("[Query: {query}]\n(search not available)"));
            } else {
                let result = self
                    .dispatch_recorded(&step.tool_name, json!({"query": query}))
                    .await;
                results.push(format!("[Query: {query}]\n{result}"));
            }
        }

        ctx.search_results = results;
    }

    /// Dispatch the step's tool once; the query is picked by step id.
    async fn execute_direct_step(&mut self, step: &WorkflowStep, ctx: &mut WorkflowContext) {
        if step.tool_name.is_empty() {
            ctx.step_results
                .insert(step.id.clone(), "(tool not available)".into());
            return;
        }

        let query = match step.id.as_str() {
            "search_evidence" if !ctx.search_queries.is_empty() => ctx.search_queries[0].clone(),
            "search_counter" if ctx.search_queries.len() > 1 => ctx.search_queries[1].clone(),
            _ => ctx.user_query.clone(),
        };

        self.orchestrator.bus().publish(EngineEvent::WorkflowActivity {
            activity: format!("Executing {}...", step.tool_name),
            timeout_secs: SEARCH_TIMEOUT_SECS,
        });

        let result = self
            .dispatch_recorded(&step.tool_name, json!({"query": query}))
            .await;
        ctx.step_results.insert(step.id.clone(), result);
    }

    /// Dispatch through the registry, recording the call for the
    /// persistence sink's turn summary.
    async fn dispatch_recorded(&mut self, tool_name: &str, args: Value) -> String {
        self.orchestrator.turn_tool_calls.push(ToolCallRecord {
            name: tool_name.to_owned(),
            args: args.clone(),
        });
        self.orchestrator.registry().dispatch(tool_name, args).await
    }

    fn publish_loop_update(&self, state_id: &str, children: &[String], active_index: i64) {
        self.orchestrator.bus().publish(EngineEvent::WorkflowState {
            state_id: state_id.to_owned(),
            status: StateStatus::LoopUpdate,
            step: None,
            total: None,
            step_name: None,
            detail: None,
            children: Some(children.to_vec()),
            active_index: Some(active_index),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx_with(user_query: &str) -> WorkflowContext {
        WorkflowContext::new(user_query)
    }

    #[test]
    fn render_substitutes_the_fixed_key_set() {
        let mut ctx = ctx_with("compare the top 3 S&P 500 companies by market cap");
        ctx.search_queries = vec!["Apple AAPL".into(), "NVIDIA NVDA".into()];
        ctx.search_results = vec!["[Query: a]\nresult a".into(), "[Query: b]\nresult b".into()];
        ctx.step_results.insert("decompose".into(), "[\"x\"]".into());

        let out = render_template(
            "Q: {{user_query}}\nQueries:\n{{search_queries}}\nResults:\n{{search_results}}\nYear: {{current_year}}",
            &ctx,
        );
        assert!(out.contains("Q: compare the top 3"));
        assert!(out.contains("- Apple AAPL\n- NVIDIA NVDA"));
        assert!(out.contains("result a\n\n[Query: b]"));
        let year = Local::now().format("%Y").to_string();
        assert!(out.contains(&format!("Year: {year}")));
    }

    #[test]
    fn render_shortens_long_queries_for_narration() {
        let ctx = ctx_with(
            "tell me about the long and complicated history of the transcontinental railroad",
        );
        let out = render_template("Searching for {{user_query_short}}...", &ctx);
        assert!(out.contains("..."));
        assert!(out.len() < 80);
    }

    #[test]
    fn truncate_search_block_cuts_snippet_lines_only() {
        let long_snippet = format!("   {}", "x".repeat(300));
        let text = format!("1. Title (url)\n{long_snippet}\n2. Other (url)");
        let out = truncate_search_block(&text);

        assert!(out.contains("1. Title (url)"));
        assert!(out.contains("2. Other (url)"));
        // 150 chars + ellipsis, well under the original 303.
        assert!(out.lines().nth(1).unwrap().chars().count() < 160);
    }

    #[test]
    fn truncate_search_block_caps_total_size() {
        let text = "line\n".repeat(1000);
        let out = truncate_search_block(&text);
        assert!(out.ends_with("[...truncated]"));
        assert!(out.chars().count() < 2_600);
    }

    #[test]
    fn extract_json_handles_fenced_blocks() {
        assert_eq!(
            extract_json("```json\n[\"a\", \"b\"]\n```"),
            Some(json!(["a", "b"]))
        );
        assert_eq!(extract_json("[\"a\"]"), Some(json!(["a"])));
        assert_eq!(
            extract_json("```\n{\"claim\": \"x\"}\n```"),
            Some(json!({"claim": "x"}))
        );
        assert_eq!(extract_json("not json at all"), None);
    }

    #[test]
    fn parse_query_list_prefers_json_array() {
        let queries = parse_query_list("[\"q1\", \"q2\", \"q3\"]", 5);
        assert_eq!(queries, vec!["q1", "q2", "q3"]);
    }

    #[test]
    fn parse_query_list_falls_back_to_lines_with_cap() {
        let text = "1. first query\n- second query\n* third query\nfourth\nfifth\nsixth";
        let queries = parse_query_list(text, 5);
        assert_eq!(queries.len(), 5);
        assert_eq!(queries[0], "first query");
        assert_eq!(queries[1], "second query");
        assert_eq!(queries[2], "third query");
    }

    #[test]
    fn routing_respects_keywords_and_word_minimums() {
        let table = WorkflowTable::builtin();

        let def = table
            .route("compare the top 3 S&P 500 companies by market cap")
            .unwrap();
        assert_eq!(def.id, "research_compare");

        let def = table
            .route("is it true that water boils at 90 C")
            .unwrap();
        assert_eq!(def.id, "fact_check");

        let def = table
            .route("tell me about the latest advances in battery technology")
            .unwrap();
        assert_eq!(def.id, "deep_research");

        // Keyword present but the query is too short to be workflow-worthy.
        assert!(table.route("compare these two").is_none());
        // No keyword at all.
        assert!(table.route("hello there my friend how are you").is_none());
    }

    #[test]
    fn numeric_top_n_trigger_matches() {
        let table = WorkflowTable::builtin();
        let def = table
            .route("what are the top 5 largest cities in texas today")
            .unwrap();
        assert_eq!(def.id, "research_compare");
    }

    #[test]
    fn client_view_serializes_states_with_truncated_prompts() {
        let table = WorkflowTable::builtin();
        let def = table.get("research_compare").unwrap();
        let v = client_view(def);

        assert_eq!(v["workflow_id"], "research_compare");
        let states = v["states"].as_array().unwrap();
        assert_eq!(states.len(), 4);
        assert_eq!(states[0]["id"], "initial_lookup");
        assert_eq!(states[0]["type"], "llm");
        assert_eq!(states[0]["has_tool"], true);
        assert_eq!(states[2]["type"], "loop");
        assert!(states[1]["prompt_template"].as_str().unwrap().chars().count() <= 200);
    }

    #[test]
    fn builtin_step_sequences_match_the_shipped_designs() {
        let table = WorkflowTable::builtin();

        let ids = |id: &str| -> Vec<String> {
            table
                .get(id)
                .unwrap()
                .steps
                .iter()
                .map(|s| s.id.clone())
                .collect()
        };

        assert_eq!(
            ids("research_compare"),
            ["initial_lookup", "decompose", "search_each", "synthesize"]
        );
        assert_eq!(
            ids("deep_research"),
            ["initial_search", "evaluate_gaps", "targeted_search", "synthesize"]
        );
        assert_eq!(
            ids("fact_check"),
            ["extract_claim", "search_evidence", "search_counter", "verdict"]
        );
    }
}
