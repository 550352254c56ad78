//! Tool trait, registry, and alias table.
//!
//! The registry is immutable after construction: it is built from a fixed
//! tool list at startup and shared behind `Arc`.  Dispatch deliberately
//! never returns an error -- a missing tool or a failing handler produces a
//! string result, and the model decides how to recover.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use sotto_llm::ToolSchema;

use crate::calendar::CalendarTool;
use crate::datetime::DateTimeTool;
use crate::error::{Result, ToolError};
use crate::knowledge::KnowledgeBaseTool;
use crate::search::SearchClient;

// ---------------------------------------------------------------------------
// Tool trait
// ---------------------------------------------------------------------------

/// A single executable tool.
///
/// Implementations return their result as a plain string: that string is
/// fed back to the model verbatim as a tool-role message.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Canonical tool name (what the model must call).
    fn name(&self) -> &str;

    /// Human-readable description exposed to the model.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments (object type, `required` list).
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Alias table
// ---------------------------------------------------------------------------

/// Default mapping from model-emitted names to canonical tool names.
///
/// Small local models routinely misname tools (`gc_search`, bare `search`);
/// the text-fallback parser consults this table before giving up on a name.
pub fn default_aliases() -> HashMap<String, String> {
    let pairs = [
        ("gc_search", "web_search"),
        ("search", "web_search"),
        ("web_search", "web_search"),
        ("check_calendar", "check_calendar"),
        ("calendar", "check_calendar"),
        ("get_calendar", "check_calendar"),
        ("search_notes", "search_knowledge_base"),
        ("notes", "search_knowledge_base"),
        ("get_notes", "search_knowledge_base"),
        ("search_knowledge_base", "search_knowledge_base"),
        ("get_current_datetime", "get_current_datetime"),
    ];
    pairs
        .into_iter()
        .map(|(a, c)| (a.to_owned(), c.to_owned()))
        .collect()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Read-only registry of tools, keyed by canonical name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Registration order, so schema exports are stable.
    order: Vec<String>,
    aliases: HashMap<String, String>,
}

impl ToolRegistry {
    /// Build a registry from an explicit tool list and alias table.
    pub fn new(tools: Vec<Arc<dyn Tool>>, aliases: HashMap<String, String>) -> Self {
        let mut map = HashMap::with_capacity(tools.len());
        let mut order = Vec::with_capacity(tools.len());
        for tool in tools {
            let name = tool.name().to_owned();
            order.push(name.clone());
            map.insert(name, tool);
        }
        Self {
            tools: map,
            order,
            aliases,
        }
    }

    /// Build the standard registry: web search, datetime, calendar, and the
    /// knowledge base, configured from the environment.
    pub fn builtin() -> Self {
        let search = Arc::new(SearchClient::from_env());
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(WebSearchTool::new(search)),
            Arc::new(DateTimeTool),
            Arc::new(CalendarTool),
            Arc::new(KnowledgeBaseTool::from_env()),
        ];
        Self::new(tools, default_aliases())
    }

    /// Whether a canonical tool name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Resolve a model-emitted name to a canonical tool name.
    pub fn resolve_alias(&self, name: &str) -> Option<&str> {
        self.aliases.get(name).map(String::as_str)
    }

    /// Export every registered tool's schema, in registration order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolSchema {
                name: tool.name().to_owned(),
                description: tool.description().to_owned(),
                parameters: tool.parameters_schema(),
            })
            .collect()
    }

    /// Export schemas minus the two disable lists (admin-level and
    /// user-level).  A tool disabled in either list is omitted.
    pub fn schemas_filtered(
        &self,
        disabled_admin: &HashSet<String>,
        disabled_user: &HashSet<String>,
    ) -> Vec<ToolSchema> {
        self.schemas()
            .into_iter()
            .filter(|s| !disabled_admin.contains(&s.name) && !disabled_user.contains(&s.name))
            .collect()
    }

    /// Execute a tool by canonical name.
    ///
    /// Never fails from the caller's perspective: a missing tool or a
    /// handler error is rendered into the returned string, which is exactly
    /// what the model receives as the tool result.
    pub async fn dispatch(&self, name: &str, args: Value) -> String {
        let Some(tool) = self.tools.get(name) else {
            warn!(tool = %name, "dispatch to unknown tool");
            return format!("Error: unknown tool '{name}'");
        };

        debug!(tool = %name, "dispatching tool");
        match tool.execute(args).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = %name, error = %e, "tool execution failed");
                format!("Error executing '{name}': {e}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Web search tool
// ---------------------------------------------------------------------------

/// The first search tool: wraps the provider fallback chain in
/// [`SearchClient`].
pub struct WebSearchTool {
    search: Arc<SearchClient>,
}

impl WebSearchTool {
    /// Create the tool over a shared search client.
    pub fn new(search: Arc<SearchClient>) -> Self {
        Self { search }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current information. Use for weather, news, \
         prices, recent events, or anything requiring up-to-date data."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| ToolError::InvalidParams {
                tool_name: "web_search".into(),
                reason: "missing required string field `query`".into(),
            })?;

        match self.search.search(query).await {
            Some(formatted) => Ok(formatted),
            None => Ok(format!(
                "Web search failed for '{query}'. All search providers returned no results."
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the input back."
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}},
                   "required": ["text"]})
        }
        async fn execute(&self, args: Value) -> Result<String> {
            Ok(args["text"].as_str().unwrap_or_default().to_owned())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always fails."
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}, "required": []})
        }
        async fn execute(&self, _args: Value) -> Result<String> {
            Err(ToolError::Execution {
                tool_name: "broken".into(),
                reason: "backend offline".into(),
            })
        }
    }

    fn test_registry() -> ToolRegistry {
        ToolRegistry::new(
            vec![Arc::new(EchoTool), Arc::new(FailingTool)],
            default_aliases(),
        )
    }

    #[tokio::test]
    async fn dispatch_executes_registered_tool() {
        let registry = test_registry();
        let result = registry.dispatch("echo", json!({"text": "hi"})).await;
        assert_eq!(result, "hi");
    }

    #[tokio::test]
    async fn dispatch_unknown_tool_returns_error_string() {
        let registry = test_registry();
        let result = registry.dispatch("nope", json!({})).await;
        assert_eq!(result, "Error: unknown tool 'nope'");
    }

    #[tokio::test]
    async fn dispatch_captures_handler_failures() {
        let registry = test_registry();
        let result = registry.dispatch("broken", json!({})).await;
        assert!(result.starts_with("Error executing 'broken':"));
        assert!(result.contains("backend offline"));
    }

    #[test]
    fn schemas_preserve_registration_order() {
        let registry = test_registry();
        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].name, "echo");
        assert_eq!(schemas[1].name, "broken");
    }

    #[test]
    fn schemas_filtered_honors_both_disable_lists() {
        let registry = test_registry();

        let admin: HashSet<String> = ["echo".to_owned()].into();
        let user: HashSet<String> = HashSet::new();
        let schemas = registry.schemas_filtered(&admin, &user);
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "broken");

        let admin: HashSet<String> = HashSet::new();
        let user: HashSet<String> = ["broken".to_owned()].into();
        let schemas = registry.schemas_filtered(&admin, &user);
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].name, "echo");
    }

    #[test]
    fn alias_resolution_covers_model_misnaming() {
        let registry = test_registry();
        assert_eq!(registry.resolve_alias("gc_search"), Some("web_search"));
        assert_eq!(registry.resolve_alias("search"), Some("web_search"));
        assert_eq!(registry.resolve_alias("calendar"), Some("check_calendar"));
        assert_eq!(registry.resolve_alias("made_up_tool"), None);
    }
}
