//! Knowledge-base tool — queries the personal RAG service.
//!
//! The RAG service indexes the user's repositories and documents; the model
//! calls this when a question is about the user's own projects rather than
//! general web knowledge.  The service being down is a normal condition for
//! a voice assistant, so every failure degrades to a spoken-friendly string
//! instead of an error.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::registry::Tool;

/// Per-query timeout.  Tight because the assistant is latency-sensitive and
/// the service is local.
const RAG_TIMEOUT_SECS: f64 = 2.0;

/// Number of chunks to retrieve per query.
const TOP_K: usize = 5;

/// Truncate long chunks to keep the model's context manageable.
const CHUNK_MAX_LEN: usize = 500;

/// Searches the personal knowledge base over HTTP.
pub struct KnowledgeBaseTool {
    http: reqwest::Client,
    rag_url: String,
    github_owner: Option<String>,
}

impl KnowledgeBaseTool {
    /// Create the tool against an explicit service URL.
    pub fn new(rag_url: impl Into<String>, github_owner: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs_f64(RAG_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            http,
            rag_url: rag_url.into(),
            github_owner: github_owner.filter(|o| !o.is_empty()),
        }
    }

    /// Create the tool from `RAG_URL` / `RAG_GITHUB_OWNER`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("RAG_URL").unwrap_or_else(|_| "http://localhost:8100".into()),
            std::env::var("RAG_GITHUB_OWNER").ok(),
        )
    }
}

#[async_trait]
impl Tool for KnowledgeBaseTool {
    fn name(&self) -> &str {
        "search_knowledge_base"
    }

    fn description(&self) -> &str {
        "Search personal knowledge base (GitHub repos, documents) for \
         relevant information about your projects, code, and documentation."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query about projects or code"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let Some(query) = args.get("query").and_then(Value::as_str).filter(|q| !q.is_empty())
        else {
            return Ok("Error: no search query provided.".into());
        };

        let resp = self
            .http
            .post(format!("{}/query", self.rag_url))
            .json(&serde_json::json!({"query": query, "top_k": TOP_K}))
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                warn!(timeout = RAG_TIMEOUT_SECS, "rag query timed out");
                return Ok("Knowledge base query timed out.".into());
            }
            Err(e) if e.is_connect() => {
                warn!(url = %self.rag_url, "rag service not reachable");
                return Ok("Knowledge base is currently unavailable (service not running).".into());
            }
            Err(e) => {
                warn!(error = %e, "rag query failed");
                return Ok(format!("Knowledge base query failed: {e}"));
            }
        };

        let data: Value = match resp.error_for_status() {
            Ok(r) => match r.json().await {
                Ok(v) => v,
                Err(e) => return Ok(format!("Knowledge base query failed: {e}")),
            },
            Err(e) => return Ok(format!("Knowledge base query failed: {e}")),
        };

        let result_count = data["results"].as_array().map(Vec::len).unwrap_or(0);
        info!(query, results = result_count, "rag query completed");

        Ok(format_knowledge_results(
            query,
            &data,
            self.github_owner.as_deref(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// Format RAG results, deduplicated by repository name (each repo shown once
/// with its best-scoring chunk).
fn format_knowledge_results(query: &str, data: &Value, github_owner: Option<&str>) -> String {
    let Some(results) = data["results"].as_array().filter(|r| !r.is_empty()) else {
        return format!("No results found in knowledge base for '{query}'.");
    };

    let mut seen: Vec<(&str, &Value)> = Vec::new();
    for r in results {
        let filename = r["filename"].as_str().unwrap_or("");
        let repo = filename.split('/').next().unwrap_or(filename);
        if !repo.is_empty() && !seen.iter().any(|(name, _)| *name == repo) {
            seen.push((repo, r));
        }
    }

    let mut lines = vec![format!("Knowledge base results for '{query}':")];
    for (i, (repo, r)) in seen.iter().enumerate() {
        let score = r["score"].as_f64().unwrap_or(0.0);
        let mut text = r["text"].as_str().unwrap_or("").trim().to_owned();
        if text.chars().count() > CHUNK_MAX_LEN {
            text = text.chars().take(CHUNK_MAX_LEN).collect::<String>() + "...";
        }
        lines.push(format!("{}. {repo} (score: {score:.2})", i + 1));
        if let Some(owner) = github_owner {
            lines.push(format!("   GitHub: https://github.com/{owner}/{repo}"));
        }
        lines.push(format!("   {text}"));
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
