//! Multi-provider LLM client.
//!
//! [`LlmClient`] speaks the Anthropic Messages API, OpenAI Chat Completions,
//! and Ollama `/api/chat`, selected at construction.  Callers depend on the
//! [`LanguageModel`] trait so stub providers can stand in during tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::debug;

use crate::convert::tools_payload;
use crate::error::{LlmError, Result};
use crate::provider::{LlmConfig, Provider};
use crate::types::{ToolCall, ToolSchema};

/// Anthropic API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// LanguageModel trait
// ---------------------------------------------------------------------------

/// The generation surface the rest of the workspace programs against.
///
/// `messages` are already in the active provider's wire format (see
/// [`crate::convert::history_to_wire`]); the system prompt is passed
/// separately and placed according to the provider's convention.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// The provider whose wire format this model expects.
    fn provider(&self) -> Provider;

    /// Plain generation: system + messages to text.
    async fn generate(&self, system: &str, messages: &[Value]) -> Result<String>;

    /// Tool-use generation: system + messages + schemas to text plus any
    /// tool calls the model requested.  An empty `tools` slice forces a
    /// text-only answer.
    async fn generate_with_tools(
        &self,
        system: &str,
        messages: &[Value],
        tools: &[ToolSchema],
    ) -> Result<(String, Vec<ToolCall>)>;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for the three supported providers.
///
/// The underlying connection pool is shared and constructed once; all
/// requests use the configured timeout (default 120 s).
pub struct LlmClient {
    config: LlmConfig,
    provider: Provider,
    http: reqwest::Client,
}

impl LlmClient {
    /// Create a client, resolving the active provider from the config.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let provider = config.resolve_provider();
        if !config.is_configured() {
            return Err(LlmError::NotConfigured {
                reason: format!("provider `{provider}` has no API key"),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Transport {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            config,
            provider,
            http,
        })
    }

    // -----------------------------------------------------------------------
    // Request building
    // -----------------------------------------------------------------------

    /// Build the JSON body for the resolved provider.  `tools` may be empty,
    /// in which case no tool declarations are sent.
    fn build_body(&self, system: &str, messages: &[Value], tools: &[ToolSchema]) -> Value {
        let model = self.config.model_for(self.provider);

        match self.provider {
            Provider::Anthropic => {
                let mut body = json!({
                    "model": model,
                    "max_tokens": self.config.max_tokens,
                    "system": system,
                    "messages": messages,
                });
                if !tools.is_empty() {
                    body["tools"] = tools_payload(self.provider, tools);
                }
                body
            }
            Provider::OpenAi => {
                let mut wire = vec![json!({"role": "system", "content": system})];
                wire.extend_from_slice(messages);
                let mut body = json!({
                    "model": model,
                    "max_tokens": self.config.max_tokens,
                    "messages": wire,
                });
                if !tools.is_empty() {
                    body["tools"] = tools_payload(self.provider, tools);
                }
                body
            }
            Provider::Ollama => {
                let mut wire = vec![json!({"role": "system", "content": system})];
                wire.extend_from_slice(messages);
                let mut body = json!({
                    "model": model,
                    "messages": wire,
                    "stream": false,
                });
                if !tools.is_empty() {
                    body["tools"] = tools_payload(self.provider, tools);
                }
                body
            }
        }
    }

    /// Send the request and return the parsed JSON body.
    async fn send(&self, body: &Value) -> Result<Value> {
        let request = match self.provider {
            Provider::Anthropic => self
                .http
                .post(format!("{}/v1/messages", self.config.anthropic_base_url))
                .header("x-api-key", &self.config.anthropic_api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
            Provider::OpenAi => self
                .http
                .post(format!(
                    "{}/v1/chat/completions",
                    self.config.openai_base_url
                ))
                .bearer_auth(&self.config.openai_api_key),
            Provider::Ollama => self
                .http
                .post(format!("{}/api/chat", self.config.ollama_url)),
        };

        debug!(provider = %self.provider, model = %body["model"], "sending llm request");

        let resp = request.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout {
                    seconds: self.config.timeout_secs,
                }
            } else {
                LlmError::Transport {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| LlmError::Transport {
            reason: format!("failed to read response body: {e}"),
        })?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::Auth {
                provider: self.provider.to_string(),
            });
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited {
                provider: self.provider.to_string(),
            });
        }
        if !status.is_success() {
            return Err(LlmError::Transport {
                reason: format!("provider returned {status}: {text}"),
            });
        }

        serde_json::from_str(&text).map_err(|e| LlmError::MalformedResponse {
            reason: format!("invalid JSON response: {e}"),
        })
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn generate(&self, system: &str, messages: &[Value]) -> Result<String> {
        let (text, _) = self.generate_with_tools(system, messages, &[]).await?;
        Ok(text)
    }

    async fn generate_with_tools(
        &self,
        system: &str,
        messages: &[Value],
        tools: &[ToolSchema],
    ) -> Result<(String, Vec<ToolCall>)> {
        let body = self.build_body(system, messages, tools);
        let response = self.send(&body).await?;

        let (text, calls) = match self.provider {
            Provider::Anthropic => parse_anthropic_response(&response)?,
            Provider::OpenAi => parse_openai_response(&response)?,
            Provider::Ollama => parse_ollama_response(&response)?,
        };

        debug!(
            provider = %self.provider,
            chars = text.len(),
            tool_calls = calls.len(),
            "llm response received"
        );

        Ok((text, calls))
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parse an Anthropic Messages API response: content is an array of typed
/// blocks (`text` and `tool_use`).
fn parse_anthropic_response(v: &Value) -> Result<(String, Vec<ToolCall>)> {
    let content = v["content"]
        .as_array()
        .ok_or_else(|| LlmError::MalformedResponse {
            reason: "missing `content` array".into(),
        })?;

    let mut text = String::new();
    let mut calls: Vec<ToolCall> = Vec::new();

    for block in content {
        match block["type"].as_str() {
            Some("text") => {
                if let Some(t) = block["text"].as_str() {
                    text.push_str(t);
                }
            }
            Some("tool_use") => {
                calls.push(ToolCall {
                    id: block["id"].as_str().map(str::to_owned),
                    name: block["name"].as_str().unwrap_or_default().to_owned(),
                    arguments: block["input"].clone(),
                });
            }
            _ => {}
        }
    }

    Ok((text, calls))
}

/// Parse an OpenAI Chat Completions response.  Echoed arguments arrive as a
/// JSON string and are decoded back into a native object.
fn parse_openai_response(v: &Value) -> Result<(String, Vec<ToolCall>)> {
    let message = v
        .pointer("/choices/0/message")
        .ok_or_else(|| LlmError::MalformedResponse {
            reason: "missing `choices[0].message`".into(),
        })?;

    let text = message["content"].as_str().unwrap_or_default().to_owned();

    let mut calls: Vec<ToolCall> = Vec::new();
    if let Some(wire_calls) = message["tool_calls"].as_array() {
        for wc in wire_calls {
            let arguments = match &wc["function"]["arguments"] {
                Value::String(s) => serde_json::from_str(s)?,
                other => other.clone(),
            };
            calls.push(ToolCall {
                id: wc["id"].as_str().map(str::to_owned),
                name: wc["function"]["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_owned(),
                arguments,
            });
        }
    }

    Ok((text, calls))
}

/// Parse an Ollama `/api/chat` response.  Tool calls carry no ids.
fn parse_ollama_response(v: &Value) -> Result<(String, Vec<ToolCall>)> {
    let message = v
        .get("message")
        .ok_or_else(|| LlmError::MalformedResponse {
            reason: "missing `message` object".into(),
        })?;

    let text = message["content"].as_str().unwrap_or_default().to_owned();

    let mut calls: Vec<ToolCall> = Vec::new();
    if let Some(wire_calls) = message["tool_calls"].as_array() {
        for wc in wire_calls {
            calls.push(ToolCall {
                id: None,
                name: wc["function"]["name"]
                    .as_str()
                    .unwrap_or_default()
                    .to_owned(),
                arguments: wc["function"]
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| json!({})),
            });
        }
    }

    Ok((text, calls))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::build_tool_result_messages;

    fn client_for(provider: Provider) -> LlmClient {
        let config = LlmConfig {
            provider: Some(provider),
            anthropic_api_key: "test-key".into(),
            openai_api_key: "test-key".into(),
            ..Default::default()
        };
        LlmClient::new(config).unwrap()
    }

    #[test]
    fn anthropic_body_keeps_system_separate() {
        let client = client_for(Provider::Anthropic);
        let messages = vec![json!({"role": "user", "content": "hi"})];
        let body = client.build_body("Be brief.", &messages, &[]);

        assert_eq!(body["system"], "Be brief.");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn openai_body_prepends_system_message() {
        let client = client_for(Provider::OpenAi);
        let messages = vec![json!({"role": "user", "content": "hi"})];
        let body = client.build_body("Be brief.", &messages, &[]);

        let wire = body["messages"].as_array().unwrap();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[0]["content"], "Be brief.");
        assert!(body.get("system").is_none());
    }

    #[test]
    fn ollama_body_disables_streaming() {
        let client = client_for(Provider::Ollama);
        let body = client.build_body("sys", &[json!({"role": "user", "content": "hi"})], &[]);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[test]
    fn tools_included_only_when_present() {
        let client = client_for(Provider::Anthropic);
        let tools = vec![ToolSchema {
            name: "web_search".into(),
            description: "Search".into(),
            parameters: json!({"type": "object", "properties": {}, "required": []}),
        }];
        let body = client.build_body("sys", &[], &tools);
        assert_eq!(body["tools"][0]["name"], "web_search");
    }

    #[test]
    fn missing_key_is_rejected() {
        let config = LlmConfig {
            provider: Some(Provider::Anthropic),
            ..Default::default()
        };
        assert!(LlmClient::new(config).is_err());
    }

    #[test]
    fn parse_anthropic_text_and_tool_use() {
        let v = json!({
            "content": [
                {"type": "text", "text": "Checking."},
                {"type": "tool_use", "id": "toolu_01", "name": "web_search",
                 "input": {"query": "rust 2026"}}
            ],
            "stop_reason": "tool_use"
        });
        let (text, calls) = parse_anthropic_response(&v).unwrap();
        assert_eq!(text, "Checking.");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id.as_deref(), Some("toolu_01"));
        assert_eq!(calls[0].arguments["query"], "rust 2026");
    }

    #[test]
    fn parse_openai_decodes_string_arguments() {
        let v = json!({
            "choices": [{"message": {
                "content": null,
                "tool_calls": [{
                    "id": "call_abc",
                    "type": "function",
                    "function": {"name": "web_search",
                                 "arguments": "{\"query\": \"rust 2026\"}"}
                }]
            }}]
        });
        let (text, calls) = parse_openai_response(&v).unwrap();
        assert!(text.is_empty());
        assert_eq!(calls[0].name, "web_search");
        assert_eq!(calls[0].arguments["query"], "rust 2026");
    }

    #[test]
    fn parse_ollama_tool_calls_without_ids() {
        let v = json!({
            "message": {
                "content": "",
                "tool_calls": [{"function": {"name": "web_search",
                                             "arguments": {"query": "x"}}}]
            }
        });
        let (_, calls) = parse_ollama_response(&v).unwrap();
        assert_eq!(calls[0].id, None);
        assert_eq!(calls[0].arguments["query"], "x");
    }

    #[test]
    fn parse_rejects_malformed_bodies() {
        assert!(parse_anthropic_response(&json!({"oops": true})).is_err());
        assert!(parse_openai_response(&json!({"choices": []})).is_err());
        assert!(parse_ollama_response(&json!({})).is_err());
    }

    /// Encoding a tool group and decoding the assistant message back must
    /// round-trip call names and arguments for every provider.
    #[test]
    fn tool_group_round_trips_through_wire_format() {
        let calls = vec![
            ToolCall {
                id: Some("tc_01".into()),
                name: "web_search".into(),
                arguments: json!({"query": "austin weather"}),
            },
            ToolCall {
                id: Some("tc_02".into()),
                name: "check_calendar".into(),
                arguments: json!({"date": "2026-08-01"}),
            },
        ];
        let results = vec!["sunny".to_string(), "free all day".to_string()];

        // Anthropic: the assistant echo is a content-block message, the same
        // shape the Messages API returns.
        let wire = build_tool_result_messages(Provider::Anthropic, &calls, &results, "");
        let (_, decoded) = parse_anthropic_response(&wire[0]).unwrap();
        assert_eq!(decoded, calls);

        // OpenAI: wrap the echoed assistant message in a completions body.
        let wire = build_tool_result_messages(Provider::OpenAi, &calls, &results, "");
        let body = json!({"choices": [{"message": wire[0]}]});
        let (_, decoded) = parse_openai_response(&body).unwrap();
        assert_eq!(decoded, calls);

        // Ollama: ids are not part of the wire format and come back empty.
        let wire = build_tool_result_messages(Provider::Ollama, &calls, &results, "");
        let body = json!({"message": wire[0]});
        let (_, decoded) = parse_ollama_response(&body).unwrap();
        assert_eq!(decoded.len(), 2);
        for (d, c) in decoded.iter().zip(&calls) {
            assert_eq!(d.id, None);
            assert_eq!(d.name, c.name);
            assert_eq!(d.arguments, c.arguments);
        }
    }
}
