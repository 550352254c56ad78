//! Wire-format projection — the single point of provider divergence.
//!
//! The three providers disagree on three axes: where the system prompt
//! lives, how an assistant's tool calls are echoed back to the model, and
//! whether arguments travel as native objects or JSON strings.  Everything
//! provider-specific about *messages* is concentrated here; the rest of the
//! workspace only ever sees [`Message`] and [`ToolCall`].
//!
//! All functions in this module are pure: equal inputs produce byte-equal
//! output.

use serde_json::{Value, json};

use crate::provider::Provider;
use crate::types::{Message, Role, ToolCall, ToolSchema};

// ---------------------------------------------------------------------------
// Tool schema payloads
// ---------------------------------------------------------------------------

/// Convert tool schemas into the provider's tool-declaration format.
///
/// Anthropic takes `input_schema` directly; OpenAI and Ollama wrap each
/// schema in a `{"type": "function", "function": {...}}` envelope.
pub fn tools_payload(provider: Provider, tools: &[ToolSchema]) -> Value {
    let values: Vec<Value> = match provider {
        Provider::Anthropic => tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect(),
        Provider::OpenAi | Provider::Ollama => tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    },
                })
            })
            .collect(),
    };
    Value::Array(values)
}

// ---------------------------------------------------------------------------
// Tool result messages
// ---------------------------------------------------------------------------

/// Convert one completed assistant-plus-tool-group into the provider's
/// native follow-up messages.
///
/// `results` are positional: `results[i]` answers `calls[i]`.  A group that
/// was cut short (fewer results than calls) converts only the answered
/// prefix, which keeps partially-recorded histories sendable.
///
/// `preface_text` is any text the model produced alongside the calls.
pub fn build_tool_result_messages(
    provider: Provider,
    calls: &[ToolCall],
    results: &[String],
    preface_text: &str,
) -> Vec<Value> {
    match provider {
        Provider::Anthropic => anthropic_tool_result_messages(calls, results, preface_text),
        Provider::OpenAi => openai_tool_result_messages(calls, results, preface_text),
        Provider::Ollama => ollama_tool_result_messages(calls, results, preface_text),
    }
}

/// Anthropic: assistant content is `[text?, tool_use...]` blocks, then one
/// user message whose content is the matching `tool_result` blocks.
fn anthropic_tool_result_messages(
    calls: &[ToolCall],
    results: &[String],
    preface_text: &str,
) -> Vec<Value> {
    let mut assistant_content: Vec<Value> = Vec::with_capacity(calls.len() + 1);
    if !preface_text.is_empty() {
        assistant_content.push(json!({ "type": "text", "text": preface_text }));
    }
    for call in calls {
        assistant_content.push(json!({
            "type": "tool_use",
            "id": call.id.as_deref().unwrap_or(""),
            "name": call.name,
            "input": call.arguments,
        }));
    }

    let user_content: Vec<Value> = results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            json!({
                "type": "tool_result",
                "tool_use_id": calls.get(i).and_then(|c| c.id.as_deref()).unwrap_or(""),
                "content": result,
            })
        })
        .collect();

    vec![
        json!({ "role": "assistant", "content": assistant_content }),
        json!({ "role": "user", "content": user_content }),
    ]
}

/// OpenAI: assistant message with a `tool_calls` array (JSON-string
/// arguments), then one `role: tool` message per result tagged with the
/// originating `tool_call_id`.
fn openai_tool_result_messages(
    calls: &[ToolCall],
    results: &[String],
    preface_text: &str,
) -> Vec<Value> {
    let wire_calls: Vec<Value> = calls
        .iter()
        .enumerate()
        .map(|(i, call)| {
            json!({
                "id": openai_call_id(call, i),
                "type": "function",
                "function": {
                    "name": call.name,
                    "arguments": call.arguments.to_string(),
                },
            })
        })
        .collect();

    let mut messages = vec![json!({
        "role": "assistant",
        "content": if preface_text.is_empty() { Value::Null } else { Value::from(preface_text) },
        "tool_calls": wire_calls,
    })];

    for (i, result) in results.iter().enumerate() {
        let id = calls
            .get(i)
            .map(|c| openai_call_id(c, i))
            .unwrap_or_else(|| format!("call_{i}"));
        messages.push(json!({
            "role": "tool",
            "tool_call_id": id,
            "content": result,
        }));
    }

    messages
}

/// OpenAI requires an id on every echoed call; synthesize a positional one
/// when the model never supplied it (text-fallback parsed calls).
fn openai_call_id(call: &ToolCall, index: usize) -> String {
    call.id.clone().unwrap_or_else(|| format!("call_{index}"))
}

/// Ollama: assistant message with id-less `tool_calls`, then bare
/// `role: tool` messages in call order.
fn ollama_tool_result_messages(
    calls: &[ToolCall],
    results: &[String],
    preface_text: &str,
) -> Vec<Value> {
    let wire_calls: Vec<Value> = calls
        .iter()
        .map(|call| {
            json!({
                "function": {
                    "name": call.name,
                    "arguments": call.arguments,
                },
            })
        })
        .collect();

    let mut messages = vec![json!({
        "role": "assistant",
        "content": preface_text,
        "tool_calls": wire_calls,
    })];

    for result in results {
        messages.push(json!({ "role": "tool", "content": result }));
    }

    messages
}

// ---------------------------------------------------------------------------
// History conversion
// ---------------------------------------------------------------------------

/// Project an internal history into the provider's wire messages.
///
/// Plain user/assistant messages pass through as `{role, content}`.  At each
/// tool-group boundary (an assistant message with calls plus the contiguous
/// tool messages that follow it) the whole group is substituted via
/// [`build_tool_result_messages`].
pub fn history_to_wire(provider: Provider, messages: &[Message]) -> Vec<Value> {
    let mut wire: Vec<Value> = Vec::with_capacity(messages.len());
    let mut i = 0;

    while i < messages.len() {
        let msg = &messages[i];

        if msg.has_tool_calls() {
            // Gather the contiguous tool results that answer this group.
            let mut results: Vec<String> = Vec::new();
            let mut j = i + 1;
            while j < messages.len() && messages[j].role == Role::Tool {
                results.push(messages[j].content.clone());
                j += 1;
            }

            wire.extend(build_tool_result_messages(
                provider,
                &msg.tool_calls,
                &results,
                &msg.content,
            ));
            i = j;
        } else {
            wire.push(json!({
                "role": role_name(msg.role),
                "content": msg.content,
            }));
            i += 1;
        }
    }

    wire
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_calls() -> Vec<ToolCall> {
        vec![
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
        ]
    }

    fn sample_results() -> Vec<String> {
        vec!["sunny, 95F".into(), "no events".into()]
    }

    #[test]
    fn anthropic_group_shape() {
        let msgs = build_tool_result_messages(
            Provider::Anthropic,
            &sample_calls(),
            &sample_results(),
            "Let me check.",
        );
        assert_eq!(msgs.len(), 2);

        let assistant = &msgs[0];
        assert_eq!(assistant["role"], "assistant");
        let content = assistant["content"].as_array().unwrap();
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "tool_use");
        assert_eq!(content[1]["id"], "tc_01");
        assert_eq!(content[1]["input"]["query"], "austin weather");

        let user = &msgs[1];
        assert_eq!(user["role"], "user");
        let results = user["content"].as_array().unwrap();
        assert_eq!(results[0]["type"], "tool_result");
        assert_eq!(results[0]["tool_use_id"], "tc_01");
        assert_eq!(results[1]["tool_use_id"], "tc_02");
        assert_eq!(results[1]["content"], "no events");
    }

    #[test]
    fn anthropic_omits_empty_preface_block() {
        let msgs =
            build_tool_result_messages(Provider::Anthropic, &sample_calls(), &sample_results(), "");
        let content = msgs[0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "tool_use");
    }

    #[test]
    fn openai_group_shape_stringifies_arguments() {
        let msgs = build_tool_result_messages(
            Provider::OpenAi,
            &sample_calls(),
            &sample_results(),
            "",
        );
        assert_eq!(msgs.len(), 3);

        let assistant = &msgs[0];
        assert_eq!(assistant["role"], "assistant");
        assert!(assistant["content"].is_null());
        let calls = assistant["tool_calls"].as_array().unwrap();
        assert_eq!(calls[0]["type"], "function");
        // Arguments are a JSON string on the OpenAI echo path.
        let args = calls[0]["function"]["arguments"].as_str().unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(args).unwrap(),
            json!({"query": "austin weather"})
        );

        assert_eq!(msgs[1]["role"], "tool");
        assert_eq!(msgs[1]["tool_call_id"], "tc_01");
        assert_eq!(msgs[2]["tool_call_id"], "tc_02");
    }

    #[test]
    fn openai_synthesizes_missing_ids() {
        let calls = vec![ToolCall::new("web_search", json!({"query": "x"}))];
        let results = vec!["r".to_string()];
        let msgs = build_tool_result_messages(Provider::OpenAi, &calls, &results, "");
        assert_eq!(msgs[0]["tool_calls"][0]["id"], "call_0");
        assert_eq!(msgs[1]["tool_call_id"], "call_0");
    }

    #[test]
    fn ollama_group_shape_has_no_ids() {
        let msgs = build_tool_result_messages(
            Provider::Ollama,
            &sample_calls(),
            &sample_results(),
            "checking",
        );
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0]["content"], "checking");
        let calls = msgs[0]["tool_calls"].as_array().unwrap();
        assert!(calls[0].get("id").is_none());
        assert_eq!(calls[0]["function"]["name"], "web_search");
        assert_eq!(calls[0]["function"]["arguments"]["query"], "austin weather");
        assert_eq!(msgs[1], json!({"role": "tool", "content": "sunny, 95F"}));
    }

    #[test]
    fn conversion_is_pure() {
        for provider in [Provider::Anthropic, Provider::OpenAi, Provider::Ollama] {
            let a = build_tool_result_messages(provider, &sample_calls(), &sample_results(), "hi");
            let b = build_tool_result_messages(provider, &sample_calls(), &sample_results(), "hi");
            assert_eq!(
                serde_json::to_string(&a).unwrap(),
                serde_json::to_string(&b).unwrap()
            );
        }
    }

    #[test]
    fn history_substitutes_groups_in_place() {
        let history = vec![
            Message::user("what's the weather in austin?"),
            Message::assistant_tool_calls(
                "",
                vec![ToolCall {
                    id: Some("tc_01".into()),
                    name: "web_search".into(),
                    arguments: json!({"query": "austin weather"}),
                }],
            ),
            Message::tool_result("sunny"),
            Message::assistant("It's sunny in Austin."),
        ];

        let wire = history_to_wire(Provider::Anthropic, &history);
        // user + (assistant blocks + tool_result user) + assistant = 4
        assert_eq!(wire.len(), 4);
        assert_eq!(wire[0]["role"], "user");
        assert_eq!(wire[1]["content"][0]["type"], "tool_use");
        assert_eq!(wire[2]["content"][0]["type"], "tool_result");
        assert_eq!(wire[3], json!({"role": "assistant", "content": "It's sunny in Austin."}));

        let wire = history_to_wire(Provider::OpenAi, &history);
        // user + assistant(tool_calls) + tool + assistant = 4
        assert_eq!(wire.len(), 4);
        assert_eq!(wire[1]["tool_calls"][0]["id"], "tc_01");
        assert_eq!(wire[2]["role"], "tool");
    }

    #[test]
    fn tools_payload_shapes() {
        let tools = vec![ToolSchema {
            name: "web_search".into(),
            description: "Search the web".into(),
            parameters: json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        }];

        let anthropic = tools_payload(Provider::Anthropic, &tools);
        assert_eq!(anthropic[0]["name"], "web_search");
        assert!(anthropic[0]["input_schema"].is_object());

        let openai = tools_payload(Provider::OpenAi, &tools);
        assert_eq!(openai[0]["type"], "function");
        assert_eq!(openai[0]["function"]["parameters"]["required"][0], "query");
    }
}
