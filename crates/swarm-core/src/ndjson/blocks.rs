//! Content-block handling shared by the cursor and claude streams.
//!
//! Both CLIs wrap assistant output as `{ "message": { "content": [...] } }`
//! with `text`, `thinking` and `tool_use` blocks, and report tool results on
//! `user` messages.

use std::collections::HashMap;

use serde_json::Value;

use super::normalizer::{args_object, error_text, parse_usage, single_entry, str_field};
use super::types::{EventBody, ResultStatus};

/// Fan out an assistant message into one event per content block.
///
/// `map_tool` turns a tool name and its input into the canonical body; each
/// tool id is remembered in `pending` for the matching result.
pub(super) fn assistant_blocks(
    pending: &mut HashMap<String, String>,
    message: Option<&Value>,
    map_tool: fn(&str, &Value) -> EventBody,
) -> Vec<EventBody> {
    let Some(content) = message.and_then(|m| m.get("content")) else {
        return Vec::new();
    };
    let blocks = match content {
        Value::String(text) if !text.is_empty() => return vec![EventBody::message(text.as_str(), true)],
        Value::Array(blocks) => blocks,
        _ => return Vec::new(),
    };

    let mut events = Vec::with_capacity(blocks.len());
    for block in blocks {
        match str_field(block, "type") {
            Some("text") => {
                if let Some(text) = str_field(block, "text").filter(|t| !t.is_empty()) {
                    events.push(EventBody::message(text, true));
                }
            }
            Some("thinking") => {
                if let Some(text) = str_field(block, "thinking").filter(|t| !t.is_empty()) {
                    events.push(EventBody::thinking(text, true));
                }
            }
            Some("tool_use") => {
                let name = str_field(block, "name").unwrap_or("unknown");
                if let Some(id) = str_field(block, "id") {
                    pending.insert(id.to_string(), name.to_string());
                }
                events.push(map_tool(name, block.get("input").unwrap_or(&Value::Null)));
            }
            _ => {}
        }
    }
    events
}

/// Tool results reported on a `user` message.
pub(super) fn tool_results(pending: &mut HashMap<String, String>, message: Option<&Value>) -> Vec<EventBody> {
    let Some(blocks) = message
        .and_then(|m| m.get("content"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };
    blocks
        .iter()
        .filter(|block| str_field(block, "type") == Some("tool_result"))
        .map(|block| {
            let id = str_field(block, "tool_use_id").unwrap_or("");
            let tool = pending.remove(id).unwrap_or_else(|| "unknown".to_string());
            let is_error = block.get("is_error").and_then(Value::as_bool).unwrap_or(false);
            EventBody::ToolResult {
                tool,
                args: single_entry("tool_use_id", Value::String(id.to_string())),
                success: !is_error,
            }
        })
        .collect()
}

/// `system` payloads: only the `init` subtype carries session data.
pub(super) fn system_init(raw: &Value) -> Vec<EventBody> {
    if str_field(raw, "subtype") != Some("init") {
        return Vec::new();
    }
    vec![EventBody::Init {
        session_id: str_field(raw, "session_id").map(String::from),
        model: str_field(raw, "model").map(String::from),
    }]
}

/// Terminal `result` payload.
pub(super) fn result(raw: &Value) -> Vec<EventBody> {
    let is_error = raw.get("is_error").and_then(Value::as_bool).unwrap_or(false);
    let status = ResultStatus::from_vendor(str_field(raw, "subtype"), is_error);
    let message = match status {
        ResultStatus::Success => None,
        ResultStatus::Error => error_text(raw.get("error"))
            .or_else(|| error_text(raw.get("result")))
            .or_else(|| str_field(raw, "subtype").map(String::from)),
    };
    vec![EventBody::Result {
        status,
        usage: parse_usage(raw.get("usage")),
        duration_ms: raw.get("duration_ms").and_then(Value::as_u64),
        message,
    }]
}

pub(super) fn error(raw: &Value) -> Vec<EventBody> {
    let message = error_text(raw.get("error"))
        .or_else(|| error_text(raw.get("message")))
        .unwrap_or_else(|| "unknown error".to_string());
    vec![EventBody::Error { message }]
}

/// Tool input as an argument map.
pub(super) fn input_args(input: &Value) -> serde_json::Map<String, Value> {
    args_object(Some(input))
}
