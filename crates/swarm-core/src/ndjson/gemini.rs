//! Gemini `--output-format stream-json` translation.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::normalizer::{args_object, classify_tool, error_text, parse_usage, str_field};
use super::types::{EventBody, ResultStatus};

pub(super) fn translate(pending: &mut HashMap<String, String>, raw: &Value) -> Vec<EventBody> {
    match str_field(raw, "type") {
        Some("init") => vec![EventBody::Init {
            session_id: str_field(raw, "session_id").map(String::from),
            model: str_field(raw, "model").map(String::from),
        }],
        Some("message") => message(raw),
        Some("tool_use" | "tool_call") => {
            let name = str_field(raw, "tool_name")
                .or_else(|| str_field(raw, "name"))
                .unwrap_or("unknown");
            if let Some(id) = str_field(raw, "tool_id") {
                pending.insert(id.to_string(), name.to_string());
            }
            let args = args_object(raw.get("parameters").or_else(|| raw.get("args")));
            vec![classify_tool(name, args)]
        }
        Some("tool_result") => {
            let tool = str_field(raw, "tool_id")
                .and_then(|id| pending.remove(id))
                .or_else(|| str_field(raw, "tool_name").map(String::from))
                .unwrap_or_else(|| "unknown".to_string());
            let status = ResultStatus::from_vendor(str_field(raw, "status"), raw.get("error").is_some());
            vec![EventBody::ToolResult {
                tool,
                args: Map::new(),
                success: status == ResultStatus::Success,
            }]
        }
        Some("error") => {
            let message = error_text(raw.get("message"))
                .or_else(|| error_text(raw.get("error")))
                .unwrap_or_else(|| "unknown error".to_string());
            if str_field(raw, "severity").is_some_and(|s| s.eq_ignore_ascii_case("warning")) {
                vec![EventBody::Warning { message }]
            } else {
                vec![EventBody::Error { message }]
            }
        }
        Some("result") => {
            let status = ResultStatus::from_vendor(str_field(raw, "status"), false);
            let stats = raw.get("stats");
            vec![EventBody::Result {
                status,
                usage: parse_usage(stats),
                duration_ms: stats
                    .and_then(|s| s.get("duration_ms"))
                    .and_then(Value::as_u64),
                message: error_text(raw.get("error")),
            }]
        }
        _ => Vec::new(),
    }
}

/// Only assistant messages are activity; `delta: true` marks a fragment.
fn message(raw: &Value) -> Vec<EventBody> {
    let role = str_field(raw, "role").unwrap_or("assistant");
    if role != "assistant" {
        return Vec::new();
    }
    let Some(content) = str_field(raw, "content").filter(|c| !c.is_empty()) else {
        return Vec::new();
    };
    let is_delta = raw.get("delta").and_then(Value::as_bool).unwrap_or(false);
    vec![EventBody::message(content, !is_delta)]
}
