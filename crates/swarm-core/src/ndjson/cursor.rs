//! cursor-agent `--output-format stream-json` translation.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::blocks::{self, input_args};
use super::normalizer::{args_object, classify_tool, command_arg, path_arg, str_field};
use super::types::{EventBody, FileOp};

pub(super) fn translate(pending: &mut HashMap<String, String>, raw: &Value) -> Vec<EventBody> {
    match str_field(raw, "type") {
        Some("system") => blocks::system_init(raw),
        Some("thinking") => str_field(raw, "text")
            .filter(|t| !t.is_empty())
            .map(|t| {
                let complete = matches!(str_field(raw, "subtype"), Some("complete" | "completed"));
                EventBody::thinking(t, complete)
            })
            .into_iter()
            .collect(),
        Some("assistant") => blocks::assistant_blocks(pending, raw.get("message"), |name, input| {
            classify_tool(name, input_args(input))
        }),
        Some("user") => blocks::tool_results(pending, raw.get("message")),
        Some("tool_call") => tool_call(pending, raw),
        Some("tool_result") => vec![EventBody::ToolResult {
            tool: str_field(raw, "tool_name")
                .or_else(|| str_field(raw, "name"))
                .unwrap_or("unknown")
                .to_string(),
            args: Map::new(),
            success: raw.get("success").and_then(Value::as_bool).unwrap_or(true),
        }],
        Some("result") => blocks::result(raw),
        Some("error") => blocks::error(raw),
        _ => Vec::new(),
    }
}

/// `tool_call` payloads key the tool by name: `{"readToolCall": {"args": ...}}`.
fn tool_call(pending: &mut HashMap<String, String>, raw: &Value) -> Vec<EventBody> {
    let Some((key, call)) = raw
        .get("tool_call")
        .and_then(Value::as_object)
        .and_then(|obj| obj.iter().next())
    else {
        return Vec::new();
    };
    let (name, args) = if key == "function" {
        (
            str_field(call, "name").unwrap_or("function").to_string(),
            args_object(call.get("arguments")),
        )
    } else {
        (
            key.strip_suffix("ToolCall").unwrap_or(key).to_string(),
            args_object(call.get("args")),
        )
    };
    let call_id = str_field(raw, "call_id").unwrap_or("");

    match str_field(raw, "subtype") {
        Some("completed") => {
            let tool = pending.remove(call_id).unwrap_or(name);
            let success = call
                .get("result")
                .is_none_or(|r| r.get("error").is_none() && r.get("failure").is_none());
            vec![EventBody::ToolResult { tool, args, success }]
        }
        _ => {
            if !call_id.is_empty() {
                pending.insert(call_id.to_string(), name.clone());
            }
            vec![map_tool(&name, args)]
        }
    }
}

fn map_tool(name: &str, args: Map<String, Value>) -> EventBody {
    let file = || FileOp::new(path_arg(&args), Some(name));
    match name.to_ascii_lowercase().as_str() {
        "read" => EventBody::FileRead(file()),
        "write" | "edit" => EventBody::FileWrite(file()),
        "delete" => EventBody::FileDelete(file()),
        "shell" | "bash" => EventBody::Bash {
            command: command_arg(&args),
            tool: Some(name.to_string()),
        },
        _ => classify_tool(name, args),
    }
}
