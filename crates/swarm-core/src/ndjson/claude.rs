//! Claude `--output-format stream-json` translation.

use std::collections::HashMap;

use serde_json::Value;

use super::blocks::{self, input_args};
use super::normalizer::{classify_tool, command_arg, path_arg, str_field};
use super::types::{EventBody, FileOp};

pub(super) fn translate(pending: &mut HashMap<String, String>, raw: &Value) -> Vec<EventBody> {
    match str_field(raw, "type") {
        Some("system") => blocks::system_init(raw),
        Some("assistant") => blocks::assistant_blocks(pending, raw.get("message"), map_tool),
        Some("user") => blocks::tool_results(pending, raw.get("message")),
        Some("stream_event") => raw.get("event").map(stream_delta).unwrap_or_default(),
        Some("result") => blocks::result(raw),
        Some("error") => blocks::error(raw),
        _ => Vec::new(),
    }
}

/// Claude names its file and shell tools; everything else goes through the
/// generic heuristic.
fn map_tool(name: &str, input: &Value) -> EventBody {
    let args = input_args(input);
    let file = |path: String| FileOp::new(path, Some(name));
    match name {
        "Read" => EventBody::FileRead(file(path_arg(&args))),
        "Write" => EventBody::FileCreate(file(path_arg(&args))),
        "Edit" | "MultiEdit" => EventBody::FileWrite(file(path_arg(&args))),
        "NotebookEdit" => {
            let path = str_field(input, "notebook_path").unwrap_or("").to_string();
            EventBody::FileWrite(file(path))
        }
        "Bash" => EventBody::Bash {
            command: command_arg(&args),
            tool: Some(name.to_string()),
        },
        _ => classify_tool(name, args),
    }
}

/// Partial-message deltas become incomplete message/thinking events.
fn stream_delta(event: &Value) -> Vec<EventBody> {
    if str_field(event, "type") != Some("content_block_delta") {
        return Vec::new();
    }
    let Some(delta) = event.get("delta") else {
        return Vec::new();
    };
    match str_field(delta, "type") {
        Some("text_delta") => str_field(delta, "text")
            .map(|t| EventBody::message(t, false))
            .into_iter()
            .collect(),
        Some("thinking_delta") => str_field(delta, "thinking")
            .map(|t| EventBody::thinking(t, false))
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}
