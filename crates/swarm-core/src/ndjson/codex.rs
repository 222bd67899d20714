//! Codex `exec --json` stream translation.

use serde_json::Value;

use super::normalizer::{args_object, classify_tool, error_text, parse_usage, single_entry, str_field};
use super::types::{EventBody, FileOp, ResultStatus};

pub(super) fn translate(raw: &Value) -> Vec<EventBody> {
    match str_field(raw, "type") {
        Some("thread.started") => vec![EventBody::Init {
            session_id: str_field(raw, "thread_id").map(String::from),
            model: str_field(raw, "model").map(String::from),
        }],
        Some("turn.started") => vec![EventBody::TurnStart],
        Some("item.completed") => raw.get("item").map(translate_item).unwrap_or_default(),
        Some("turn.completed") => vec![EventBody::Result {
            status: ResultStatus::Success,
            usage: parse_usage(raw.get("usage")),
            duration_ms: None,
            message: None,
        }],
        Some("turn.failed") => vec![EventBody::Result {
            status: ResultStatus::Error,
            usage: parse_usage(raw.get("usage")),
            duration_ms: None,
            message: error_text(raw.get("error")),
        }],
        Some("error") => vec![EventBody::Error {
            message: error_text(raw.get("message"))
                .or_else(|| error_text(raw.get("error")))
                .unwrap_or_else(|| "unknown error".to_string()),
        }],
        _ => Vec::new(),
    }
}

fn translate_item(item: &Value) -> Vec<EventBody> {
    let item_type = str_field(item, "type").or_else(|| str_field(item, "item_type"));
    match item_type {
        Some("agent_message") => text(item).map(|t| EventBody::message(t, true)).into_iter().collect(),
        Some("reasoning") => text(item).map(|t| EventBody::thinking(t, true)).into_iter().collect(),
        Some("command_execution") => vec![EventBody::Bash {
            command: str_field(item, "command").unwrap_or("").to_string(),
            tool: Some("command_execution".to_string()),
        }],
        Some("file_change") => file_changes(item),
        Some("mcp_tool_call") => {
            let tool = match (str_field(item, "server"), str_field(item, "tool")) {
                (Some(server), Some(tool)) => format!("{server}.{tool}"),
                (None, Some(tool)) => tool.to_string(),
                _ => "mcp_tool_call".to_string(),
            };
            vec![EventBody::ToolUse {
                tool,
                args: args_object(item.get("arguments")),
            }]
        }
        Some("web_search") => vec![EventBody::ToolUse {
            tool: "web_search".to_string(),
            args: item
                .get("query")
                .map(|q| single_entry("query", q.clone()))
                .unwrap_or_default(),
        }],
        Some("tool_call") => {
            let name = str_field(item, "name").unwrap_or("unknown");
            vec![classify_tool(name, args_object(item.get("arguments")))]
        }
        Some("error") => vec![EventBody::Warning {
            message: str_field(item, "message").unwrap_or("").to_string(),
        }],
        _ => Vec::new(),
    }
}

fn text(item: &Value) -> Option<&str> {
    str_field(item, "text").filter(|t| !t.is_empty())
}

/// One file event per entry in `changes`, keyed by change kind.
fn file_changes(item: &Value) -> Vec<EventBody> {
    let Some(changes) = item.get("changes").and_then(Value::as_array) else {
        return Vec::new();
    };
    changes
        .iter()
        .filter_map(|change| {
            let path = str_field(change, "path")?;
            let op = FileOp::new(path, Some("file_change"));
            Some(match str_field(change, "kind") {
                Some("add") => EventBody::FileCreate(op),
                Some("delete") => EventBody::FileDelete(op),
                _ => EventBody::FileWrite(op),
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used)]
mod tests {
    use crate::agent::AgentType;
    use crate::ndjson::{EventBody, EventKind, EventNormalizer, ResultStatus};
    use serde_json::json;

    fn normalize(raw: serde_json::Value) -> Vec<EventBody> {
        EventNormalizer::new(AgentType::Codex)
            .normalize(&raw)
            .into_iter()
            .map(|e| e.body)
            .collect()
    }

    #[test]
    fn thread_started_becomes_init_with_session() {
        let events = normalize(json!({"type": "thread.started", "thread_id": "abc"}));
        assert_eq!(
            events,
            vec![EventBody::Init {
                session_id: Some("abc".into()),
                model: None,
            }]
        );
    }

    #[test]
    fn agent_message_and_reasoning() {
        let events = normalize(json!({
            "type": "item.completed",
            "item": {"id": "item_1", "type": "agent_message", "text": "Done."}
        }));
        assert_eq!(events, vec![EventBody::message("Done.", true)]);

        let events = normalize(json!({
            "type": "item.completed",
            "item": {"type": "reasoning", "text": "**Planning**"}
        }));
        assert_eq!(events[0].kind(), EventKind::Thinking);
    }

    #[test]
    fn command_execution_becomes_bash() {
        let events = normalize(json!({
            "type": "item.completed",
            "item": {"type": "command_execution", "command": "bash -lc 'ls'", "exit_code": 0}
        }));
        assert_eq!(
            events,
            vec![EventBody::Bash {
                command: "bash -lc 'ls'".into(),
                tool: Some("command_execution".into()),
            }]
        );
    }

    #[test]
    fn file_change_fans_out_per_change() {
        let events = normalize(json!({
            "type": "item.completed",
            "item": {"type": "file_change", "changes": [
                {"path": "new.rs", "kind": "add"},
                {"path": "old.rs", "kind": "delete"},
                {"path": "lib.rs", "kind": "update"}
            ]}
        }));
        let kinds: Vec<_> = events.iter().map(EventBody::kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::FileCreate, EventKind::FileDelete, EventKind::FileWrite]
        );
    }

    #[test]
    fn turn_completed_carries_usage() {
        let events = normalize(json!({
            "type": "turn.completed",
            "usage": {"input_tokens": 100, "cached_input_tokens": 40, "output_tokens": 20}
        }));
        let EventBody::Result { status, usage, .. } = &events[0] else {
            panic!("expected result, got {events:?}");
        };
        assert_eq!(*status, ResultStatus::Success);
        assert_eq!(usage.input_tokens, 100);
        assert_eq!(usage.cached_input_tokens, 40);
        assert_eq!(usage.total_tokens, 120);
    }

    #[test]
    fn turn_failed_is_error_result() {
        let events = normalize(json!({"type": "turn.failed", "error": {"message": "quota"}}));
        let EventBody::Result { status, message, .. } = &events[0] else {
            panic!("expected result");
        };
        assert_eq!(*status, ResultStatus::Error);
        assert_eq!(message.as_deref(), Some("quota"));
    }

    #[test]
    fn error_item_is_a_warning_and_top_level_error_is_error() {
        let events = normalize(json!({
            "type": "item.completed",
            "item": {"type": "error", "message": "retrying"}
        }));
        assert_eq!(events[0].kind(), EventKind::Warning);
        let events = normalize(json!({"type": "error", "message": "stream closed"}));
        assert_eq!(
            events,
            vec![EventBody::Error {
                message: "stream closed".into()
            }]
        );
    }

    #[test]
    fn generic_tool_call_uses_heuristic() {
        let events = normalize(json!({
            "type": "item.completed",
            "item": {"type": "tool_call", "name": "read_file", "arguments": "{\"path\":\"a.txt\"}"}
        }));
        assert_eq!(events[0].kind(), EventKind::FileRead);
    }

    #[test]
    fn unknown_item_falls_back_to_raw() {
        let events = normalize(json!({"type": "item.completed", "item": {"type": "todo_list"}}));
        assert_eq!(events[0].kind(), EventKind::Raw);
        let events = normalize(json!({"type": "item.started", "item": {"type": "agent_message"}}));
        assert_eq!(events[0].kind(), EventKind::Raw);
    }
}
