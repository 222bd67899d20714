//! Incremental "what changed since event k" view.

use serde::Serialize;
use serde_json::Value;

use super::summarize_events;
use crate::agent::{AgentStatus, AgentType};
use crate::ndjson::{CanonicalEvent, EventBody};

const RECENT_TOOL_CALLS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeltaView {
    pub agent_id: String,
    pub agent_type: AgentType,
    pub status: AgentStatus,
    pub since_event: usize,
    pub new_events_count: usize,
    pub current_event_count: usize,
    pub has_changes: bool,
    pub new_files_modified: Vec<String>,
    pub new_files_created: Vec<String>,
    /// Last few `tool: target` strings
    pub new_tool_calls: Vec<String>,
    pub latest_message: Option<String>,
    pub new_errors: Vec<String>,
}

/// Summarize only the events after `since_event`, clamped to the length.
pub fn get_delta(
    agent_id: &str,
    agent_type: AgentType,
    status: AgentStatus,
    events: &[CanonicalEvent],
    since_event: usize,
) -> DeltaView {
    let since_event = since_event.min(events.len());
    let new_events = &events[since_event..];
    let summary = summarize_events(agent_id, agent_type, status, new_events, None);

    let tool_calls: Vec<String> = new_events.iter().filter_map(tool_call_line).collect();
    let skip = tool_calls.len().saturating_sub(RECENT_TOOL_CALLS);

    DeltaView {
        agent_id: agent_id.to_string(),
        agent_type,
        status,
        since_event,
        new_events_count: new_events.len(),
        current_event_count: events.len(),
        has_changes: !new_events.is_empty(),
        new_files_modified: summary.files_modified.into_iter().collect(),
        new_files_created: summary.files_created.into_iter().collect(),
        new_tool_calls: tool_calls.into_iter().skip(skip).collect(),
        latest_message: summary.final_message,
        new_errors: summary.errors,
    }
}

fn tool_call_line(event: &CanonicalEvent) -> Option<String> {
    match &event.body {
        EventBody::ToolUse { tool, args } => {
            let target = args
                .get("command")
                .or_else(|| args.get("path"))
                .or_else(|| args.get("file_path"))
                .and_then(Value::as_str)
                .unwrap_or("");
            Some(format!("{tool}: {target}"))
        }
        EventBody::Bash { command, tool } => Some(format!("{}: {command}", tool.as_deref().unwrap_or("bash"))),
        EventBody::FileWrite(op) => Some(format!("{}: {}", op.tool.as_deref().unwrap_or("file_write"), op.path)),
        _ => None,
    }
}
