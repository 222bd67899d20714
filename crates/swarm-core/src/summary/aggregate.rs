//! Single-pass reduction of canonical events into an [`AgentSummary`].

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

use serde_json::Value;

use super::bash::extract_file_ops;
use super::{format_duration, truncate_chars};
use crate::agent::{AgentStatus, AgentType};
use crate::ndjson::{CanonicalEvent, EventBody, EventKind, ResultStatus};

/// Trailing window of bash commands kept in a summary.
pub const BASH_HISTORY: usize = 10;
/// Error and warning messages are cut to this many characters.
pub const MAX_MESSAGE_CHARS: usize = 500;
/// Raw events scanned for an error message when a failure carries none.
const RAW_ERROR_SCAN: usize = 20;
const ERROR_KEYWORDS: [&str; 3] = ["error", "failed", "exception"];

/// Everything a caller may want to know about an agent's activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSummary {
    pub agent_id: String,
    pub agent_type: AgentType,
    pub status: AgentStatus,
    pub duration: Option<String>,

    pub files_modified: BTreeSet<String>,
    pub files_created: BTreeSet<String>,
    pub files_read: BTreeSet<String>,
    pub files_deleted: BTreeSet<String>,

    /// Tool name -> number of calls
    pub tools_used: BTreeMap<String, usize>,
    pub tool_call_count: usize,
    pub bash_commands: VecDeque<String>,
    pub bash_command_count: usize,

    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub final_message: Option<String>,

    pub event_count: usize,
    pub last_activity: Option<EventKind>,
    pub last_tool: Option<String>,
}

impl AgentSummary {
    fn empty(agent_id: &str, agent_type: AgentType, status: AgentStatus, duration: Option<String>) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            agent_type,
            status,
            duration,
            files_modified: BTreeSet::new(),
            files_created: BTreeSet::new(),
            files_read: BTreeSet::new(),
            files_deleted: BTreeSet::new(),
            tools_used: BTreeMap::new(),
            tool_call_count: 0,
            bash_commands: VecDeque::with_capacity(BASH_HISTORY),
            bash_command_count: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            final_message: None,
            event_count: 0,
            last_activity: None,
            last_tool: None,
        }
    }

    /// Tool names, most used first.
    pub fn tools_by_use(&self) -> Vec<String> {
        let mut tools: Vec<(&String, &usize)> = self.tools_used.iter().collect();
        tools.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        tools.into_iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn record_tool(&mut self, name: &str) {
        *self.tools_used.entry(name.to_string()).or_insert(0) += 1;
        self.tool_call_count += 1;
        self.last_tool = Some(name.to_string());
    }

    fn record_file(&mut self, kind: EventKind, path: &str, tool: Option<&str>) {
        if path.is_empty() {
            return;
        }
        let set = match kind {
            EventKind::FileRead => &mut self.files_read,
            EventKind::FileCreate => &mut self.files_created,
            EventKind::FileDelete => &mut self.files_deleted,
            _ => &mut self.files_modified,
        };
        set.insert(path.to_string());
        self.tool_call_count += 1;
        self.last_tool = Some(tool.unwrap_or(kind.as_str()).to_string());
    }

    fn record_bash(&mut self, command: &str) {
        *self.tools_used.entry("bash".to_string()).or_insert(0) += 1;
        self.tool_call_count += 1;
        self.last_tool = Some("bash".to_string());
        if command.is_empty() {
            return;
        }
        self.bash_command_count += 1;
        if self.bash_commands.len() == BASH_HISTORY {
            self.bash_commands.pop_front();
        }
        self.bash_commands.push_back(command.to_string());

        let ops = extract_file_ops(command);
        self.files_read.extend(ops.read);
        self.files_modified.extend(ops.written);
    }
}

/// Reduce `events` into a summary.
///
/// `duration` is the caller's elapsed-time text; when absent, a `result`
/// event's own duration is used instead.
pub fn summarize_events(
    agent_id: &str,
    agent_type: AgentType,
    status: AgentStatus,
    events: &[CanonicalEvent],
    duration: Option<String>,
) -> AgentSummary {
    let mut summary = AgentSummary::empty(agent_id, agent_type, status, duration);
    summary.event_count = events.len();

    for (index, event) in events.iter().enumerate() {
        summary.last_activity = Some(event.kind());
        match &event.body {
            EventBody::FileRead(op)
            | EventBody::FileWrite(op)
            | EventBody::FileCreate(op)
            | EventBody::FileDelete(op) => {
                summary.record_file(event.kind(), &op.path, op.tool.as_deref());
            }
            EventBody::ToolUse { tool, .. } => summary.record_tool(tool),
            EventBody::Bash { command, .. } => summary.record_bash(command),
            EventBody::Message { content, complete } => {
                if *complete && !content.is_empty() {
                    summary.final_message = Some(content.clone());
                }
            }
            EventBody::Error { message } => {
                let message = non_empty(message).or_else(|| raw_error_message(&events[..index]));
                if let Some(message) = message {
                    summary.errors.push(truncate_chars(&message, MAX_MESSAGE_CHARS));
                }
            }
            EventBody::Warning { message } => {
                if !message.is_empty() {
                    summary.warnings.push(truncate_chars(message, MAX_MESSAGE_CHARS));
                }
            }
            EventBody::Result {
                status: result_status,
                duration_ms,
                message,
                ..
            } => {
                if *result_status == ResultStatus::Error {
                    let message = message
                        .as_deref()
                        .and_then(non_empty)
                        .or_else(|| raw_error_message(&events[..index]));
                    if let Some(message) = message {
                        summary.errors.push(truncate_chars(&message, MAX_MESSAGE_CHARS));
                    }
                }
                if summary.duration.is_none() {
                    summary.duration = duration_ms
                        .filter(|ms| *ms > 0)
                        .map(|ms| format_duration(Duration::from_millis(ms)));
                }
            }
            EventBody::Init { .. }
            | EventBody::TurnStart
            | EventBody::Thinking { .. }
            | EventBody::ToolResult { .. }
            | EventBody::Raw { .. } => {}
        }
    }
    summary
}

fn non_empty(text: &str) -> Option<String> {
    (!text.trim().is_empty()).then(|| text.to_string())
}

/// Best-effort failure text from the most recent raw output.
fn raw_error_message(events: &[CanonicalEvent]) -> Option<String> {
    let start = events.len().saturating_sub(RAW_ERROR_SCAN);
    events[start..].iter().rev().find_map(|event| {
        let EventBody::Raw { payload, .. } = &event.body else {
            return None;
        };
        let text = match payload {
            Value::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        let lower = text.to_lowercase();
        ERROR_KEYWORDS
            .iter()
            .any(|k| lower.contains(k))
            .then_some(text)
    })
}
