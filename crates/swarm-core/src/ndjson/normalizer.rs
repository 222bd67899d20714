//! Vendor stream normalization.
//!
//! Implements the tolerant reader pattern: unknown fields are ignored and
//! unknown event shapes pass through as `raw` events. A payload never
//! normalizes to zero events.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::types::{CanonicalEvent, EventBody, FileOp, Usage};
use super::{claude, codex, cursor, gemini};
use crate::agent::AgentType;

/// Tool names treated as a shell invocation regardless of vendor.
const SHELL_TOOL_NAMES: &[&str] = &["shell", "bash", "execute", "run_command", "run_shell_command"];

/// Stateful per-agent translator from vendor JSON to canonical events.
///
/// State is limited to remembering tool-call ids so that a later tool result
/// can be attributed to the tool that produced it.
#[derive(Debug)]
pub struct EventNormalizer {
    agent: AgentType,
    pending_tools: HashMap<String, String>,
}

impl EventNormalizer {
    pub fn new(agent: AgentType) -> Self {
        Self {
            agent,
            pending_tools: HashMap::new(),
        }
    }

    pub const fn agent_type(&self) -> AgentType {
        self.agent
    }

    /// Normalize one output line. Lines that are not JSON become `raw`.
    pub fn normalize_line(&mut self, line: &str) -> Vec<CanonicalEvent> {
        match serde_json::from_str::<Value>(line) {
            Ok(raw) => self.normalize(&raw),
            Err(_) => vec![CanonicalEvent::new(self.agent, EventBody::raw_line(line))],
        }
    }

    /// Normalize one parsed vendor payload into one or more canonical events.
    pub fn normalize(&mut self, raw: &Value) -> Vec<CanonicalEvent> {
        let timestamp = vendor_timestamp(raw).unwrap_or_else(Utc::now);
        let mut bodies = match self.agent {
            AgentType::Codex => codex::translate(raw),
            AgentType::Cursor => cursor::translate(&mut self.pending_tools, raw),
            AgentType::Gemini => gemini::translate(&mut self.pending_tools, raw),
            AgentType::Claude => claude::translate(&mut self.pending_tools, raw),
        };
        if bodies.is_empty() {
            bodies.push(EventBody::raw(raw.clone()));
        }
        // A finished turn resolves nothing further; unanswered ids are dropped
        if bodies.iter().any(|b| matches!(b, EventBody::Result { .. })) {
            self.pending_tools.clear();
        }
        bodies
            .into_iter()
            .map(|body| CanonicalEvent::at(self.agent, timestamp, body))
            .collect()
    }
}

/// Stateless convenience wrapper around [`EventNormalizer::normalize`].
pub fn normalize_events(agent: AgentType, raw: &Value) -> Vec<CanonicalEvent> {
    EventNormalizer::new(agent).normalize(raw)
}

/// Classify a generic tool call by name.
///
/// Vendors that do not label file or shell operations get a heuristic:
/// "write"+"file" and "read"+"file" substrings, and a fixed set of shell
/// tool names.
pub(crate) fn classify_tool(name: &str, args: Map<String, Value>) -> EventBody {
    let lower = name.to_ascii_lowercase();
    if lower.contains("write") && lower.contains("file") {
        return EventBody::FileWrite(FileOp::new(path_arg(&args), Some(name)));
    }
    if lower.contains("read") && lower.contains("file") {
        return EventBody::FileRead(FileOp::new(path_arg(&args), Some(name)));
    }
    if SHELL_TOOL_NAMES.contains(&lower.as_str()) {
        return EventBody::Bash {
            command: command_arg(&args),
            tool: Some(name.to_string()),
        };
    }
    EventBody::ToolUse {
        tool: name.to_string(),
        args,
    }
}

/// `file_path` wins over `path`; missing means empty.
pub(crate) fn path_arg(args: &Map<String, Value>) -> String {
    args.get("file_path")
        .or_else(|| args.get("path"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

pub(crate) fn command_arg(args: &Map<String, Value>) -> String {
    match args.get("command") {
        Some(Value::String(s)) => s.clone(),
        // Some CLIs pass argv arrays
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

pub(crate) fn str_field<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key).and_then(Value::as_str)
}

/// Tool arguments as a mapping.
///
/// Objects are taken as-is; JSON-encoded strings are decoded; any other
/// value is wrapped under `"input"`.
pub(crate) fn args_object(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Object(map)) => map,
            _ => single_entry("input", Value::String(s.clone())),
        },
        Some(Value::Null) | None => Map::new(),
        Some(other) => single_entry("input", other.clone()),
    }
}

pub(crate) fn single_entry(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}

/// Message text from a field that is either a string or `{ "message": ... }`.
pub(crate) fn error_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from),
        _ => None,
    }
}

pub(crate) fn parse_usage(value: Option<&Value>) -> Usage {
    let Some(value) = value else {
        return Usage::default();
    };
    let count = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| value.get(*k).and_then(Value::as_u64))
            .unwrap_or(0)
    };
    let input_tokens = count(&["input_tokens", "prompt_tokens"]);
    let output_tokens = count(&["output_tokens", "candidates_tokens", "completion_tokens"]);
    let total_tokens = match count(&["total_tokens"]) {
        0 => input_tokens + output_tokens,
        n => n,
    };
    Usage {
        input_tokens,
        output_tokens,
        cached_input_tokens: count(&["cached_input_tokens", "cache_read_input_tokens", "cached"]),
        total_tokens,
    }
}

fn vendor_timestamp(raw: &Value) -> Option<DateTime<Utc>> {
    let text = raw.get("timestamp")?.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}
