//! Canonical event types shared by every vendor stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::AgentType;

/// One unit of agent activity, independent of which CLI produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    pub agent: AgentType,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub body: EventBody,
}

impl CanonicalEvent {
    /// Create an event stamped with the current time.
    pub fn new(agent: AgentType, body: EventBody) -> Self {
        Self::at(agent, Utc::now(), body)
    }

    pub const fn at(agent: AgentType, timestamp: DateTime<Utc>, body: EventBody) -> Self {
        Self {
            agent,
            timestamp,
            body,
        }
    }

    pub const fn kind(&self) -> EventKind {
        self.body.kind()
    }
}

/// Kind-specific payload of a canonical event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventBody {
    Init {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
    },
    TurnStart,
    /// Assistant text. `complete == false` marks a streaming fragment.
    Message { content: String, complete: bool },
    Thinking { content: String, complete: bool },
    ToolUse {
        tool: String,
        #[serde(default)]
        args: Map<String, Value>,
    },
    FileRead(FileOp),
    FileWrite(FileOp),
    FileCreate(FileOp),
    FileDelete(FileOp),
    Bash {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tool: Option<String>,
    },
    Result {
        status: ResultStatus,
        #[serde(default)]
        usage: Usage,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error { message: String },
    Warning { message: String },
    ToolResult {
        tool: String,
        #[serde(default)]
        args: Map<String, Value>,
        success: bool,
    },
    /// Unrecognised or unparseable output, carried verbatim.
    Raw {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_type: Option<String>,
        payload: Value,
    },
}

impl EventBody {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Init { .. } => EventKind::Init,
            Self::TurnStart => EventKind::TurnStart,
            Self::Message { .. } => EventKind::Message,
            Self::Thinking { .. } => EventKind::Thinking,
            Self::ToolUse { .. } => EventKind::ToolUse,
            Self::FileRead(_) => EventKind::FileRead,
            Self::FileWrite(_) => EventKind::FileWrite,
            Self::FileCreate(_) => EventKind::FileCreate,
            Self::FileDelete(_) => EventKind::FileDelete,
            Self::Bash { .. } => EventKind::Bash,
            Self::Result { .. } => EventKind::Result,
            Self::Error { .. } => EventKind::Error,
            Self::Warning { .. } => EventKind::Warning,
            Self::ToolResult { .. } => EventKind::ToolResult,
            Self::Raw { .. } => EventKind::Raw,
        }
    }

    /// Passthrough for a payload no translation recognised.
    pub fn raw(payload: Value) -> Self {
        let source_type = payload
            .get("type")
            .and_then(Value::as_str)
            .map(String::from);
        Self::Raw {
            source_type,
            payload,
        }
    }

    /// A non-JSON output line.
    pub fn raw_line(line: &str) -> Self {
        Self::Raw {
            source_type: None,
            payload: Value::String(line.to_string()),
        }
    }

    pub fn message(content: impl Into<String>, complete: bool) -> Self {
        Self::Message {
            content: content.into(),
            complete,
        }
    }

    pub fn thinking(content: impl Into<String>, complete: bool) -> Self {
        Self::Thinking {
            content: content.into(),
            complete,
        }
    }
}

/// File touched by a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOp {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
}

impl FileOp {
    pub fn new(path: impl Into<String>, tool: Option<&str>) -> Self {
        Self {
            path: path.into(),
            tool: tool.map(String::from),
        }
    }
}

/// Outcome carried by a `result` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
}

impl ResultStatus {
    /// Map a vendor completion status.
    ///
    /// Only an exact (case-insensitive) `"success"` or a missing status counts
    /// as success; every other value, or an explicit `is_error`, is an error.
    pub fn from_vendor(status: Option<&str>, is_error: bool) -> Self {
        if is_error {
            return Self::Error;
        }
        match status {
            None => Self::Success,
            Some(s) if s.eq_ignore_ascii_case("success") => Self::Success,
            Some(_) => Self::Error,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Token usage counters reported on completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cached_input_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Discriminant of a canonical event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Init,
    TurnStart,
    Message,
    Thinking,
    ToolUse,
    FileRead,
    FileWrite,
    FileCreate,
    FileDelete,
    Bash,
    Result,
    Error,
    Warning,
    ToolResult,
    Raw,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::TurnStart => "turn_start",
            Self::Message => "message",
            Self::Thinking => "thinking",
            Self::ToolUse => "tool_use",
            Self::FileRead => "file_read",
            Self::FileWrite => "file_write",
            Self::FileCreate => "file_create",
            Self::FileDelete => "file_delete",
            Self::Bash => "bash",
            Self::Result => "result",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::ToolResult => "tool_result",
            Self::Raw => "raw",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
