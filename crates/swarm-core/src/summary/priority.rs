//! Event priority levels for filtered raw reads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ndjson::{CanonicalEvent, EventBody};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventPriority {
    /// Outcomes and file mutations
    Critical,
    /// Tool activity and complete messages
    Important,
    Verbose,
}

impl EventPriority {
    /// Levels used when a caller asks for filtering without naming any.
    pub const DEFAULT: [Self; 2] = [Self::Critical, Self::Important];

    pub const fn of(event: &CanonicalEvent) -> Self {
        match &event.body {
            EventBody::Error { .. }
            | EventBody::Result { .. }
            | EventBody::FileWrite(_)
            | EventBody::FileCreate(_)
            | EventBody::FileDelete(_) => Self::Critical,
            EventBody::ToolUse { .. } | EventBody::Bash { .. } | EventBody::FileRead(_) => Self::Important,
            EventBody::Thinking { complete, .. } | EventBody::Message { complete, .. } => {
                if *complete {
                    Self::Important
                } else {
                    Self::Verbose
                }
            }
            EventBody::Init { .. }
            | EventBody::TurnStart
            | EventBody::Warning { .. }
            | EventBody::ToolResult { .. }
            | EventBody::Raw { .. } => Self::Verbose,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Important => "important",
            Self::Verbose => "verbose",
        }
    }
}

impl fmt::Display for EventPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventPriority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "important" => Ok(Self::Important),
            "verbose" => Ok(Self::Verbose),
            _ => Err(Error::InvalidPriority(s.to_string())),
        }
    }
}

/// Events whose priority is one of `levels`, in their original order.
pub fn filter_by_priority<'a>(events: &'a [CanonicalEvent], levels: &[EventPriority]) -> Vec<&'a CanonicalEvent> {
    events
        .iter()
        .filter(|event| levels.contains(&EventPriority::of(event)))
        .collect()
}
