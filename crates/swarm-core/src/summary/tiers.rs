//! Tiered views of an [`AgentSummary`].
//!
//! Each tier is a strict superset of the previous one, nested through
//! `#[serde(flatten)]` so the JSON stays flat.

use serde::Serialize;

use super::{AgentSummary, DetailLevel, truncate_chars};
use crate::agent::{AgentStatus, AgentType};
use crate::ndjson::EventKind;

/// Per-tier list caps and final-message length.
struct Limits {
    files: usize,
    tools: usize,
    errors: usize,
    message_chars: usize,
}

const BRIEF: Limits = Limits {
    files: 5,
    tools: 0,
    errors: 0,
    message_chars: 0,
};
const STANDARD: Limits = Limits {
    files: 20,
    tools: 20,
    errors: 3,
    message_chars: 200,
};
const DETAILED: Limits = Limits {
    files: 50,
    tools: 50,
    errors: 10,
    message_chars: 500,
};
const DETAILED_WARNINGS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BriefView {
    pub agent_id: String,
    pub agent_type: AgentType,
    pub status: AgentStatus,
    pub duration: Option<String>,
    pub tool_call_count: usize,
    pub last_activity: Option<EventKind>,
    pub has_errors: bool,
    pub files_modified: Vec<String>,
    pub files_created: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandardView {
    #[serde(flatten)]
    pub brief: BriefView,
    pub tools_used: Vec<String>,
    pub errors: Vec<String>,
    pub final_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailedView {
    #[serde(flatten)]
    pub standard: StandardView,
    pub files_read: Vec<String>,
    pub files_deleted: Vec<String>,
    pub bash_commands: Vec<String>,
    pub warnings: Vec<String>,
    pub event_count: usize,
    pub last_tool: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TieredSummary {
    Brief(BriefView),
    Standard(StandardView),
    Detailed(DetailedView),
}

impl TieredSummary {
    pub const fn status(&self) -> AgentStatus {
        self.brief().status
    }

    pub const fn brief(&self) -> &BriefView {
        match self {
            Self::Brief(b) => b,
            Self::Standard(s) => &s.brief,
            Self::Detailed(d) => &d.standard.brief,
        }
    }
}

fn capped<'a>(items: impl IntoIterator<Item = &'a String>, cap: usize) -> Vec<String> {
    items.into_iter().take(cap).cloned().collect()
}

impl AgentSummary {
    /// Render the summary at the requested detail level.
    pub fn to_view(&self, level: DetailLevel) -> TieredSummary {
        match level {
            DetailLevel::Brief => TieredSummary::Brief(self.brief_view(&BRIEF)),
            DetailLevel::Standard => TieredSummary::Standard(self.standard_view(&STANDARD)),
            DetailLevel::Detailed => TieredSummary::Detailed(self.detailed_view()),
        }
    }

    fn brief_view(&self, limits: &Limits) -> BriefView {
        BriefView {
            agent_id: self.agent_id.clone(),
            agent_type: self.agent_type,
            status: self.status,
            duration: self.duration.clone(),
            tool_call_count: self.tool_call_count,
            last_activity: self.last_activity,
            has_errors: self.has_errors(),
            files_modified: capped(&self.files_modified, limits.files),
            files_created: capped(&self.files_created, limits.files),
        }
    }

    fn standard_view(&self, limits: &Limits) -> StandardView {
        let tools = self.tools_by_use();
        StandardView {
            brief: self.brief_view(limits),
            tools_used: capped(&tools, limits.tools),
            errors: capped(&self.errors, limits.errors),
            final_message: self
                .final_message
                .as_deref()
                .map(|m| truncate_chars(m, limits.message_chars)),
        }
    }

    fn detailed_view(&self) -> DetailedView {
        let skip = self.bash_commands.len().saturating_sub(super::BASH_HISTORY);
        DetailedView {
            standard: self.standard_view(&DETAILED),
            files_read: capped(&self.files_read, DETAILED.files),
            files_deleted: capped(&self.files_deleted, DETAILED.files),
            bash_commands: self.bash_commands.iter().skip(skip).cloned().collect(),
            warnings: capped(&self.warnings, DETAILED_WARNINGS),
            event_count: self.event_count,
            last_tool: self.last_tool.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ndjson::{CanonicalEvent, EventBody, FileOp};
    use crate::summary::summarize_events;
    use serde_json::json;

    fn busy_summary() -> AgentSummary {
        let mut events = Vec::new();
        for i in 0..30 {
            events.push(CanonicalEvent::new(
                AgentType::Claude,
                EventBody::FileWrite(FileOp::new(format!("src/f{i:02}.rs"), Some("Edit"))),
            ));
            events.push(CanonicalEvent::new(
                AgentType::Claude,
                EventBody::ToolUse {
                    tool: format!("tool{i:02}"),
                    args: serde_json::Map::from_iter([("secret".to_string(), json!("value"))]),
                },
            ));
        }
        for i in 0..12 {
            events.push(CanonicalEvent::new(
                AgentType::Claude,
                EventBody::Bash {
                    command: format!("cargo test {i}"),
                    tool: Some("Bash".into()),
                },
            ));
            events.push(CanonicalEvent::new(
                AgentType::Claude,
                EventBody::Error {
                    message: format!("failure {i}"),
                },
            ));
        }
        events.push(CanonicalEvent::new(
            AgentType::Claude,
            EventBody::message("z".repeat(600), true),
        ));
        summarize_events("agent-1", AgentType::Claude, AgentStatus::Completed, &events, None)
    }

    #[test]
    fn brief_caps_lists_and_omits_tool_details() {
        let view = busy_summary().to_view(DetailLevel::Brief);
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["files_modified"].as_array().unwrap().len(), 5);
        assert_eq!(value["has_errors"], true);
        assert!(value.get("tools_used").is_none());
        assert!(value.get("final_message").is_none());
        assert!(!value.to_string().contains("secret"));
    }

    #[test]
    fn standard_adds_tools_errors_and_short_message() {
        let TieredSummary::Standard(view) = busy_summary().to_view(DetailLevel::Standard) else {
            unreachable!("standard level renders a standard view");
        };
        assert_eq!(view.brief.files_modified.len(), 20);
        assert_eq!(view.tools_used.len(), 20);
        assert_eq!(view.errors.len(), 3);
        assert_eq!(view.final_message.unwrap().chars().count(), 200);
    }

    #[test]
    fn detailed_is_a_flat_superset() {
        let value = serde_json::to_value(busy_summary().to_view(DetailLevel::Detailed)).unwrap();
        for key in [
            "agent_id",
            "status",
            "tool_call_count",
            "has_errors",
            "tools_used",
            "final_message",
            "files_read",
            "bash_commands",
            "event_count",
            "last_tool",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["bash_commands"].as_array().unwrap().len(), 10);
        assert_eq!(value["bash_commands"][9], "cargo test 11");
        assert_eq!(value["errors"].as_array().unwrap().len(), 10);
        assert_eq!(value["files_modified"].as_array().unwrap().len(), 30);
        assert_eq!(value["final_message"].as_str().unwrap().chars().count(), 500);
        assert_eq!(value["status"], "completed");
    }
}
