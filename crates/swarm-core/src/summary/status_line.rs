//! One-sentence status used by bulk status checks.

use super::AgentSummary;
use crate::agent::AgentStatus;

pub const MAX_STATUS_WORDS: usize = 30;
const MESSAGE_PREVIEW_WORDS: usize = 12;

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

impl AgentSummary {
    /// Rule-based sentence of at most [`MAX_STATUS_WORDS`] words, e.g.
    /// `Completed: modified 2 files, ran 1 command, 3 tool calls`.
    pub fn status_line(&self) -> String {
        let prefix = match self.status {
            AgentStatus::Running => "Running",
            AgentStatus::Completed => "Completed",
            AgentStatus::Failed => "Failed",
            AgentStatus::Stopped => "Stopped",
        };

        let mut parts = Vec::new();
        if !self.files_modified.is_empty() {
            parts.push(format!("modified {}", plural(self.files_modified.len(), "file", "files")));
        }
        if !self.files_created.is_empty() {
            parts.push(format!("created {}", plural(self.files_created.len(), "file", "files")));
        }
        if self.bash_command_count > 0 {
            parts.push(format!("ran {}", plural(self.bash_command_count, "command", "commands")));
        }
        if self.tool_call_count > 0 {
            parts.push(plural(self.tool_call_count, "tool call", "tool calls"));
        }
        if !self.errors.is_empty() {
            parts.push(plural(self.errors.len(), "error", "errors"));
        }
        if parts.is_empty() {
            parts.push(if self.event_count == 0 {
                "no output yet".to_string()
            } else {
                plural(self.event_count, "event", "events")
            });
        }

        let mut line = format!("{prefix}: {}", parts.join(", "));
        if self.status.is_terminal()
            && let Some(message) = &self.final_message
        {
            let preview: Vec<&str> = message.split_whitespace().take(MESSAGE_PREVIEW_WORDS).collect();
            if !preview.is_empty() {
                line.push_str(". Last message: ");
                line.push_str(&preview.join(" "));
            }
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() > MAX_STATUS_WORDS {
            return words[..MAX_STATUS_WORDS].join(" ");
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use crate::agent::{AgentStatus, AgentType};
    use crate::ndjson::{CanonicalEvent, EventBody, FileOp};
    use crate::summary::{MAX_STATUS_WORDS, summarize_events};

    fn ev(body: EventBody) -> CanonicalEvent {
        CanonicalEvent::new(AgentType::Cursor, body)
    }

    #[test]
    fn counts_files_commands_and_tool_calls() {
        let events = vec![
            ev(EventBody::FileWrite(FileOp::new("test.py", None))),
            ev(EventBody::Bash {
                command: "ls".into(),
                tool: None,
            }),
            ev(EventBody::FileWrite(FileOp::new("test2.py", None))),
        ];
        let line = summarize_events("a", AgentType::Cursor, AgentStatus::Running, &events, None).status_line();
        assert_eq!(line, "Running: modified 2 files, ran 1 command, 3 tool calls");
    }

    #[test]
    fn no_events_still_yields_a_sentence() {
        let line = summarize_events("a", AgentType::Codex, AgentStatus::Running, &[], None).status_line();
        assert_eq!(line, "Running: no output yet");
    }

    #[test]
    fn long_final_message_is_bounded() {
        let events = vec![ev(EventBody::message("word ".repeat(100), true))];
        let line = summarize_events("a", AgentType::Cursor, AgentStatus::Completed, &events, None).status_line();
        assert!(line.starts_with("Completed: 1 event. Last message: word"));
        assert!(line.split_whitespace().count() <= MAX_STATUS_WORDS);
    }
}
