//! Agent type and automation mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported coding-agent CLIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    Codex,
    Cursor,
    Gemini,
    Claude,
}

impl AgentType {
    /// Every supported agent type, in display order.
    pub const ALL: [Self; 4] = [Self::Codex, Self::Cursor, Self::Gemini, Self::Claude];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Codex => "codex",
            Self::Cursor => "cursor",
            Self::Gemini => "gemini",
            Self::Claude => "claude",
        }
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "codex" => Ok(Self::Codex),
            "cursor" => Ok(Self::Cursor),
            "gemini" => Ok(Self::Gemini),
            "claude" => Ok(Self::Claude),
            _ => Err(Error::UnknownAgentType(s.to_string())),
        }
    }
}

/// Lifecycle status of an agent.
///
/// `Running` is the only non-terminal state; terminal states absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Running,
    Completed,
    Failed,
    Stopped,
}

impl AgentStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Automation mode an agent runs under.
///
/// `Safe` is the default and forbids the unsafe-automation flag; `Unsafe`
/// is an explicit opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutomationMode {
    #[default]
    Safe,
    // Older metadata files wrote the unsafe mode as "yolo".
    #[serde(alias = "yolo")]
    Unsafe,
}

impl AutomationMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Unsafe => "unsafe",
        }
    }

    pub const fn is_unsafe(self) -> bool {
        matches!(self, Self::Unsafe)
    }
}

impl fmt::Display for AutomationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutomationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(Self::Safe),
            "unsafe" | "yolo" => Ok(Self::Unsafe),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

/// Resolve the effective automation mode for a spawn request.
///
/// Precedence: explicit mode string, then the boolean unsafe flag, then the
/// configured default (derived from config/environment), then `Safe`.
pub fn resolve_mode(
    requested_mode: Option<&str>,
    unsafe_flag: Option<bool>,
    default_mode: Option<AutomationMode>,
) -> Result<AutomationMode> {
    if let Some(mode) = requested_mode {
        return mode.parse();
    }
    if let Some(flag) = unsafe_flag {
        return Ok(if flag {
            AutomationMode::Unsafe
        } else {
            AutomationMode::Safe
        });
    }
    Ok(default_mode.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn agent_type_round_trips_through_str() {
        for agent_type in AgentType::ALL {
            assert_eq!(agent_type.as_str().parse::<AgentType>().unwrap(), agent_type);
        }
    }

    #[test]
    fn unknown_agent_type_is_rejected() {
        let err = "copilot".parse::<AgentType>().unwrap_err();
        assert!(matches!(err, Error::UnknownAgentType(ref t) if t == "copilot"));
    }

    #[test]
    fn mode_string_wins_over_flag() {
        let mode = resolve_mode(Some("safe"), Some(true), Some(AutomationMode::Unsafe)).unwrap();
        assert_eq!(mode, AutomationMode::Safe);
    }

    #[test]
    fn flag_wins_over_default() {
        let mode = resolve_mode(None, Some(true), Some(AutomationMode::Safe)).unwrap();
        assert_eq!(mode, AutomationMode::Unsafe);
        let mode = resolve_mode(None, Some(false), Some(AutomationMode::Unsafe)).unwrap();
        assert_eq!(mode, AutomationMode::Safe);
    }

    #[test]
    fn default_then_safe() {
        assert_eq!(
            resolve_mode(None, None, Some(AutomationMode::Unsafe)).unwrap(),
            AutomationMode::Unsafe
        );
        assert_eq!(resolve_mode(None, None, None).unwrap(), AutomationMode::Safe);
    }

    #[test]
    fn mode_parsing_is_case_insensitive_and_trims() {
        assert_eq!(" UNSAFE ".parse::<AutomationMode>().unwrap(), AutomationMode::Unsafe);
        assert_eq!("yolo".parse::<AutomationMode>().unwrap(), AutomationMode::Unsafe);
    }

    #[test]
    fn invalid_mode_lists_valid_values() {
        let err = resolve_mode(Some("reckless"), None, None).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("'safe'"));
        assert!(text.contains("'unsafe'"));
    }

    #[test]
    fn only_running_is_non_terminal() {
        assert!(!AgentStatus::Running.is_terminal());
        for status in [AgentStatus::Completed, AgentStatus::Failed, AgentStatus::Stopped] {
            assert!(status.is_terminal());
        }
        assert_eq!(serde_json::to_string(&AgentStatus::Stopped).unwrap(), "\"stopped\"");
    }

    #[test]
    fn legacy_yolo_metadata_deserializes_as_unsafe() {
        let mode: AutomationMode = serde_json::from_str("\"yolo\"").unwrap();
        assert_eq!(mode, AutomationMode::Unsafe);
        assert_eq!(serde_json::to_string(&mode).unwrap(), "\"unsafe\"");
    }
}
