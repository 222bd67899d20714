//! Request and response shapes for the agent service.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use swarm_core::ndjson::{CanonicalEvent, EventKind};
use swarm_core::summary::{DeltaView, TieredSummary};
use swarm_core::{AgentStatus, AgentType, AutomationMode};

use crate::agent::{AgentMeta, CliStatus};

/// Output format of a read request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadFormat {
    #[default]
    Summary,
    Delta,
    Events,
}

impl std::str::FromStr for ReadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "summary" => Ok(Self::Summary),
            "delta" => Ok(Self::Delta),
            "events" => Ok(Self::Events),
            other => Err(format!(
                "Invalid format '{other}'. Use 'summary', 'delta' or 'events'."
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpawnResponse {
    pub agent_id: String,
    pub agent_type: AgentType,
    pub status: AgentStatus,
    pub started_at: DateTime<Utc>,
    pub mode: AutomationMode,
    pub message: String,
}

impl From<&AgentMeta> for SpawnResponse {
    fn from(meta: &AgentMeta) -> Self {
        let label = if meta.mode.is_unsafe() { "UNSAFE" } else { "safe" };
        Self {
            agent_id: meta.agent_id.clone(),
            agent_type: meta.agent_type,
            status: meta.status,
            started_at: meta.started_at,
            mode: meta.mode,
            message: format!("Spawned {} agent to work on task ({label} mode)", meta.agent_type),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadRequest {
    pub agent_id: String,
    #[serde(default)]
    pub format: ReadFormat,
    /// `brief`, `standard` or `detailed`; summaries only.
    #[serde(default)]
    pub detail_level: Option<String>,
    #[serde(default)]
    pub since_event: usize,
    /// Priority levels kept in `events` output; `None` keeps everything.
    #[serde(default)]
    pub priorities: Option<Vec<String>>,
}

impl ReadRequest {
    pub fn new(agent_id: impl Into<String>, format: ReadFormat) -> Self {
        Self {
            agent_id: agent_id.into(),
            format,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutput {
    #[serde(flatten)]
    pub summary: TieredSummary,
    pub mode: AutomationMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeltaOutput {
    #[serde(flatten)]
    pub delta: DeltaView,
    pub mode: AutomationMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventsOutput {
    pub agent_id: String,
    pub agent_type: AgentType,
    pub status: AgentStatus,
    pub since_event: usize,
    /// Total events parsed so far, not the length of `events`.
    pub event_count: usize,
    pub events: Vec<CanonicalEvent>,
    pub mode: AutomationMode,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReadResponse {
    Summary(SummaryOutput),
    Delta(DeltaOutput),
    Events(EventsOutput),
}

#[derive(Debug, Clone, Serialize)]
pub struct StopResponse {
    pub agent_id: String,
    pub status: AgentStatus,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStatusLine {
    pub agent_id: String,
    pub agent_type: AgentType,
    pub status: AgentStatus,
    pub duration: String,
    pub last_activity: Option<EventKind>,
    pub last_tool: Option<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum StatusEntry {
    Found(AgentStatusLine),
    Missing { agent_id: String, error: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub stopped: usize,
    pub not_found: usize,
}

impl StatusCounts {
    pub(crate) const fn count(&mut self, status: AgentStatus) {
        match status {
            AgentStatus::Running => self.running += 1,
            AgentStatus::Completed => self.completed += 1,
            AgentStatus::Failed => self.failed += 1,
            AgentStatus::Stopped => self.stopped += 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub agents: Vec<StatusEntry>,
    pub summary: StatusCounts,
}

/// One row of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct AgentListing {
    pub agent_id: String,
    pub agent_type: AgentType,
    pub status: AgentStatus,
    pub prompt: String,
    pub cwd: Option<PathBuf>,
    pub mode: AutomationMode,
    pub pid: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration: String,
}

impl From<AgentMeta> for AgentListing {
    fn from(meta: AgentMeta) -> Self {
        let duration = swarm_core::summary::format_duration(meta.elapsed());
        Self {
            agent_id: meta.agent_id,
            agent_type: meta.agent_type,
            status: meta.status,
            prompt: meta.prompt,
            cwd: meta.cwd,
            mode: meta.mode,
            pid: meta.pid,
            started_at: meta.started_at,
            completed_at: meta.completed_at,
            duration,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub agents: Vec<AgentListing>,
    pub running_count: usize,
    pub completed_count: usize,
    /// Agents hidden by the recency filter.
    pub filtered: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckEnvResponse {
    pub agents: BTreeMap<AgentType, CliStatus>,
    pub installed: Vec<AgentType>,
    pub missing: Vec<AgentType>,
    pub ready: bool,
    pub message: String,
}

impl From<BTreeMap<AgentType, CliStatus>> for CheckEnvResponse {
    fn from(agents: BTreeMap<AgentType, CliStatus>) -> Self {
        let (installed, missing): (Vec<AgentType>, Vec<AgentType>) =
            agents.keys().copied().partition(|t| agents[t].installed);
        let ready = missing.is_empty();
        let message = if ready {
            "All CLI agents are installed and ready.".to_string()
        } else {
            let names: Vec<&str> = missing.iter().map(|t| t.as_str()).collect();
            format!(
                "Missing CLI tools: {}. Install them to use these agent types.",
                names.join(", ")
            )
        };
        Self {
            agents,
            installed,
            missing,
            ready,
            message,
        }
    }
}
