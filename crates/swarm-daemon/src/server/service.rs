//! Agent service: the request-level surface over [`AgentRegistry`].

use chrono::Utc;
use swarm_core::AgentStatus;
use swarm_core::summary::{
    DetailLevel, EventPriority, filter_by_priority, format_duration, get_delta, summarize_events,
};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::types::{
    AgentListing, AgentStatusLine, CheckEnvResponse, DeltaOutput, EventsOutput, ListResponse,
    ReadFormat, ReadRequest, ReadResponse, SpawnResponse, StatusCounts, StatusEntry,
    StatusResponse, StopResponse, SummaryOutput,
};
use crate::agent::{AgentError, AgentRecord, AgentRegistry, SpawnRequest, check_all_clis};

/// Completed agents older than this are hidden from default listings.
const RECENT_HOURS: i64 = 1;

/// Serializes every request through one registry lock.
pub struct AgentService {
    registry: Mutex<AgentRegistry>,
}

impl AgentService {
    pub fn new(registry: AgentRegistry) -> Self {
        Self {
            registry: Mutex::new(registry),
        }
    }

    #[instrument(skip(self, request), fields(agent_type = %request.agent_type))]
    pub async fn spawn(&self, request: &SpawnRequest) -> Result<SpawnResponse, AgentError> {
        let meta = self.registry.lock().await.spawn(request)?;
        Ok(SpawnResponse::from(&meta))
    }

    #[instrument(skip(self, request), fields(agent_id = %request.agent_id))]
    pub async fn read(&self, request: &ReadRequest) -> Result<ReadResponse, AgentError> {
        let detail_level = request
            .detail_level
            .as_deref()
            .map(str::parse::<DetailLevel>)
            .transpose()?
            .unwrap_or_default();
        let priorities: Option<Vec<EventPriority>> = request
            .priorities
            .as_ref()
            .map(|levels| levels.iter().map(|l| l.parse::<EventPriority>()).collect::<Result<_, _>>())
            .transpose()?;

        let mut registry = self.registry.lock().await;
        let record = registry.get(&request.agent_id)?;
        let new_events = record.poll_output();
        debug!(new_events, total = record.events().len(), "Polled agent output");

        let meta = record.meta();
        let mode = meta.mode;
        let response = match request.format {
            ReadFormat::Summary => {
                let summary = summarize_events(
                    &meta.agent_id,
                    meta.agent_type,
                    meta.status,
                    record.events(),
                    Some(format_duration(meta.elapsed())),
                );
                ReadResponse::Summary(SummaryOutput {
                    summary: summary.to_view(detail_level),
                    mode,
                })
            }
            ReadFormat::Delta => ReadResponse::Delta(DeltaOutput {
                delta: get_delta(
                    &meta.agent_id,
                    meta.agent_type,
                    meta.status,
                    record.events(),
                    request.since_event,
                ),
                mode,
            }),
            ReadFormat::Events => {
                let since_event = request.since_event.min(record.events().len());
                let tail = &record.events()[since_event..];
                let events = match &priorities {
                    Some(levels) => filter_by_priority(tail, levels).into_iter().cloned().collect(),
                    None => tail.to_vec(),
                };
                ReadResponse::Events(EventsOutput {
                    agent_id: meta.agent_id.clone(),
                    agent_type: meta.agent_type,
                    status: meta.status,
                    since_event,
                    event_count: record.events().len(),
                    events,
                    mode,
                })
            }
        };
        Ok(response)
    }

    #[instrument(skip(self))]
    pub async fn stop(&self, agent_id: &str) -> Result<StopResponse, AgentError> {
        let mut registry = self.registry.lock().await;
        if registry.stop(agent_id).await {
            return Ok(StopResponse {
                agent_id: agent_id.to_string(),
                status: AgentStatus::Stopped,
                message: format!("Agent {agent_id} has been stopped"),
            });
        }
        let status = registry.get(agent_id)?.status();
        Ok(StopResponse {
            agent_id: agent_id.to_string(),
            status,
            message: format!("Agent {agent_id} was not running (status: {status})"),
        })
    }

    /// One-line status for each requested agent.
    pub async fn status(&self, agent_ids: &[String]) -> StatusResponse {
        let mut registry = self.registry.lock().await;
        let mut counts = StatusCounts::default();
        let mut agents = Vec::with_capacity(agent_ids.len());

        for agent_id in agent_ids {
            match registry.get(agent_id) {
                Ok(record) => {
                    let line = status_line(record);
                    counts.count(line.status);
                    agents.push(StatusEntry::Found(line));
                }
                Err(e) => {
                    counts.not_found += 1;
                    agents.push(StatusEntry::Missing {
                        agent_id: agent_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        StatusResponse {
            agents,
            summary: counts,
        }
    }

    /// Running agents plus those finished within the last hour; `all` lists
    /// everything tracked.
    pub async fn list(&self, all: bool) -> ListResponse {
        let everything = self.registry.lock().await.list_all();
        let total = everything.len();
        let cutoff = Utc::now() - chrono::Duration::hours(RECENT_HOURS);

        let relevant: Vec<AgentListing> = everything
            .into_iter()
            .filter(|meta| {
                all || meta.status == AgentStatus::Running
                    || meta.completed_at.is_some_and(|done| done > cutoff)
            })
            .map(AgentListing::from)
            .collect();

        let running_count = relevant.iter().filter(|a| a.status == AgentStatus::Running).count();
        ListResponse {
            running_count,
            completed_count: relevant.len() - running_count,
            filtered: total - relevant.len(),
            agents: relevant,
        }
    }

    pub async fn check_env(&self) -> CheckEnvResponse {
        let search_path = self.registry.lock().await.config().search_path.clone();
        CheckEnvResponse::from(check_all_clis(search_path.as_deref()))
    }
}

fn status_line(record: &mut AgentRecord) -> AgentStatusLine {
    record.poll_output();
    let meta = record.meta();
    let duration = format_duration(meta.elapsed());
    let summary = summarize_events(
        &meta.agent_id,
        meta.agent_type,
        meta.status,
        record.events(),
        Some(duration.clone()),
    );
    AgentStatusLine {
        agent_id: meta.agent_id.clone(),
        agent_type: meta.agent_type,
        status: meta.status,
        duration,
        last_activity: summary.last_activity,
        last_tool: summary.last_tool.clone(),
        summary: summary.status_line(),
    }
}
