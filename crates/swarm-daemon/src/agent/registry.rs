//! Agent registry: spawn, track, stop and clean up detached agents.
//!
//! [`AgentRegistry`] is the in-memory index over the storage root. Each
//! agent's directory (`meta.json` + `stdout.log`) is the source of truth; the
//! registry adopts existing directories at startup and keeps them in sync.
//!
//! All methods take `&mut self`; callers that share a registry wrap it in a
//! single lock so bookkeeping is applied one request at a time.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use swarm_core::config::META_FILE;
use swarm_core::{AgentStatus, AgentType, AutomationMode, Config, resolve_mode};
use tracing::{debug, error, info, warn};

use super::command::{build_command, resolve_cli};
use super::error::AgentError;
use super::process;
use super::record::{AgentMeta, AgentRecord};

/// Registry settings.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Directory holding one subdirectory per agent.
    pub storage_root: PathBuf,
    /// Maximum simultaneously running agents.
    pub max_concurrent: usize,
    /// Terminal records kept before the oldest are evicted.
    pub max_completed: usize,
    /// Mode used when a request names none.
    pub default_mode: Option<AutomationMode>,
    /// Terminal records older than this are deleted at startup.
    pub retention: Duration,
    /// Time between SIGTERM and SIGKILL on stop.
    pub stop_grace: Duration,
    /// Only adopt records whose cwd matches.
    pub cwd_filter: Option<PathBuf>,
    /// `PATH`-style search list for vendor CLIs; `None` uses `PATH`.
    pub search_path: Option<OsString>,
}

impl RegistryConfig {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self::from_config(&Config::default(), storage_root)
    }

    /// Registry settings from resolved configuration.
    pub fn from_config(config: &Config, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            max_concurrent: config.max_concurrent,
            max_completed: config.max_completed,
            default_mode: config.default_mode,
            retention: Duration::from_secs(config.retention_days.saturating_mul(24 * 60 * 60)),
            stop_grace: Duration::from_millis(config.stop_grace_ms),
            cwd_filter: config.cwd_filter.clone(),
            search_path: None,
        }
    }

    #[must_use]
    pub const fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    #[must_use]
    pub const fn with_max_completed(mut self, max: usize) -> Self {
        self.max_completed = max;
        self
    }

    #[must_use]
    pub const fn with_default_mode(mut self, mode: Option<AutomationMode>) -> Self {
        self.default_mode = mode;
        self
    }

    #[must_use]
    pub const fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    #[must_use]
    pub const fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    #[must_use]
    pub fn with_cwd_filter(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd_filter = cwd;
        self
    }

    #[must_use]
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }
}

/// A request to start an agent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpawnRequest {
    pub agent_type: String,
    pub prompt: String,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// `safe` or `unsafe`; wins over `unsafe_mode`.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, rename = "unsafe")]
    pub unsafe_mode: Option<bool>,
}

impl SpawnRequest {
    pub fn new(agent_type: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            agent_type: agent_type.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }
}

/// Validated spawn parameters.
struct Validated {
    agent_type: AgentType,
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    mode: AutomationMode,
}

/// In-memory index of agents over the storage root.
#[derive(Debug)]
pub struct AgentRegistry {
    config: RegistryConfig,
    agents: HashMap<String, AgentRecord>,
}

impl AgentRegistry {
    /// Open the registry, creating the storage root and adopting existing
    /// agents.
    pub fn open(config: RegistryConfig) -> Result<Self, AgentError> {
        std::fs::create_dir_all(&config.storage_root)?;
        let mut registry = Self {
            config,
            agents: HashMap::new(),
        };
        registry.reconcile();
        Ok(registry)
    }

    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Startup reconciliation.
    ///
    /// Phase 1 enumerates agent directories, phase 2 loads and validates each
    /// `meta.json` (skipping malformed ones), phase 3 deletes records past the
    /// retention window, skips records outside the cwd filter and adopts the
    /// rest with a fresh status.
    fn reconcile(&mut self) {
        let dirs = match self.scan_agent_dirs() {
            Ok(dirs) => dirs,
            Err(e) => {
                warn!(root = %self.config.storage_root.display(), error = %e, "Failed to scan storage root");
                return;
            }
        };

        let records: Vec<AgentRecord> = dirs
            .iter()
            .filter_map(|dir| match AgentRecord::load(dir) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "Skipping malformed agent record");
                    None
                }
            })
            .collect();

        let now = Utc::now();
        let mut adopted = 0usize;
        for mut record in records {
            let expired = record.meta().completed_at.is_some_and(|done| {
                (now - done).to_std().is_ok_and(|age| age > self.config.retention)
            });
            if expired {
                info!(agent_id = %record.agent_id(), "Removing expired agent record");
                remove_dir(record.dir());
                continue;
            }
            if let Some(filter) = &self.config.cwd_filter
                && record.meta().cwd.as_deref() != Some(filter.as_path())
            {
                debug!(agent_id = %record.agent_id(), "Skipping agent outside cwd filter");
                continue;
            }
            record.refresh_status();
            self.agents.insert(record.agent_id().to_string(), record);
            adopted += 1;
        }
        if adopted > 0 {
            info!(adopted, root = %self.config.storage_root.display(), "Adopted existing agents");
        }
    }

    fn scan_agent_dirs(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(&self.config.storage_root)? {
            let path = entry?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        Ok(dirs)
    }

    /// Validate a request. Nothing is created on failure.
    fn validate(&self, request: &SpawnRequest) -> Result<Validated, AgentError> {
        let agent_type: AgentType = request
            .agent_type
            .parse()
            .map_err(|_| AgentError::UnknownAgentType(request.agent_type.clone()))?;

        let program = resolve_cli(agent_type, self.config.search_path.as_deref())?;

        if let Some(cwd) = &request.cwd {
            if !cwd.exists() {
                return Err(AgentError::WorkingDirectoryMissing { path: cwd.clone() });
            }
            if !cwd.is_dir() {
                return Err(AgentError::NotADirectory { path: cwd.clone() });
            }
        }

        let mode = resolve_mode(request.mode.as_deref(), request.unsafe_mode, self.config.default_mode)
            .map_err(|_| AgentError::InvalidMode(request.mode.clone().unwrap_or_default()))?;

        let mut argv = build_command(agent_type, &request.prompt, mode)?;
        let args = argv.split_off(1);

        Ok(Validated {
            agent_type,
            program,
            args,
            cwd: request.cwd.clone(),
            mode,
        })
    }

    /// Spawn a detached agent.
    ///
    /// Validation errors have no side effects. A launch or persistence
    /// failure kills the child (if any) and removes its directory.
    pub fn spawn(&mut self, request: &SpawnRequest) -> Result<AgentMeta, AgentError> {
        let validated = self.validate(request)?;

        self.refresh_all();
        let running = self.running_count();
        if running >= self.config.max_concurrent {
            return Err(AgentError::ConcurrencyLimit {
                limit: self.config.max_concurrent,
            });
        }

        let agent_id = self.allocate_id();
        let dir = self.config.storage_root.join(&agent_id);
        std::fs::create_dir_all(&dir).map_err(|source| AgentError::Storage {
            agent_id: agent_id.clone(),
            source,
        })?;

        let log_path = dir.join(swarm_core::config::STDOUT_LOG);
        let pid = match process::launch_detached(
            &validated.program,
            &validated.args,
            validated.cwd.as_deref(),
            &log_path,
        ) {
            Ok(pid) => pid,
            Err(source) => {
                error!(agent_id, agent_type = %validated.agent_type, error = %source, "Failed to spawn agent");
                rollback_spawn(&dir, None);
                return Err(AgentError::SpawnFailed {
                    agent_type: validated.agent_type,
                    source,
                });
            }
        };

        let meta = AgentMeta {
            agent_id: agent_id.clone(),
            agent_type: validated.agent_type,
            prompt: request.prompt.clone(),
            cwd: validated.cwd,
            mode: validated.mode,
            pid: Some(pid),
            status: AgentStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
        };
        let record = AgentRecord::new(meta.clone(), dir.clone());
        if let Err(source) = record.save() {
            error!(agent_id, pid, error = %source, "Failed to persist agent metadata");
            rollback_spawn(&dir, Some(pid));
            return Err(AgentError::PersistFailed { agent_id, source });
        }

        self.agents.insert(agent_id.clone(), record);
        info!(
            agent_id,
            agent_type = %meta.agent_type,
            pid,
            mode = %meta.mode,
            "Spawned agent"
        );
        self.cleanup_completed();
        Ok(meta)
    }

    /// Short random id not used by any tracked agent or directory.
    fn allocate_id(&self) -> String {
        loop {
            let mut id = uuid::Uuid::new_v4().simple().to_string();
            id.truncate(8);
            if !self.agents.contains_key(&id) && !self.config.storage_root.join(&id).exists() {
                return id;
            }
        }
    }

    /// Look up an agent, adopting it from disk if it is not tracked yet.
    /// The returned record has a fresh status.
    pub fn get(&mut self, agent_id: &str) -> Result<&mut AgentRecord, AgentError> {
        if !is_plain_id(agent_id) {
            return Err(AgentError::NotFound(agent_id.to_string()));
        }
        if !self.agents.contains_key(agent_id) {
            let dir = self.config.storage_root.join(agent_id);
            if !dir.join(META_FILE).is_file() {
                return Err(AgentError::NotFound(agent_id.to_string()));
            }
            let record = AgentRecord::load(&dir)?;
            debug!(agent_id, "Adopted agent from disk");
            self.agents.insert(agent_id.to_string(), record);
        }
        let record = self
            .agents
            .get_mut(agent_id)
            .ok_or_else(|| AgentError::NotFound(agent_id.to_string()))?;
        record.refresh_status();
        Ok(record)
    }

    /// Refresh every tracked record's status.
    pub fn refresh_all(&mut self) {
        for record in self.agents.values_mut() {
            record.refresh_status();
        }
    }

    fn running_count(&self) -> usize {
        self.agents
            .values()
            .filter(|r| r.status() == AgentStatus::Running)
            .count()
    }

    /// Snapshot of every tracked agent, oldest first.
    pub fn list_all(&mut self) -> Vec<AgentMeta> {
        self.refresh_all();
        let mut all: Vec<AgentMeta> = self.agents.values().map(|r| r.meta().clone()).collect();
        all.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.agent_id.cmp(&b.agent_id)));
        all
    }

    pub fn list_running(&mut self) -> Vec<AgentMeta> {
        self.list_all()
            .into_iter()
            .filter(|m| m.status == AgentStatus::Running)
            .collect()
    }

    /// Every non-running agent.
    pub fn list_completed(&mut self) -> Vec<AgentMeta> {
        self.list_all()
            .into_iter()
            .filter(|m| m.status.is_terminal())
            .collect()
    }

    /// Stop a running agent: SIGTERM its process group, wait up to the grace
    /// period, then SIGKILL.
    ///
    /// Returns `false` for unknown or already finished agents.
    pub async fn stop(&mut self, agent_id: &str) -> bool {
        let grace = self.config.stop_grace;
        let Ok(record) = self.get(agent_id) else {
            return false;
        };
        if record.status().is_terminal() {
            return false;
        }

        if let Some(pid) = record.meta().pid {
            process::terminate_group(pid);
            let (_, exited) = process::wait_for_exit(pid, grace).await;
            if !exited {
                warn!(agent_id, pid, "Grace period expired, sending SIGKILL");
                process::kill_group(pid);
                process::wait_for_exit(pid, grace).await;
            }
        }
        record.mark_stopped();
        info!(agent_id, "Stopped agent");
        true
    }

    /// Evict the oldest terminal records beyond `max_completed`.
    fn cleanup_completed(&mut self) {
        let mut completed: Vec<(chrono::DateTime<Utc>, String)> = self
            .agents
            .values()
            .filter(|r| r.status().is_terminal())
            .map(|r| {
                let meta = r.meta();
                (meta.completed_at.unwrap_or(meta.started_at), meta.agent_id.clone())
            })
            .collect();
        if completed.len() <= self.config.max_completed {
            return;
        }
        completed.sort();
        let excess = completed.len() - self.config.max_completed;
        for (_, agent_id) in completed.into_iter().take(excess) {
            if let Some(record) = self.agents.remove(&agent_id) {
                info!(agent_id, "Evicting old agent record");
                remove_dir(record.dir());
            }
        }
    }
}

/// Ids are single path components.
fn is_plain_id(agent_id: &str) -> bool {
    !agent_id.is_empty()
        && agent_id != "."
        && !agent_id.contains("..")
        && !agent_id.contains('/')
        && !agent_id.contains('\\')
}

fn remove_dir(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(dir = %dir.display(), error = %e, "Failed to remove agent directory");
    }
}

/// Undo a partially completed spawn.
fn rollback_spawn(dir: &Path, pid: Option<u32>) {
    if let Some(pid) = pid {
        process::kill_and_reap(pid);
    }
    remove_dir(dir);
}
