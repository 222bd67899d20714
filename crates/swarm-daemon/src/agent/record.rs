//! One agent's persisted metadata plus its lazily read event stream.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use swarm_core::config::{META_FILE, STDOUT_LOG};
use swarm_core::ndjson::{CanonicalEvent, EventBody, EventNormalizer, ResultStatus};
use swarm_core::{AgentStatus, AgentType, AutomationMode};
use tracing::{debug, info, warn};

use super::error::AgentError;
use super::process;

/// Scalar fields persisted in `meta.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMeta {
    pub agent_id: String,
    pub agent_type: AgentType,
    pub prompt: String,
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub mode: AutomationMode,
    pub pid: Option<u32>,
    pub status: AgentStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AgentMeta {
    /// Wall time since start, up to completion when finished.
    pub fn elapsed(&self) -> Duration {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        (end - self.started_at).to_std().unwrap_or_default()
    }
}

/// A tracked agent.
///
/// Events are read from `stdout.log` only on an explicit poll; the offset of
/// the first unread byte only moves forward.
#[derive(Debug)]
pub struct AgentRecord {
    meta: AgentMeta,
    dir: PathBuf,
    read_offset: u64,
    events: Vec<CanonicalEvent>,
    normalizer: EventNormalizer,
    /// Exit collected, or the process was never our child.
    child_reaped: bool,
}

impl AgentRecord {
    pub fn new(meta: AgentMeta, dir: PathBuf) -> Self {
        let normalizer = EventNormalizer::new(meta.agent_type);
        Self {
            meta,
            dir,
            read_offset: 0,
            events: Vec::new(),
            normalizer,
            child_reaped: false,
        }
    }

    /// Load a record from its directory, validating `meta.json`.
    pub fn load(dir: &Path) -> Result<Self, AgentError> {
        let path = dir.join(META_FILE);
        let malformed = |reason: String| AgentError::Metadata {
            path: path.clone(),
            reason,
        };
        let content = std::fs::read_to_string(&path).map_err(|e| malformed(e.to_string()))?;
        let meta: AgentMeta = serde_json::from_str(&content).map_err(|e| malformed(e.to_string()))?;

        let dir_name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if meta.agent_id.is_empty() || meta.agent_id != dir_name {
            return Err(malformed(format!(
                "agent_id '{}' does not match directory '{dir_name}'",
                meta.agent_id
            )));
        }
        // Launched by an earlier process, never our child
        let mut record = Self::new(meta, dir.to_path_buf());
        record.child_reaped = true;
        Ok(record)
    }

    pub const fn meta(&self) -> &AgentMeta {
        &self.meta
    }

    pub fn agent_id(&self) -> &str {
        &self.meta.agent_id
    }

    pub const fn status(&self) -> AgentStatus {
        self.meta.status
    }

    pub const fn agent_type(&self) -> AgentType {
        self.meta.agent_type
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn stdout_path(&self) -> PathBuf {
        self.dir.join(STDOUT_LOG)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.dir.join(META_FILE)
    }

    /// Cached events; performs no I/O.
    pub fn events(&self) -> &[CanonicalEvent] {
        &self.events
    }

    pub const fn read_offset(&self) -> u64 {
        self.read_offset
    }

    /// Write `meta.json` atomically (temp file + rename).
    pub fn save(&self) -> io::Result<()> {
        let json = serde_json::to_vec_pretty(&self.meta).map_err(io::Error::other)?;
        let tmp = self.dir.join(format!("{META_FILE}.tmp"));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, self.meta_path())
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!(agent_id = %self.meta.agent_id, error = %e, "Failed to persist agent metadata");
        }
    }

    /// Read complete new lines from the log into the event cache.
    ///
    /// Returns the number of events appended. I/O faults are logged and
    /// leave the cache and status unchanged. Invalid UTF-8 in a line is
    /// replaced with U+FFFD before parsing, so such a line still surfaces
    /// as a raw event.
    pub fn poll_output(&mut self) -> usize {
        self.read_log(false)
    }

    /// Like [`poll_output`](Self::poll_output), but also consumes a trailing
    /// line without a newline. Only valid once the writer is gone.
    fn drain_output(&mut self) -> usize {
        self.read_log(true)
    }

    fn read_log(&mut self, drain: bool) -> usize {
        match self.read_new_bytes(drain) {
            Ok(bytes) => self.ingest(&bytes),
            Err(e) => {
                warn!(agent_id = %self.meta.agent_id, error = %e, "Failed to read agent output");
                0
            }
        }
    }

    fn read_new_bytes(&mut self, drain: bool) -> io::Result<Vec<u8>> {
        let mut file = match File::open(self.stdout_path()) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        file.seek(SeekFrom::Start(self.read_offset))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        let consumed = if drain {
            buf.len()
        } else {
            buf.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1)
        };
        buf.truncate(consumed);
        self.read_offset += consumed as u64;
        Ok(buf)
    }

    fn ingest(&mut self, bytes: &[u8]) -> usize {
        let before = self.events.len();
        let mut finished = None;
        for line in bytes.split(|b| *b == b'\n') {
            let line = String::from_utf8_lossy(line);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            for event in self.normalizer.normalize_line(line) {
                if let EventBody::Result { status, .. } = &event.body
                    && finished.is_none()
                {
                    finished = Some(*status);
                }
                self.events.push(event);
            }
        }

        // In-stream completion beats exit-code inference
        if let Some(result) = finished
            && self.meta.status == AgentStatus::Running
        {
            self.meta.status = match result {
                ResultStatus::Success => AgentStatus::Completed,
                ResultStatus::Error => AgentStatus::Failed,
            };
            self.meta.completed_at = Some(Utc::now());
            info!(agent_id = %self.meta.agent_id, status = %self.meta.status, "Agent reported completion");
            self.persist();
        }

        let added = self.events.len() - before;
        if added > 0 {
            debug!(agent_id = %self.meta.agent_id, added, offset = self.read_offset, "Read agent output");
        }
        added
    }

    /// Reconcile status with the process.
    ///
    /// An exited child of ours is reaped first, even once the record is
    /// terminal, so it neither lingers as a zombie nor passes for a live
    /// process. Terminal records change no further; a live process leaves
    /// the record as is. An exited process has its log drained and, absent
    /// an in-stream result, its status inferred from the exit code.
    pub fn refresh_status(&mut self) {
        let Some(pid) = self.meta.pid else {
            return;
        };
        // Records finished by an in-stream result still own a child to collect
        let exit_code = self.reap_child();
        if self.meta.status.is_terminal() {
            return;
        }
        if exit_code.is_none() && process::is_alive(pid) {
            return;
        }
        self.mark_exited(exit_code);
    }

    /// Non-blocking wait for our own child, only until its exit is collected
    /// so a recycled pid is never waited on.
    fn reap_child(&mut self) -> Option<i32> {
        let pid = self.meta.pid?;
        if self.child_reaped {
            return None;
        }
        let exit_code = process::reap(pid);
        if exit_code.is_some() || !process::is_alive(pid) {
            self.child_reaped = true;
        }
        exit_code
    }

    /// Finish a record whose process is gone.
    pub(crate) fn mark_exited(&mut self, exit_code: Option<i32>) {
        self.drain_output();
        if self.meta.status == AgentStatus::Running {
            self.meta.status = match exit_code {
                Some(0) | None => AgentStatus::Completed,
                Some(_) => AgentStatus::Failed,
            };
            info!(
                agent_id = %self.meta.agent_id,
                status = %self.meta.status,
                exit_code = ?exit_code,
                "Agent exited"
            );
        }
        if self.meta.completed_at.is_none() {
            self.meta.completed_at = Some(Utc::now());
        }
        self.persist();
    }

    /// Record a stop requested by the caller. The stop wins over anything
    /// the drained tail of the log reports.
    pub(crate) fn mark_stopped(&mut self) {
        if self.meta.status == AgentStatus::Running {
            self.meta.status = AgentStatus::Stopped;
        }
        self.drain_output();
        if self.meta.completed_at.is_none() {
            self.meta.completed_at = Some(Utc::now());
        }
        self.persist();
        self.reap_child();
    }
}
