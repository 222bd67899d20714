//! Errors from the agent registry.

use std::path::PathBuf;

use swarm_core::AgentType;

/// Errors from spawning, loading and controlling agents.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Unknown agent type: {0}. Supported types: codex, cursor, gemini, claude")]
    UnknownAgentType(String),

    #[error("CLI for {agent_type} not found: '{binary}' is not on the search path")]
    CliNotFound { agent_type: AgentType, binary: String },

    #[error("Working directory does not exist: {}", path.display())]
    WorkingDirectoryMissing { path: PathBuf },

    #[error("Working directory is not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Invalid mode '{0}'. Use 'safe' or 'unsafe'.")]
    InvalidMode(String),

    #[error(
        "Prompt contains the --yolo flag but the agent would run in safe mode. \
         Pass mode 'unsafe' to allow unsafe automation."
    )]
    UnsafeFlagInPrompt,

    #[error("Maximum concurrent agents ({limit}) reached. Wait for an agent to finish or stop one.")]
    ConcurrencyLimit { limit: usize },

    #[error("Failed to create storage for agent {agent_id}: {source}")]
    Storage {
        agent_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn {agent_type} agent: {source}")]
    SpawnFailed {
        agent_type: AgentType,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist metadata for agent {agent_id}: {source}")]
    PersistFailed {
        agent_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Agent {0} not found")]
    NotFound(String),

    #[error("Malformed agent metadata at {}: {reason}", path.display())]
    Metadata { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] swarm_core::Error),
}

impl AgentError {
    /// Whether the request was rejected before any process or file existed.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownAgentType(_)
                | Self::CliNotFound { .. }
                | Self::WorkingDirectoryMissing { .. }
                | Self::NotADirectory { .. }
                | Self::InvalidMode(_)
                | Self::UnsafeFlagInPrompt
                | Self::ConcurrencyLimit { .. }
        )
    }
}
