//! Error types for the agent-swarm core library.

use thiserror::Error;

/// Result type alias using the core `Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Agent type outside the supported set
    #[error("Unknown agent type: {0}. Supported types: codex, cursor, gemini, claude")]
    UnknownAgentType(String),

    /// Automation mode string that is neither `safe` nor `unsafe`
    #[error("Invalid mode '{0}'. Use 'safe' or 'unsafe'.")]
    InvalidMode(String),

    /// Detail level string outside brief/standard/detailed
    #[error("Invalid detail level '{0}'. Use 'brief', 'standard' or 'detailed'.")]
    InvalidDetailLevel(String),

    /// Event priority string outside critical/important/verbose
    #[error("Invalid priority '{0}'. Use 'critical', 'important' or 'verbose'.")]
    InvalidPriority(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
