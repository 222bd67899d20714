//! agent-swarm Core Library
//!
//! Shared functionality for agent-swarm components:
//! - Agent types, automation modes and lifecycle status
//! - NDJSON normalization of vendor CLI streams into canonical events
//! - Rule-based summarization of canonical events
//! - Configuration resolution and hierarchy
//! - Common error types

pub mod agent;
pub mod config;
pub mod error;
pub mod ndjson;
pub mod summary;
pub mod tracing_init;

pub use agent::{AgentStatus, AgentType, AutomationMode, resolve_mode};
pub use config::Config;
pub use error::{Error, Result};
