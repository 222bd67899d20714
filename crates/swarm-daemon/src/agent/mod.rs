//! Agent lifecycle: command lines, detached processes, on-disk records and
//! the registry that ties them together.

pub mod command;
mod error;
pub mod process;
mod record;
mod registry;

pub use command::{CliStatus, build_command, check_all_clis, check_cli_available, resolve_cli};
pub use error::AgentError;
pub use record::{AgentMeta, AgentRecord};
pub use registry::{AgentRegistry, RegistryConfig, SpawnRequest};
