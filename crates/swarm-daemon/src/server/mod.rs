//! Request-level surface of the coordinator.
//!
//! Typed requests and responses (snake_case JSON) over one shared
//! [`AgentRegistry`](crate::agent::AgentRegistry).

mod service;
mod types;

pub use service::AgentService;
pub use types::{
    AgentListing, AgentStatusLine, CheckEnvResponse, DeltaOutput, EventsOutput, ListResponse,
    ReadFormat, ReadRequest, ReadResponse, SpawnResponse, StatusCounts, StatusEntry,
    StatusResponse, StopResponse, SummaryOutput,
};
