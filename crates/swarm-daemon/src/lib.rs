//! Agent swarm coordinator library
//!
//! - Vendor command lines and CLI discovery
//! - Detached agent processes with their own process groups
//! - Disk-backed agent records with incremental log reading
//! - Registry with admission control, reconciliation and cleanup
//! - Request-level service used by the `agent-swarm` binary

pub mod agent;
pub mod server;
