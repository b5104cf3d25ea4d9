// Orchestration registry
//
// The authoritative in-memory store of agents, tasks and goals, and the
// explicitly owned context that scopes it to one session.

#![allow(clippy::module_inception)]

pub mod context;
pub mod errors;
pub mod planner;
pub mod registry;
pub mod status;

pub use context::OrchestrationContext;
pub use errors::{EntityKind, RegistryError, RegistryResult};
pub use planner::{GoalPlanner, ObjectivePlanner};
pub use registry::OrchestrationRegistry;
pub use status::SystemStatus;
