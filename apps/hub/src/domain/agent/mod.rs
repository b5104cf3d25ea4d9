// Agent domain module
// Worker agents tracked by the registry: identity, status, capacity

#![allow(clippy::module_inception)]

pub mod agent;
pub mod value_objects;

pub use agent::{Agent, AgentPerformance, AgentRegistration};
pub use value_objects::AgentStatus;
