// Domain layer module exports
// Pure data and rules; independent of transport and runtime concerns

pub mod agent;
pub mod events;
pub mod goal;
pub mod metrics;
pub mod task;
