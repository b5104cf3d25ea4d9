//! Orchestration Hub Library
//!
//! This library provides the agent/task/goal orchestration core: the
//! authoritative registry, the resilient transport channel, and the
//! bridge that keeps an observable snapshot of both.

pub mod api;
pub mod bridge;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod registry;
pub mod transport;
