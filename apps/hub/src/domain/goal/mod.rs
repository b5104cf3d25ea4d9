// Goal domain module
// Higher-level objectives decomposed into tasks

#![allow(clippy::module_inception)]

pub mod goal;

pub use goal::{Goal, GoalDefinition, GoalStatus, ProgressUpdate};
